use serde::{Deserialize, Serialize};

/// License level. Ordering follows the feature set: `Free < Premium < Pro`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
    Pro,
}

impl Tier {
    /// Whether this tier unlocks a feature that requires `required`.
    pub fn satisfies(self, required: Tier) -> bool {
        match self {
            Tier::Pro => true,
            Tier::Premium => required == Tier::Premium,
            Tier::Free => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Pro => "pro",
        }
    }
}

/// Tier-gated features.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    VolumeControl,
    SoundProfiles,
    SleepTimer,
    PlaybackSpeed,
    PipMode,
    FocusScheduler,
    AudioHistory,
    CrossDeviceSync,
    AudioDucking,
    ApiWebhooks,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::VolumeControl,
        Feature::SoundProfiles,
        Feature::SleepTimer,
        Feature::PlaybackSpeed,
        Feature::PipMode,
        Feature::FocusScheduler,
        Feature::AudioHistory,
        Feature::CrossDeviceSync,
        Feature::AudioDucking,
        Feature::ApiWebhooks,
    ];

    /// Minimum tier that unlocks the feature.
    pub fn required_tier(self) -> Tier {
        match self {
            Feature::VolumeControl
            | Feature::SoundProfiles
            | Feature::SleepTimer
            | Feature::PlaybackSpeed
            | Feature::PipMode => Tier::Premium,
            Feature::FocusScheduler
            | Feature::AudioHistory
            | Feature::CrossDeviceSync
            | Feature::AudioDucking
            | Feature::ApiWebhooks => Tier::Pro,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::VolumeControl => "volumeControl",
            Feature::SoundProfiles => "soundProfiles",
            Feature::SleepTimer => "sleepTimer",
            Feature::PlaybackSpeed => "playbackSpeed",
            Feature::PipMode => "pipMode",
            Feature::FocusScheduler => "focusScheduler",
            Feature::AudioHistory => "audioHistory",
            Feature::CrossDeviceSync => "crossDeviceSync",
            Feature::AudioDucking => "audioDucking",
            Feature::ApiWebhooks => "apiWebhooks",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Persisted license record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LicenseState {
    pub tier: Tier,
    pub key: Option<String>,
    pub activated_at: Option<i64>,
    /// Stored for subscriptions; `None` means lifetime. Not enforced.
    pub expires_at: Option<i64>,
}

impl LicenseState {
    pub fn free() -> Self {
        Self::default()
    }

    pub fn is_paid(&self) -> bool {
        self.tier != Tier::Free
    }
}
