use serde::{Deserialize, Serialize};

/// Tag name of a media element.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

/// Snapshot of a `<video>`/`<audio>` element as seen by an injected script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaElement {
    pub kind: MediaKind,
    #[serde(default)]
    pub current_src: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    /// Element has a `<source>` child.
    #[serde(default)]
    pub has_source_child: bool,
    /// Seconds; `None` while metadata is not loaded.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default = "default_paused")]
    pub paused: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// The page rejects programmatic `play()` (autoplay policy or a custom player).
    #[serde(default)]
    pub play_blocked: bool,
}

fn default_paused() -> bool {
    true
}

fn default_volume() -> f32 {
    1.0
}

impl MediaElement {
    /// A loaded video with a source and the given duration.
    pub fn video(src: &str, duration: f64) -> Self {
        Self {
            kind: MediaKind::Video,
            current_src: Some(src.to_string()),
            src: Some(src.to_string()),
            has_source_child: false,
            duration: Some(duration),
            paused: true,
            volume: 1.0,
            play_blocked: false,
        }
    }

    /// A loaded audio element with a source and the given duration.
    pub fn audio(src: &str, duration: f64) -> Self {
        Self {
            kind: MediaKind::Audio,
            ..Self::video(src, duration)
        }
    }

    pub fn playing(mut self) -> Self {
        self.paused = false;
        self
    }

    pub fn blocked(mut self) -> Self {
        self.play_blocked = true;
        self
    }
}

/// What happens when an injected script clicks a page control.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    /// The page's own player resumes its media.
    ResumeMedia,
    /// The click lands but nothing observable happens.
    Inert,
}

/// A clickable element on the page, addressed by selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageControl {
    pub selector: String,
    pub action: ControlAction,
}

/// Result of the media probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub has_media: bool,
    pub is_playing: bool,
}

/// Observed playback state after a toggle attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Paused,
    Playing,
    /// The outcome could not be confirmed from the page.
    Unknown,
}

impl PlaybackState {
    /// `Some(is_playing)` when the state is confirmed.
    pub fn is_playing(self) -> Option<bool> {
        match self {
            PlaybackState::Paused => Some(false),
            PlaybackState::Playing => Some(true),
            PlaybackState::Unknown => None,
        }
    }
}

/// One way of getting paused media to play again, tried in list order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResumeStrategy {
    /// `HTMLMediaElement.play()` on every paused element.
    NativePlay,
    /// Click a site player's play button.
    ClickControl { name: String, selector: String },
}

impl ResumeStrategy {
    pub fn click(name: &str, selector: &str) -> Self {
        ResumeStrategy::ClickControl {
            name: name.to_string(),
            selector: selector.to_string(),
        }
    }

    /// Native play, then the YouTube player button, then any control labelled "Play".
    pub fn defaults() -> Vec<ResumeStrategy> {
        vec![
            ResumeStrategy::NativePlay,
            ResumeStrategy::click("youtube", ".ytp-play-button"),
            ResumeStrategy::click("aria-play", "[aria-label=\"Play\"]"),
        ]
    }
}

/// A script the extension injects into a tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "script", rename_all = "snake_case")]
pub enum PageScript {
    ProbeMedia,
    SetPlayback {
        pause: bool,
        strategies: Vec<ResumeStrategy>,
    },
    SetVolume {
        volume: f32,
    },
}

impl PageScript {
    pub fn name(&self) -> &'static str {
        match self {
            PageScript::ProbeMedia => "probe_media",
            PageScript::SetPlayback { .. } => "set_playback",
            PageScript::SetVolume { .. } => "set_volume",
        }
    }
}

/// Value returned by an injected script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum ScriptOutput {
    Probe(ProbeResult),
    Playback { state: PlaybackState },
    Volume { applied: usize },
}
