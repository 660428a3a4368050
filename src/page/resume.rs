//! Playback toggling with an ordered list of resume strategies.
//!
//! Some sites swallow programmatic `play()` and only resume through their own
//! player controls. Strategies are tried in order until the page confirms
//! playback; a click the page never confirms yields `Unknown`, not a guess.

use super::{observe_playback, PageDocument};
use crate::types::page::{PlaybackState, ResumeStrategy};

/// What a single strategy achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAttempt {
    /// Every loaded element is now playing.
    Resumed,
    /// A control was clicked but playback is not confirmed.
    Dispatched,
    /// Nothing to click, or native play was rejected.
    Failed,
}

/// Runs one strategy against the page.
pub fn attempt(strategy: &ResumeStrategy, doc: &mut dyn PageDocument) -> ResumeAttempt {
    match strategy {
        ResumeStrategy::NativePlay => {
            let mut rejected = 0;
            for media in doc.media_elements_mut().iter_mut() {
                if media.has_content() && media.paused && !media.play() {
                    rejected += 1;
                }
            }
            if rejected == 0 && observe_playback(doc) == PlaybackState::Playing {
                ResumeAttempt::Resumed
            } else {
                ResumeAttempt::Failed
            }
        }
        ResumeStrategy::ClickControl { selector, .. } => {
            if !doc.click(selector) {
                return ResumeAttempt::Failed;
            }
            if observe_playback(doc) == PlaybackState::Playing {
                ResumeAttempt::Resumed
            } else {
                ResumeAttempt::Dispatched
            }
        }
    }
}

fn strategy_name(strategy: &ResumeStrategy) -> &str {
    match strategy {
        ResumeStrategy::NativePlay => "native_play",
        ResumeStrategy::ClickControl { name, .. } => name,
    }
}

/// Pauses or resumes the page's media and reports the observed state.
pub fn apply_playback(
    doc: &mut dyn PageDocument,
    pause: bool,
    strategies: &[ResumeStrategy],
) -> PlaybackState {
    if !doc.media_elements().iter().any(|m| m.has_content()) {
        return PlaybackState::Unknown;
    }

    if pause {
        for media in doc.media_elements_mut().iter_mut() {
            media.pause();
        }
        return observe_playback(doc);
    }

    if observe_playback(doc) == PlaybackState::Playing {
        return PlaybackState::Playing;
    }

    let mut dispatched = false;
    for strategy in strategies {
        match attempt(strategy, doc) {
            ResumeAttempt::Resumed => {
                log::debug!("resumed via {}", strategy_name(strategy));
                return PlaybackState::Playing;
            }
            ResumeAttempt::Dispatched => dispatched = true,
            ResumeAttempt::Failed => {}
        }
    }

    match observe_playback(doc) {
        PlaybackState::Playing => PlaybackState::Playing,
        PlaybackState::Paused if !dispatched => PlaybackState::Paused,
        _ => PlaybackState::Unknown,
    }
}
