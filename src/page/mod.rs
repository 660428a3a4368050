//! Page-side logic of the scripts the extension injects into tabs.
//!
//! Each function here is what runs inside the tab's page context. They work
//! against [`PageDocument`], so a real DOM binding and the headless host run
//! the same code.

pub mod resume;

use crate::types::page::{MediaElement, PageScript, PlaybackState, ProbeResult, ScriptOutput};

/// The slice of the DOM the injected scripts touch.
pub trait PageDocument {
    /// Every `video`/`audio` element in document order.
    fn media_elements(&self) -> &[MediaElement];
    fn media_elements_mut(&mut self) -> &mut [MediaElement];
    /// Clicks the first element matching `selector`. Returns whether one existed.
    fn click(&mut self, selector: &str) -> bool;
}

impl MediaElement {
    /// `currentSrc`, `src` or a `<source>` child.
    pub fn has_resolvable_source(&self) -> bool {
        let non_empty = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.is_empty());
        non_empty(&self.current_src) || non_empty(&self.src) || self.has_source_child
    }

    /// Loaded media: a resolvable source and a positive duration.
    pub fn has_content(&self) -> bool {
        self.has_resolvable_source() && self.duration.is_some_and(|d| d > 0.0)
    }

    /// Mirrors `HTMLMediaElement.play()`: rejected when the page blocks it.
    pub fn play(&mut self) -> bool {
        if self.play_blocked {
            return false;
        }
        self.paused = false;
        true
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }
}

/// Reports the first loaded media element and whether it is playing.
///
/// Elements without a source or with a zero/unknown duration are skipped so
/// placeholder players never count as media.
pub fn probe_media(doc: &dyn PageDocument) -> ProbeResult {
    doc.media_elements()
        .iter()
        .find(|m| m.has_content())
        .map(|m| ProbeResult {
            has_media: true,
            is_playing: !m.paused,
        })
        .unwrap_or_default()
}

/// Sets every element's volume, clamped to `[0, 1]`. Returns how many were set.
pub fn set_volume(doc: &mut dyn PageDocument, volume: f32) -> usize {
    let volume = volume.clamp(0.0, 1.0);
    let elements = doc.media_elements_mut();
    for media in elements.iter_mut() {
        media.volume = volume;
    }
    elements.len()
}

/// Observes the loaded elements: agreed state, or `Unknown` when mixed or empty.
pub fn observe_playback(doc: &dyn PageDocument) -> PlaybackState {
    let mut loaded = doc.media_elements().iter().filter(|m| m.has_content()).peekable();
    if loaded.peek().is_none() {
        return PlaybackState::Unknown;
    }
    let (mut playing, mut paused) = (0usize, 0usize);
    for media in loaded {
        if media.paused {
            paused += 1;
        } else {
            playing += 1;
        }
    }
    match (playing, paused) {
        (_, 0) => PlaybackState::Playing,
        (0, _) => PlaybackState::Paused,
        _ => PlaybackState::Unknown,
    }
}

/// Runs a script against a page and wraps its result.
pub fn run_script(doc: &mut dyn PageDocument, script: &PageScript) -> ScriptOutput {
    match script {
        PageScript::ProbeMedia => ScriptOutput::Probe(probe_media(doc)),
        PageScript::SetPlayback { pause, strategies } => ScriptOutput::Playback {
            state: resume::apply_playback(doc, *pause, strategies),
        },
        PageScript::SetVolume { volume } => ScriptOutput::Volume {
            applied: set_volume(doc, *volume),
        },
    }
}
