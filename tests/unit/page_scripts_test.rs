//! Tests for the page-side scripts: media probing, playback with resume
//! strategies, and volume.

use rstest::rstest;

use tabplay::host::headless::HeadlessPage;
use tabplay::page::resume::{apply_playback, attempt, ResumeAttempt};
use tabplay::page::{observe_playback, probe_media, run_script, set_volume};
use tabplay::types::page::{
    ControlAction, MediaElement, PageScript, PlaybackState, ProbeResult, ResumeStrategy,
    ScriptOutput,
};

fn page(media: Vec<MediaElement>) -> HeadlessPage {
    HeadlessPage::with_media(media)
}

// ─── Probe ───

#[test]
fn probe_reports_paused_video() {
    let doc = page(vec![MediaElement::video("https://cdn.example/v.mp4", 120.0)]);
    assert_eq!(
        probe_media(&doc),
        ProbeResult {
            has_media: true,
            is_playing: false
        }
    );
}

#[test]
fn probe_reports_playing_audio() {
    let doc = page(vec![MediaElement::audio("https://cdn.example/a.mp3", 30.0).playing()]);
    assert!(probe_media(&doc).is_playing);
}

#[rstest]
#[case::zero_duration(Some(0.0))]
#[case::unknown_duration(None)]
#[case::nan_duration(Some(f64::NAN))]
fn probe_ignores_elements_without_duration(#[case] duration: Option<f64>) {
    let mut element = MediaElement::video("https://cdn.example/v.mp4", 1.0);
    element.duration = duration;
    assert_eq!(probe_media(&page(vec![element])), ProbeResult::default());
}

#[test]
fn probe_ignores_elements_without_source() {
    let mut element = MediaElement::video("", 60.0);
    element.current_src = None;
    element.src = Some(String::new());
    assert!(!probe_media(&page(vec![element.clone()])).has_media);

    element.has_source_child = true;
    assert!(probe_media(&page(vec![element])).has_media);
}

#[test]
fn probe_uses_first_loaded_element() {
    let mut placeholder = MediaElement::video("https://cdn.example/ad.mp4", 0.0);
    placeholder.paused = false;
    let doc = page(vec![
        placeholder,
        MediaElement::audio("https://cdn.example/a.mp3", 200.0),
    ]);
    assert_eq!(
        probe_media(&doc),
        ProbeResult {
            has_media: true,
            is_playing: false
        }
    );
}

// ─── Playback ───

#[test]
fn pause_stops_every_element() {
    let mut doc = page(vec![
        MediaElement::video("https://cdn.example/v.mp4", 10.0).playing(),
        MediaElement::audio("https://cdn.example/a.mp3", 10.0).playing(),
    ]);
    let state = apply_playback(&mut doc, true, &ResumeStrategy::defaults());
    assert_eq!(state, PlaybackState::Paused);
    assert!(doc.media.iter().all(|m| m.paused));
}

#[test]
fn native_play_resumes() {
    let mut doc = page(vec![MediaElement::video("https://cdn.example/v.mp4", 10.0)]);
    let state = apply_playback(&mut doc, false, &ResumeStrategy::defaults());
    assert_eq!(state, PlaybackState::Playing);
    assert!(!doc.media[0].paused);
}

#[test]
fn blocked_play_falls_back_to_site_control() {
    let mut doc = page(vec![MediaElement::video("https://cdn.example/v.mp4", 10.0).blocked()])
        .control(".ytp-play-button", ControlAction::ResumeMedia);
    let state = apply_playback(&mut doc, false, &ResumeStrategy::defaults());
    assert_eq!(state, PlaybackState::Playing);
}

#[test]
fn unconfirmed_click_is_unknown() {
    let mut doc = page(vec![MediaElement::video("https://cdn.example/v.mp4", 10.0).blocked()])
        .control("[aria-label=\"Play\"]", ControlAction::Inert);
    let state = apply_playback(&mut doc, false, &ResumeStrategy::defaults());
    assert_eq!(state, PlaybackState::Unknown);
}

#[test]
fn blocked_play_without_controls_stays_paused() {
    let mut doc = page(vec![MediaElement::video("https://cdn.example/v.mp4", 10.0).blocked()]);
    let state = apply_playback(&mut doc, false, &ResumeStrategy::defaults());
    assert_eq!(state, PlaybackState::Paused);
}

#[test]
fn nothing_to_control_is_unknown() {
    let mut doc = page(Vec::new());
    assert_eq!(
        apply_playback(&mut doc, false, &ResumeStrategy::defaults()),
        PlaybackState::Unknown
    );
    assert_eq!(
        apply_playback(&mut doc, true, &ResumeStrategy::defaults()),
        PlaybackState::Unknown
    );
}

#[test]
fn strategy_order_is_respected() {
    let strategies = vec![ResumeStrategy::click("site", "#play")];
    let mut doc = page(vec![MediaElement::video("https://cdn.example/v.mp4", 10.0)])
        .control("#play", ControlAction::ResumeMedia);
    assert_eq!(attempt(&strategies[0], &mut doc), ResumeAttempt::Resumed);

    // Without native play in the list a blocked element cannot be resumed directly.
    let mut doc = page(vec![MediaElement::video("https://cdn.example/v.mp4", 10.0).blocked()]);
    assert_eq!(
        apply_playback(&mut doc, false, &strategies),
        PlaybackState::Paused
    );
}

#[test]
fn mixed_elements_are_unknown() {
    let doc = page(vec![
        MediaElement::video("https://cdn.example/v.mp4", 10.0).playing(),
        MediaElement::audio("https://cdn.example/a.mp3", 10.0),
    ]);
    assert_eq!(observe_playback(&doc), PlaybackState::Unknown);
}

// ─── Volume ───

#[test]
fn volume_is_clamped_and_applied_to_all() {
    let mut doc = page(vec![
        MediaElement::video("https://cdn.example/v.mp4", 10.0),
        MediaElement::audio("https://cdn.example/a.mp3", 10.0),
    ]);
    assert_eq!(set_volume(&mut doc, 1.7), 2);
    assert!(doc.media.iter().all(|m| m.volume == 1.0));
}

#[test]
fn run_script_wraps_outputs() {
    let mut doc = page(vec![MediaElement::video("https://cdn.example/v.mp4", 10.0)]);
    assert_eq!(
        run_script(&mut doc, &PageScript::SetVolume { volume: 0.25 }),
        ScriptOutput::Volume { applied: 1 }
    );
    assert_eq!(
        run_script(
            &mut doc,
            &PageScript::SetPlayback {
                pause: false,
                strategies: ResumeStrategy::defaults()
            }
        ),
        ScriptOutput::Playback {
            state: PlaybackState::Playing
        }
    );
}
