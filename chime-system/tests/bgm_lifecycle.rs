//! BGM channel lifecycle, transport, and fade behavior against the mock
//! engine.

use chime_engine::mock_engine::{MockEngine, MockProbe};
use chime_engine::VoiceId;
use chime_system::AudioSystem;

const TICK: f32 = 1.0 / 60.0;
const CLIP_A: &[u8] = b"clip-a";
const CLIP_B: &[u8] = b"clip-b-longer-payload";

fn system_with_mock() -> (AudioSystem, MockProbe) {
    let engine = MockEngine::new();
    let probe = engine.probe();
    let mut sys = AudioSystem::new();
    sys.init_with_engine(Box::new(engine));
    (sys, probe)
}

fn bgm_voice(probe: &MockProbe) -> VoiceId {
    probe.newest_voice().expect("a BGM voice should be loaded")
}

#[test]
fn play_bgm_loads_one_looping_voice() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);

    assert!(sys.is_bgm_loaded());
    assert_eq!(probe.live_voices(), 1);
    assert_eq!(probe.live_decoders(), 1);

    let voice = bgm_voice(&probe);
    assert_eq!(probe.is_looping(voice), Some(true));
    assert_eq!(probe.is_playing(voice), Some(true));
    assert_eq!(probe.volume_of(voice), Some(1.0));
}

#[test]
fn play_bgm_replaces_the_previous_track_without_leaking() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);
    let first = bgm_voice(&probe);
    sys.play_bgm(CLIP_B);

    assert_eq!(probe.live_voices(), 1);
    assert_eq!(probe.live_decoders(), 1);
    assert_eq!(probe.voices_created(), 2);
    assert_eq!(probe.voices_destroyed(), 1);
    assert_eq!(probe.decoders_destroyed(), 1);
    assert_ne!(bgm_voice(&probe), first);
}

#[test]
fn failed_replace_leaves_the_channel_unloaded() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);

    // The old track is torn down before the new decode is attempted, so a
    // decode failure leaves nothing loaded rather than the old track.
    probe.set_fail_decoders(true);
    sys.play_bgm(CLIP_B);

    assert!(!sys.is_bgm_loaded());
    assert_eq!(probe.live_voices(), 0);
    assert_eq!(probe.live_decoders(), 0);
}

#[test]
fn stop_rewinds_but_pause_preserves_position() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);
    let voice = bgm_voice(&probe);

    probe.set_position(voice, 4410);
    sys.pause_bgm();
    assert_eq!(probe.is_playing(voice), Some(false));
    assert_eq!(probe.position_of(voice), Some(4410));

    sys.resume_bgm();
    assert_eq!(probe.is_playing(voice), Some(true));

    sys.stop_bgm();
    assert_eq!(probe.is_playing(voice), Some(false));
    assert_eq!(probe.position_of(voice), Some(0));
}

#[test]
fn transport_without_a_loaded_track_is_a_noop() {
    let (mut sys, probe) = system_with_mock();
    sys.stop_bgm();
    sys.pause_bgm();
    sys.resume_bgm();
    sys.fade_bgm(0.5, 1.0);
    assert!(!sys.is_bgm_fading());
    assert_eq!(probe.voices_created(), 0);
}

#[test]
fn set_bgm_volume_applies_immediately_when_idle() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);
    let voice = bgm_voice(&probe);

    sys.set_bgm_volume(0.4);
    assert_eq!(probe.volume_of(voice), Some(0.4));
    sys.set_bgm_volume(1.5);
    assert_eq!(probe.volume_of(voice), Some(1.0));
    sys.set_bgm_volume(-0.5);
    assert_eq!(probe.volume_of(voice), Some(0.0));
}

#[test]
fn fade_is_monotone_and_ends_exactly_on_target() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);
    let voice = bgm_voice(&probe);
    assert_eq!(probe.volume_of(voice), Some(1.0));

    sys.fade_bgm(0.0, 2.0);
    assert!(sys.is_bgm_fading());

    let mut previous = 1.0f32;
    for _ in 0..130 {
        sys.update(TICK);
        let volume = probe.volume_of(voice).unwrap();
        assert!(
            (0.0..=1.0).contains(&volume),
            "fade left [0, 1]: {}",
            volume
        );
        assert!(volume <= previous, "fade went up: {} -> {}", previous, volume);
        previous = volume;
    }

    assert_eq!(probe.volume_of(voice), Some(0.0));
    assert!(!sys.is_bgm_fading());
}

#[test]
fn fade_completion_is_idempotent_under_extra_ticks() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);
    let voice = bgm_voice(&probe);

    sys.fade_bgm(0.3, 0.5);
    for _ in 0..40 {
        sys.update(TICK);
    }
    assert!(!sys.is_bgm_fading());
    assert_eq!(probe.volume_of(voice), Some(0.3));

    for _ in 0..10 {
        sys.update(TICK);
    }
    assert_eq!(probe.volume_of(voice), Some(0.3));
    assert!(!sys.is_bgm_fading());
}

#[test]
fn fade_with_zero_duration_completes_on_the_first_tick() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);
    let voice = bgm_voice(&probe);

    sys.fade_bgm(0.5, 0.0);
    assert!(sys.is_bgm_fading());
    sys.update(TICK);
    assert!(!sys.is_bgm_fading());
    assert_eq!(probe.volume_of(voice), Some(0.5));
}

#[test]
fn fade_target_becomes_the_stored_global_volume() {
    let (mut sys, _probe) = system_with_mock();
    sys.play_bgm(CLIP_A);

    sys.fade_bgm(2.0, 1.0);
    // Target is clamped, and the global setting reflects the destination
    // before the fade completes.
    assert_eq!(sys.bgm_volume(), 1.0);

    sys.fade_bgm(0.25, 1.0);
    assert_eq!(sys.bgm_volume(), 0.25);
}

#[test]
fn set_bgm_volume_during_fade_is_deferred() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);
    let voice = bgm_voice(&probe);

    sys.fade_bgm(0.8, 1.0);
    for _ in 0..30 {
        sys.update(TICK);
    }
    let mid_fade = probe.volume_of(voice).unwrap();
    assert!(mid_fade < 1.0 && mid_fade > 0.8);

    // The fade keeps ownership of the audible level; the setter only stores.
    sys.set_bgm_volume(0.3);
    assert_eq!(probe.volume_of(voice), Some(mid_fade));
    assert_eq!(sys.bgm_volume(), 0.3);

    for _ in 0..40 {
        sys.update(TICK);
    }
    assert!(!sys.is_bgm_fading());
    assert_eq!(probe.volume_of(voice), Some(0.8));

    // After completion an explicit call takes effect again.
    sys.set_bgm_volume(0.3);
    assert_eq!(probe.volume_of(voice), Some(0.3));
}

#[test]
fn restarting_a_fade_restarts_from_the_current_level() {
    let (mut sys, probe) = system_with_mock();
    sys.play_bgm(CLIP_A);
    let voice = bgm_voice(&probe);

    sys.fade_bgm(0.0, 1.0);
    for _ in 0..30 {
        sys.update(TICK);
    }
    let mid_fade = probe.volume_of(voice).unwrap();

    // A new fade captures the mid-fade audible volume as its start level.
    sys.fade_bgm(1.0, 1.0);
    sys.update(TICK);
    let after = probe.volume_of(voice).unwrap();
    assert!(after >= mid_fade);
    assert!(after < 1.0);
}

#[test]
fn voice_stage_failure_unwinds_the_decoder() {
    let (mut sys, probe) = system_with_mock();
    probe.set_fail_voices(true);
    sys.play_bgm(CLIP_A);

    assert!(!sys.is_bgm_loaded());
    assert_eq!(probe.decoders_created(), 1);
    assert_eq!(probe.decoders_destroyed(), 1);
    assert_eq!(probe.live_decoders(), 0);
    assert_eq!(probe.voices_created(), 0);
}
