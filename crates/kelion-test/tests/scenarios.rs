//! End-to-end scenarios
//!
//! Each test drives a full engine through the scenario harness with a
//! scripted audio clock and checks the frames that come out.

use std::time::Duration;

use kelion_core::{PresenceKind, Viseme};
use kelion_runtime::{CorrectionKind, EngineConfig};
use kelion_test::{ScenarioHarness, ScriptedAudio};
use kelion_visual::{OrientationMode, MOUTH_CHANNELS};
use kelion_voice::{LipsyncPayload, VisemeEntry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn viseme_weights(harness: &ScenarioHarness) -> Vec<(Viseme, f32)> {
    Viseme::all()
        .iter()
        .map(|v| (*v, harness.weight(v.channel_name())))
        .collect()
}

#[test]
fn scenario_a_timeline_drives_visemes() {
    let mut harness = ScenarioHarness::seeded(1);
    let audio = ScriptedAudio::without_analyser();

    let engine = harness.engine_mut();
    engine.set_state_named("idle", None).unwrap();
    engine.set_state_named("speak", None).unwrap();
    engine
        .set_viseme_timeline(vec![
            VisemeEntry::new(Viseme::AA, 0.0, 0.3),
            VisemeEntry::new(Viseme::Rest, 0.3, 1.0),
        ])
        .unwrap();
    harness.attach_audio(&audio);
    harness.play();

    // 6 frames at 60 fps: t = 0.1
    harness.run(6);
    assert!((audio.time() - 0.1).abs() < 1e-3);
    assert_eq!(harness.engine().frame().viseme, Some(Viseme::AA));
    for (viseme, weight) in viseme_weights(&harness) {
        if viseme == Viseme::AA {
            assert!((weight - 0.95).abs() < 1e-6, "AA at {}", weight);
        } else {
            assert_eq!(weight, 0.0, "{} at {}", viseme, weight);
        }
    }

    // 24 more: t = 0.5
    harness.run(24);
    assert!((audio.time() - 0.5).abs() < 1e-3);
    assert_eq!(harness.engine().frame().viseme, Some(Viseme::Rest));
    assert!((harness.weight(Viseme::Rest.channel_name()) - 0.2).abs() < 1e-6);
    assert_eq!(harness.weight(Viseme::AA.channel_name()), 0.0);

    let stats = harness.engine().stats();
    assert_eq!(stats.timeline_frames, 30);
    assert_eq!(stats.fallback_frames, 0);
}

#[test]
fn scenario_b_quiet_audio_keeps_mouth_closed() {
    let mut harness = ScenarioHarness::seeded(2).recording();
    let audio = ScriptedAudio::new();
    audio.set_energy(0.04);

    harness.attach_audio(&audio);
    harness.engine_mut().set_state(PresenceKind::Speaking, None);
    harness.play();

    harness.run_for(Duration::from_secs(1));
    assert!(audio.polls() >= 60);

    let channels = harness.engine().channel_names().to_vec();
    for frame in harness.frames() {
        assert_eq!(frame.jaw_rotation, 0.0);
        for name in MOUTH_CHANNELS {
            let index = channels.iter().position(|c| c == name).unwrap();
            assert_eq!(frame.morph_weights[index], 0.0, "{}", name);
        }
    }
    assert_eq!(harness.engine().fallback().level(), 0.0);
}

#[test]
fn scenario_c_listening_converges_then_freezes() {
    let mut config = EngineConfig::default().with_seed(3);
    config.orientation.camera_position = [1.0, 1.5, 2.0];
    let camera_yaw = config.orientation.camera_yaw();
    let epsilon = config.orientation.listen_epsilon;

    let mut harness = ScenarioHarness::with_config(config).recording();
    harness.engine_mut().set_state_named("listening", None).unwrap();

    harness.run(50);
    let frozen_yaw = harness.engine().frame().orientation.yaw;
    assert!((frozen_yaw - camera_yaw).abs() < epsilon);
    assert!(harness.engine().orientation().is_frozen());
    assert_eq!(harness.engine().frame().mode, OrientationMode::Listening);

    // Another 6 s: the head stays put while the eyes keep blinking
    let blinks_before = harness.engine().gaze().blink_count();
    harness.run_for(Duration::from_secs(6));
    for frame in &harness.frames()[50..] {
        assert_eq!(frame.orientation.yaw, frozen_yaw);
    }
    assert!(harness.engine().gaze().blink_count() > blinks_before);
    assert!(harness.frames().iter().any(|f| f.gaze.blink == 1.0));
}

#[test]
fn scenario_d_idle_grace_keeps_focus() {
    let mut harness = ScenarioHarness::seeded(4).recording();
    let engine = harness.engine_mut();
    engine.set_state_named("speak", None).unwrap();
    engine.set_state_named("idle", None).unwrap();
    assert_eq!(harness.engine().presence().state, PresenceKind::Idle);

    // Just under 2000 ms
    harness.run(119);
    assert!(harness
        .frames()
        .iter()
        .all(|f| f.mode == OrientationMode::Focused));

    harness.run(10);
    assert_eq!(harness.engine().frame().mode, OrientationMode::Idle);
    assert_eq!(harness.engine().frame().clip.as_deref(), Some("Idle"));
}

#[test]
fn noisy_audio_drives_fallback_then_resets() {
    let mut rng = StdRng::seed_from_u64(9);
    let samples: Vec<f32> = (0..16_000).map(|_| rng.gen_range(-0.5..0.5)).collect();
    let audio = ScriptedAudio::pcm(samples, 16_000);

    let mut harness = ScenarioHarness::seeded(5);
    harness.attach_audio(&audio);
    harness.play();
    harness.run(30);

    assert!(harness.engine().frame().jaw_rotation > 0.0);
    assert!(harness.weight("jawOpen") > 0.0);
    assert!(harness.engine().stats().fallback_frames > 0);
    assert_eq!(harness.engine().stats().timeline_frames, 0);

    harness.end();
    harness.step();
    assert_eq!(harness.weight("jawOpen"), 0.0);
    assert_eq!(harness.weight("mouthOpen"), 0.0);
    assert!((harness.weight(Viseme::Rest.channel_name()) - 0.2).abs() < 1e-6);
    assert_eq!(harness.engine().fallback().reset_count(), 1);

    // Staying idle does not reset again
    harness.run(10);
    assert_eq!(harness.engine().fallback().reset_count(), 1);
}

#[test]
fn timeline_wins_over_fallback() {
    let audio = ScriptedAudio::new();
    audio.set_energy(0.9);

    let mut harness = ScenarioHarness::seeded(6);
    harness
        .engine_mut()
        .set_viseme_timeline(vec![VisemeEntry::new(Viseme::OO, 0.0, 2.0)])
        .unwrap();
    harness.attach_audio(&audio);
    harness.play();
    harness.run(20);

    assert_eq!(harness.engine().stats().fallback_frames, 0);
    assert_eq!(harness.engine().frame().jaw_rotation, 0.0);
    assert!((harness.weight(Viseme::OO.channel_name()) - 0.95).abs() < 1e-6);
}

#[test]
fn lipsync_payload_words() {
    let payload = LipsyncPayload::from_json(
        r#"{"words":[
            {"word":"hello","start":0.0,"end":0.3},
            {"word":"moon","start":0.3,"end":0.6}
        ]}"#,
    )
    .unwrap();

    let audio = ScriptedAudio::without_analyser();
    let mut harness = ScenarioHarness::seeded(7);
    harness.engine_mut().load_lipsync(&payload).unwrap();
    harness.attach_audio(&audio);
    harness.play();

    audio.seek(0.45);
    harness.engine_mut().tick(Duration::ZERO);
    assert_eq!(harness.engine().frame().viseme, Some(Viseme::MBP));
}

#[test]
fn idle_surprise_mouth_is_held_down() {
    let mut harness = ScenarioHarness::seeded(8);
    harness
        .engine_mut()
        .set_state_named("idle", Some("surprised"))
        .unwrap();
    harness.run(120);

    assert!(harness.corrections().count(CorrectionKind::MouthDecay) > 0);
    assert!(harness.weight("jawOpen") < 0.2);
}

#[test]
fn stalled_frames_are_clamped() {
    let mut harness = ScenarioHarness::seeded(10);
    harness.step_by(Duration::from_secs(3));
    harness.step_by(Duration::from_secs(3));
    assert_eq!(harness.engine().time().as_millis(), 200);
}

#[test]
fn back_to_back_utterances_hand_mouth_to_fallback() {
    let mut harness = ScenarioHarness::seeded(11);

    // First reply comes with a timeline
    let first = ScriptedAudio::new();
    first.set_energy(0.9);
    harness
        .engine_mut()
        .set_viseme_timeline(vec![
            VisemeEntry::new(Viseme::AA, 0.0, 0.3),
            VisemeEntry::new(Viseme::Rest, 0.3, 1.0),
        ])
        .unwrap();
    harness.attach_audio(&first);
    harness.play();
    harness.run(60);
    assert_eq!(harness.engine().stats().timeline_frames, 60);
    assert_eq!(harness.engine().stats().fallback_frames, 0);

    harness.end();
    assert!(!harness.engine().player().has_timeline());
    harness.step();

    // Second reply has none: the amplitude fallback takes the mouth
    let second = ScriptedAudio::new();
    second.set_energy(0.9);
    harness.attach_audio(&second);
    harness.play();
    harness.run(30);

    let stats = harness.engine().stats();
    assert_eq!(stats.timeline_frames, 60);
    assert_eq!(stats.fallback_frames, 30);
    assert_eq!(harness.engine().frame().viseme, None);
    assert!(harness.engine().frame().jaw_rotation > 0.2);
    for name in MOUTH_CHANNELS {
        assert!(harness.weight(name) > 0.5, "{}", name);
    }
}

#[test]
fn timeline_replacing_fallback_mid_utterance_closes_mouth() {
    let audio = ScriptedAudio::new();
    audio.set_energy(0.9);

    let mut harness = ScenarioHarness::seeded(12);
    harness.attach_audio(&audio);
    harness.play();
    harness.run(20);
    assert_eq!(harness.engine().stats().fallback_frames, 20);
    assert!(harness.engine().frame().jaw_rotation > 0.2);
    assert!(harness.weight("mouthOpen") > 0.5);

    // Lips-closed timeline arrives while the audio keeps playing
    harness
        .engine_mut()
        .set_viseme_timeline(vec![VisemeEntry::new(Viseme::MBP, 0.0, 5.0)])
        .unwrap();
    harness.run(120);

    let stats = harness.engine().stats();
    assert_eq!(stats.fallback_frames, 20);
    assert_eq!(stats.timeline_frames, 120);
    assert_eq!(harness.engine().frame().viseme, Some(Viseme::MBP));
    assert_eq!(harness.engine().frame().jaw_rotation, 0.0);
    for name in MOUTH_CHANNELS {
        assert_eq!(harness.weight(name), 0.0, "{}", name);
    }
    assert!((harness.weight(Viseme::MBP.channel_name()) - 0.95).abs() < 1e-6);
    assert_eq!(harness.engine().fallback().reset_count(), 0);
}

#[test]
fn paused_audio_holds_mouth_until_resumed() {
    let audio = ScriptedAudio::new();
    audio.set_energy(0.9);

    let mut harness = ScenarioHarness::seeded(13);
    harness.attach_audio(&audio);
    harness.play();
    harness.run(20);
    let jaw = harness.engine().frame().jaw_rotation;
    let mouth = harness.weight("mouthOpen");
    assert!(jaw > 0.0);

    audio.pause();
    let paused_at = audio.time();
    harness.run(30);
    assert_eq!(harness.engine().stats().fallback_frames, 20);
    assert_eq!(audio.time(), paused_at);
    assert!(harness.engine().presence().is_speaking);
    assert_eq!(harness.engine().frame().jaw_rotation, jaw);
    assert_eq!(harness.weight("mouthOpen"), mouth);
    for name in MOUTH_CHANNELS {
        let w = harness.weight(name);
        assert!((0.0..=1.0).contains(&w), "{} at {}", name, w);
    }

    audio.play();
    harness.run(10);
    assert_eq!(harness.engine().stats().fallback_frames, 30);
    assert!(harness.engine().frame().jaw_rotation > 0.0);

    harness.end();
    harness.step();
    assert_eq!(harness.engine().frame().jaw_rotation, 0.0);
    for name in MOUTH_CHANNELS {
        assert_eq!(harness.weight(name), 0.0, "{}", name);
    }
    assert_eq!(harness.engine().fallback().reset_count(), 1);
}
