//! Async frame driver with a scripted audio source

use std::time::Duration;

use kelion_core::{PresenceKind, Viseme};
use kelion_runtime::{spawn, AvatarEngine, AvatarFrame, EngineConfig};
use kelion_test::ScriptedAudio;
use kelion_visual::AvatarAsset;
use kelion_voice::LipsyncPayload;
use tokio::sync::watch;

async fn wait_frames(frames: &mut watch::Receiver<AvatarFrame>, n: usize) {
    for _ in 0..n {
        tokio::time::timeout(Duration::from_secs(1), frames.changed())
            .await
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn driver_plays_lipsync_against_audio() {
    let mut config = EngineConfig::default().with_seed(5);
    config.frame_interval = Duration::from_millis(5);
    let engine = AvatarEngine::new(config, &AvatarAsset::standard());
    let (handle, task) = spawn(engine);
    let mut frames = handle.frames();

    let payload = LipsyncPayload::from_json(
        r#"{"words":[],"visemes":[
            {"viseme":"AA","t0":0.0,"t1":0.3},
            {"viseme":"MBP","t0":0.3,"t1":0.6}
        ]}"#,
    )
    .unwrap();
    assert!(handle.load_lipsync(&payload).unwrap());

    let audio = ScriptedAudio::without_analyser();
    audio.seek(0.1);
    handle.attach_audio(audio.boxed()).unwrap();
    handle.audio_play().unwrap();
    wait_frames(&mut frames, 3).await;
    assert_eq!(handle.latest().viseme, Some(Viseme::AA));

    audio.seek(0.4);
    wait_frames(&mut frames, 3).await;
    assert_eq!(handle.latest().viseme, Some(Viseme::MBP));

    handle.audio_ended().unwrap();
    handle.shutdown().unwrap();
    let engine = task.await.unwrap();
    assert!(!engine.has_audio());
    assert!(!engine.player().has_timeline());
    assert_eq!(engine.presence().state, PresenceKind::Idle);
    assert_eq!(engine.stats().timelines_set, 1);
}

#[tokio::test]
async fn driver_rejects_bad_payload_without_queueing() {
    let (handle, task) = spawn(AvatarEngine::standard());
    let payload = LipsyncPayload::from_json(
        r#"{"words":[],"visemes":[{"viseme":"AA","t0":0.5,"t1":0.1}]}"#,
    )
    .unwrap();
    assert!(handle.load_lipsync(&payload).is_err());

    handle.shutdown().unwrap();
    let engine = task.await.unwrap();
    assert_eq!(engine.stats().timelines_set, 0);
}
