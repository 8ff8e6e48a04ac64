//! Concurrent jobs sharing one encoder cache.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Behavior, Gate, TestHarness};

use clipforge_av::{AccelerationMode, SlotState};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_modes_do_not_block_each_other() {
    let h = TestHarness::new();
    let gate = Arc::new(Gate::default());
    h.runner.set("av1_nvenc", Behavior::Hold(gate.clone()));

    let source = h.source("clip.mp4");
    let ctx = h.ctx.clone();
    let hw_source = source.clone();
    let hw_target = h.target("hw.mp4");
    let hardware = tokio::spawn(async move {
        ctx.transcoder
            .transcode_to_height(&hw_source, &hw_target, 720, true)
            .await
    });

    // The hardware job is now parked inside its first candidate, holding
    // the hardware selection gate.
    tokio::time::timeout(Duration::from_secs(5), gate.entered.notified())
        .await
        .expect("hardware job never started");

    let software = tokio::time::timeout(
        Duration::from_secs(5),
        h.ctx
            .transcoder
            .transcode_to_height(&source, &h.target("sw.mp4"), 720, false),
    )
    .await
    .expect("software job blocked behind the hardware job")
    .unwrap();
    assert!(software.success);
    assert!(!hardware.is_finished());

    gate.release.notify_one();
    let hardware = hardware.await.unwrap().unwrap();
    assert!(hardware.success);
    assert_eq!(hardware.encoder.unwrap().name, "av1-nvenc");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_mode_jobs_agree_on_one_pinned_candidate() {
    let h = TestHarness::new();
    h.runner.fail(&["libx264"]);
    h.runner.set_delay(Duration::from_millis(20));

    let mut jobs = Vec::new();
    for i in 0..6 {
        let ctx = h.ctx.clone();
        let source = h.source(&format!("clip-{i}.mp4"));
        let target = h.target(&format!("clip-{i}-720p.mp4"));
        jobs.push(tokio::spawn(async move {
            ctx.transcoder
                .transcode_to_height(&source, &target, 720, false)
                .await
        }));
    }

    let mut winners = Vec::new();
    for job in jobs {
        let result = job.await.unwrap().unwrap();
        assert!(result.success);
        winners.push(result.encoder.unwrap().name);
    }

    assert!(winners.iter().all(|w| *w == "vp9-libvpx"), "{winners:?}");
    // Jobs that queued on the selection gate reused the pin instead of
    // re-running the failed first candidate.
    assert_eq!(h.runner.encode_count("libx264"), 1);
    assert_eq!(h.runner.encode_count("libvpx-vp9"), 6);
    match h.ctx.transcoder.selector().cache().state(AccelerationMode::Software) {
        SlotState::Pinned(c) => assert_eq!(c.name, "vp9-libvpx"),
        SlotState::Unresolved => panic!("nothing pinned"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scan_stays_within_job_limit() {
    let h = TestHarness::with_config(|c| {
        c.scan.max_concurrent_jobs = 2;
        c.transcode.enabled = false;
    });
    for i in 0..6 {
        h.source(&format!("clip-{i}.mp4"));
    }
    h.runner.set_delay(Duration::from_millis(30));

    let summary = clipforge::Scanner::new(h.ctx.clone()).scan().await;

    assert_eq!(summary.videos_found, 6);
    assert_eq!(summary.videos_ok, 6);
    assert!(h.runner.peak_in_flight() <= 2, "peak {}", h.runner.peak_in_flight());
    assert!(h.runner.peak_in_flight() >= 1);
}
