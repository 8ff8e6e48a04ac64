//! Poster and boomerang-preview generation.

mod common;

use common::{Behavior, TestHarness};

use assert_matches::assert_matches;
use clipforge_av::ArtifactStatus;
use clipforge_common::Error;

#[test]
fn poster_skips_existing_output_without_running_ffmpeg() {
    let h = TestHarness::new();
    let source = h.source("clip.mp4");
    let poster = h.target("poster.jpg");
    std::fs::create_dir_all(poster.parent().unwrap()).unwrap();
    std::fs::write(&poster, b"old poster").unwrap();

    let status =
        tokio_test::block_on(h.ctx.artifacts.create_poster(&source, &poster, 0.0, false)).unwrap();

    assert_eq!(status, ArtifactStatus::Skipped);
    assert_eq!(h.runner.call_count(), 0);
    assert_eq!(std::fs::read(&poster).unwrap(), b"old poster");
}

#[tokio::test]
async fn poster_regenerate_runs_ffmpeg_exactly_once() {
    let h = TestHarness::new();
    let source = h.source("clip.mp4");
    let poster = h.target("poster.jpg");
    std::fs::create_dir_all(poster.parent().unwrap()).unwrap();
    std::fs::write(&poster, b"old poster").unwrap();

    let status = h
        .ctx
        .artifacts
        .create_poster(&source, &poster, 0.0, true)
        .await
        .unwrap();

    assert_eq!(status, ArtifactStatus::Created);
    assert_eq!(h.runner.call_count(), 1);
    let call = &h.runner.invocations()[0];
    assert_eq!(call.output, poster);
    assert!(call.args.iter().any(|a| a == "-frames:v"));
}

#[tokio::test]
async fn poster_failure_removes_partial_output() {
    let h = TestHarness::new();
    h.runner.set("", Behavior::Fail(1));
    let source = h.source("clip.mp4");
    let poster = h.target("poster.jpg");

    let err = h
        .ctx
        .artifacts
        .create_poster(&source, &poster, 1.0, false)
        .await
        .unwrap_err();

    assert_matches!(err, Error::Tool { ref message, .. } if message.contains("poster"));
    assert!(!poster.exists());
}

#[tokio::test]
async fn poster_without_output_file_is_an_error() {
    let h = TestHarness::new();
    // ffmpeg exits 0 and writes nothing when seeking past the last frame.
    h.runner.set("", Behavior::SucceedEmpty);
    let source = h.source("clip.mp4");
    let poster = h.target("poster.jpg");

    let err = h
        .ctx
        .artifacts
        .create_poster(&source, &poster, 3600.0, false)
        .await
        .unwrap_err();

    assert_matches!(err, Error::Tool { ref message, .. } if message.contains("no output"));
    assert!(!poster.exists());
    assert_eq!(h.runner.call_count(), 1);
}

#[tokio::test]
async fn preview_timeout_removes_partial_output() {
    let h = TestHarness::new();
    // The preview encodes with a fixed libx264 invocation.
    h.runner.set("libx264", Behavior::Timeout);
    let source = h.source("clip.mp4");
    let preview = h.target("boomerang-preview.mp4");

    let err = h
        .ctx
        .artifacts
        .create_boomerang_preview(&source, &preview, 1.5, false)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("timed out"));
    assert!(!preview.exists());
}

#[tokio::test]
async fn preview_is_created_and_then_skipped() {
    let h = TestHarness::new();
    let source = h.source("clip.mp4");
    let preview = h.target("nested/dir/boomerang-preview.mp4");

    let first = h
        .ctx
        .artifacts
        .create_boomerang_preview(&source, &preview, 1.5, false)
        .await
        .unwrap();
    let second = h
        .ctx
        .artifacts
        .create_boomerang_preview(&source, &preview, 1.5, false)
        .await
        .unwrap();

    assert_eq!(first, ArtifactStatus::Created);
    assert_eq!(second, ArtifactStatus::Skipped);
    assert_eq!(h.runner.call_count(), 1);
    assert!(preview.exists());
}

#[tokio::test]
async fn artifacts_do_not_touch_the_encoder_cache() {
    let h = TestHarness::new();
    let source = h.source("clip.mp4");

    h.ctx
        .artifacts
        .create_boomerang_preview(&source, &h.target("p.mp4"), 1.5, false)
        .await
        .unwrap();

    for mode in clipforge_av::AccelerationMode::ALL {
        assert_eq!(
            h.ctx.transcoder.selector().cache().state(mode),
            clipforge_av::SlotState::Unresolved
        );
    }
}
