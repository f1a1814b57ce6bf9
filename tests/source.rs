//! Source probing integration tests.

mod common;

use speedup::{SpeedupError, VideoSource};

#[test]
fn probe_reports_synthesised_video() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("source.mov");
    if !common::write_test_video(&path, 10, 30, 640, 480) {
        return;
    }

    let source = VideoSource::open(&path).expect("Failed to open test video");
    let metadata = source.metadata();
    assert_eq!(metadata.width, 640);
    assert_eq!(metadata.height, 480);
    assert_eq!(metadata.frame_count, 10);
    assert!((metadata.frames_per_second - 30.0).abs() < 0.5, "fps = {}", metadata.frames_per_second);
    assert_eq!(metadata.codec, "mpeg4");
    assert!(metadata.is_readable());
    assert!(source.ensure_readable().is_ok());
    assert_eq!(source.path(), path.as_path());
}

#[test]
fn decodes_every_frame() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("source.mov");
    if !common::write_test_video(&path, 7, 25, 320, 240) {
        return;
    }

    assert_eq!(common::count_frames(&path), 7);
}

#[test]
fn open_nonexistent_file() {
    let result = VideoSource::open("this_file_does_not_exist.mov");
    let error = result.unwrap_err();
    assert!(matches!(error, SpeedupError::SourceNotFound(_)));
    assert!(
        error.to_string().contains("does not exist"),
        "Error message should mention the missing input: {error}",
    );
}

#[test]
fn open_invalid_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("invalid.mov");
    std::fs::write(&path, b"this is not a media file").expect("Failed to write invalid file");

    let error = VideoSource::open(&path).unwrap_err();
    assert!(
        matches!(error, SpeedupError::FileOpen { .. } | SpeedupError::NoVideoStream),
        "unexpected error: {error}",
    );
}
