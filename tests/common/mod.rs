//! Shared fixtures for the integration tests.
//!
//! Source videos are synthesised with the crate's own [`FrameWriter`], so
//! no binary fixtures are checked in. Fake encoder scripts stand in for
//! `ffmpeg` where a test only cares about the process boundary.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ffmpeg_next::Rational;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::Video as VideoFrame;
use speedup::{FrameWriter, FrameWriterOptions, SpeedupError, VideoSource};

/// Write a `frames`-long test video at `fps` to `path`.
///
/// Returns `false` (and prints why) when this FFmpeg build cannot encode
/// MPEG-4 Part 2, so callers can skip.
pub fn write_test_video(path: &Path, frames: usize, fps: i32, width: u32, height: u32) -> bool {
    write_test_video_at(path, frames, Rational::new(fps, 1), width, height)
}

/// Like [`write_test_video`], at a fractional frame rate such as
/// `30000/1001`.
pub fn write_test_video_at(
    path: &Path,
    frames: usize,
    frame_rate: Rational,
    width: u32,
    height: u32,
) -> bool {
    match try_write_test_video(path, frames, frame_rate, width, height) {
        Ok(()) => true,
        Err(SpeedupError::VideoEncodeError(message)) => {
            eprintln!("Skipping: MPEG-4 encoder not available ({message})");
            false
        }
        Err(error) => panic!("failed to write test video {}: {error}", path.display()),
    }
}

fn try_write_test_video(
    path: &Path,
    frames: usize,
    frame_rate: Rational,
    width: u32,
    height: u32,
) -> Result<(), SpeedupError> {
    let options = FrameWriterOptions::new(width, height, frame_rate);
    let mut writer = FrameWriter::create(path, options)?;
    for index in 0..frames {
        let mut frame = VideoFrame::new(Pixel::YUV420P, width, height);
        let luma = (16 + index * 20 % 220) as u8;
        frame.data_mut(0).fill(luma);
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        writer.write(&frame)?;
    }
    writer.finish()?;
    Ok(())
}

/// Decode every frame of `path` and return how many there were.
pub fn count_frames(path: &Path) -> u64 {
    let mut source = VideoSource::open(path).expect("open video for counting");
    let mut count = 0;
    for frame in source.frames().expect("create decoder") {
        frame.expect("decode frame");
        count += 1;
    }
    count
}

/// Files in `dir` whose name starts with `prefix`.
pub fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .collect()
}

/// Stand-in encoder executables.
#[cfg(unix)]
pub struct FakeEncoders {
    /// Exits with status 3 without writing anything.
    pub failing: PathBuf,
    /// Exits 0 without writing anything.
    pub silent: PathBuf,
    /// Replaces its input (`$3`) with a directory, so it cannot be removed
    /// as a file, then exits with status 3.
    pub clobbering: PathBuf,
    /// Copies its input (`$3`) to its output (last argument) and records
    /// its arguments, one per line, next to the output as `<output>.args`.
    pub copying: PathBuf,
}

/// Create the fake encoders once per test binary.
///
/// All scripts are written before any test can spawn one, which avoids
/// `ETXTBSY` when a forked child still holds a write handle.
#[cfg(unix)]
pub fn fake_encoders() -> &'static FakeEncoders {
    use std::os::unix::fs::PermissionsExt;

    static ENCODERS: OnceLock<FakeEncoders> = OnceLock::new();
    ENCODERS.get_or_init(|| {
        let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("speedup-fake-encoders");
        std::fs::create_dir_all(&dir).expect("create script dir");

        let write = |name: &str, body: &str| {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
            path
        };

        FakeEncoders {
            failing: write("failing-encoder", "exit 3"),
            silent: write("silent-encoder", "exit 0"),
            clobbering: write(
                "clobbering-encoder",
                r#"rm -f "$3" && mkdir "$3"
exit 3"#,
            ),
            copying: write(
                "copying-encoder",
                r#"for arg in "$@"; do last="$arg"; done
printf '%s\n' "$@" > "$last.args"
cp "$3" "$last""#,
            ),
        }
    })
}

/// Whether a real `ffmpeg` executable is on `PATH`.
pub fn ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
