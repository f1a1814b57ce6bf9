//! Frame decimation.
//!
//! [`Decimator`] keeps one frame out of every `speed_factor` and writes the
//! survivors to an intermediate file whose frame rate is raised by the same
//! factor. Playback therefore runs `speed_factor` times faster at the
//! source's visual frame rate, with no interpolation and no audio.
//!
//! # Example
//!
//! ```no_run
//! use speedup::Decimator;
//!
//! let report = speedup::decimate("~/Movies/clip.mov", "clip_fast.mov", 4)?;
//! println!("kept {} of {} frames", report.frames_written, report.frames_read);
//!
//! // Or with a tuned bitrate:
//! let mut source = speedup::VideoSource::open("~/Movies/clip.mov")?;
//! Decimator::new(4)?.bitrate(20_000_000).run(&mut source, "clip_fast.mov")?;
//! # Ok::<(), speedup::SpeedupError>(())
//! ```

use std::path::{Path, PathBuf};

use ffmpeg_next::Rational;

use crate::{
    encode::{FrameWriter, FrameWriterOptions},
    error::SpeedupError,
    source::VideoSource,
    utilities,
};

/// Speed factor used when none is given.
pub const DEFAULT_SPEED_FACTOR: u32 = 2;

/// Whether the frame at zero-based `index` survives decimation by
/// `speed_factor`.
///
/// A zero factor keeps nothing; [`Decimator::new`] rejects it before any
/// frame is read.
pub fn should_keep(index: u64, speed_factor: u32) -> bool {
    speed_factor != 0 && index % speed_factor as u64 == 0
}

/// Number of frames kept from `total_frames` at `speed_factor`, i.e.
/// `ceil(total_frames / speed_factor)`.
pub fn expected_kept_frames(total_frames: u64, speed_factor: u32) -> u64 {
    if speed_factor == 0 {
        return 0;
    }
    total_frames.div_ceil(speed_factor as u64)
}

/// Outcome of a decimation pass.
#[derive(Debug, Clone)]
#[must_use]
pub struct DecimationReport {
    /// Intermediate file that was written.
    pub path: PathBuf,
    /// Frames decoded from the source.
    pub frames_read: u64,
    /// Frames written to the intermediate.
    pub frames_written: u64,
    /// Frame rate of the intermediate: the source rate times
    /// `speed_factor`, approximated when the exact fraction does not fit
    /// an MPEG-4 time base (see [`utilities::scale_frame_rate`]).
    pub frame_rate: Rational,
    /// Width of the intermediate, equal to the source.
    pub width: u32,
    /// Height of the intermediate, equal to the source.
    pub height: u32,
    /// Speed factor that was applied.
    pub speed_factor: u32,
}

/// Writes every Nth frame of a source to an intermediate file.
#[derive(Debug, Clone)]
pub struct Decimator {
    speed_factor: u32,
    bitrate: Option<usize>,
}

impl Decimator {
    /// Create a decimator keeping one frame in every `speed_factor`.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedupError::InvalidSpeedFactor`] if `speed_factor` is 0.
    pub fn new(speed_factor: u32) -> Result<Self, SpeedupError> {
        if speed_factor == 0 {
            return Err(SpeedupError::InvalidSpeedFactor(speed_factor));
        }
        Ok(Self {
            speed_factor,
            bitrate: None,
        })
    }

    /// Set the intermediate bitrate in bits per second.
    pub fn bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// The configured speed factor.
    pub fn speed_factor(&self) -> u32 {
        self.speed_factor
    }

    /// Decimate `source` into `intermediate`.
    ///
    /// The intermediate is created (or overwritten) only after the source
    /// has passed [`VideoSource::ensure_readable`] and the output frame
    /// rate has been computed. If anything fails after that, the partial
    /// intermediate is removed before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`SpeedupError::UnreadableSource`] for zero-sized or frameless
    ///   sources.
    /// - [`SpeedupError::UnsupportedFrameRate`] if the sped-up rate is out
    ///   of range.
    /// - Decode, encode, and write errors from the frame loop.
    /// - [`SpeedupError::IntermediateWriteFailed`] if no frame was written
    ///   or the intermediate is missing or empty once both handles are
    ///   released.
    pub fn run<P: AsRef<Path>>(
        &self,
        source: &mut VideoSource,
        intermediate: P,
    ) -> Result<DecimationReport, SpeedupError> {
        let intermediate = intermediate.as_ref();
        source.ensure_readable()?;

        let metadata = source.metadata().clone();
        let frame_rate = utilities::scale_frame_rate(metadata.frame_rate, self.speed_factor)?;

        log::info!(
            "Decimating {} x{} ({} frames, {} -> {} fps) into {}",
            source.path().display(),
            self.speed_factor,
            metadata.frame_count,
            metadata.frame_rate,
            frame_rate,
            intermediate.display(),
        );

        let mut options = FrameWriterOptions::new(metadata.width, metadata.height, frame_rate);
        if let Some(bitrate) = self.bitrate {
            options = options.bitrate(bitrate);
        }

        let written = self
            .write_frames(source, intermediate, options)
            .and_then(|(frames_read, frames_written)| {
                let bytes = verify_intermediate(intermediate, frames_written)?;
                Ok((frames_read, frames_written, bytes))
            });
        let (frames_read, frames_written, written_bytes) =
            discard_on_error(intermediate, written)?;

        log::info!(
            "Kept {frames_written} of {frames_read} frames ({written_bytes} bytes) in {}",
            intermediate.display()
        );

        Ok(DecimationReport {
            path: intermediate.to_path_buf(),
            frames_read,
            frames_written,
            frame_rate,
            width: metadata.width,
            height: metadata.height,
            speed_factor: self.speed_factor,
        })
    }

    /// Run the keep-every-Nth loop. Returns `(frames_read, frames_written)`.
    fn write_frames(
        &self,
        source: &mut VideoSource,
        intermediate: &Path,
        options: FrameWriterOptions,
    ) -> Result<(u64, u64), SpeedupError> {
        let mut writer = FrameWriter::create(intermediate, options)?;
        let mut frame_index: u64 = 0;
        for frame in source.frames()? {
            let frame = frame?;
            if should_keep(frame_index, self.speed_factor) {
                writer.write(&frame)?;
            }
            frame_index += 1;
        }
        Ok((frame_index, writer.finish()?))
    }
}

impl Default for Decimator {
    fn default() -> Self {
        Self {
            speed_factor: DEFAULT_SPEED_FACTOR,
            bitrate: None,
        }
    }
}

/// Check the finished intermediate and return its size in bytes.
///
/// A file holding only a header and trailer is as useless to the encoder
/// as a missing one.
fn verify_intermediate(path: &Path, frames_written: u64) -> Result<u64, SpeedupError> {
    let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if frames_written == 0 || bytes == 0 {
        return Err(SpeedupError::IntermediateWriteFailed(path.to_path_buf()));
    }
    Ok(bytes)
}

/// Remove `path` if `result` is an error, then pass `result` through.
fn discard_on_error<T>(path: &Path, result: Result<T, SpeedupError>) -> Result<T, SpeedupError> {
    if result.is_err() && path.exists() {
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Removed partial intermediate {}", path.display()),
            Err(error) => log::warn!(
                "Could not remove partial intermediate {}: {error}",
                path.display()
            ),
        }
    }
    result
}

/// Open `source` and decimate it into `intermediate` by `speed_factor`.
///
/// `source` may start with `~`.
///
/// # Errors
///
/// [`SpeedupError::InvalidSpeedFactor`], [`SpeedupError::SourceNotFound`],
/// and everything [`Decimator::run`] returns.
pub fn decimate<P1: AsRef<Path>, P2: AsRef<Path>>(
    source: P1,
    intermediate: P2,
    speed_factor: u32,
) -> Result<DecimationReport, SpeedupError> {
    let decimator = Decimator::new(speed_factor)?;
    let mut source = VideoSource::open(source)?;
    decimator.run(&mut source, intermediate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_every_nth_frame_from_zero() {
        let kept: Vec<u64> = (0..10).filter(|&i| should_keep(i, 3)).collect();
        assert_eq!(kept, vec![0, 3, 6, 9]);

        let all: Vec<u64> = (0..4).filter(|&i| should_keep(i, 1)).collect();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[test]
    fn kept_count_is_ceiling_division() {
        assert_eq!(expected_kept_frames(10, 2), 5);
        assert_eq!(expected_kept_frames(11, 2), 6);
        assert_eq!(expected_kept_frames(10, 3), 4);
        assert_eq!(expected_kept_frames(1, 8), 1);
        assert_eq!(expected_kept_frames(0, 2), 0);
    }

    #[test]
    fn kept_count_matches_predicate() {
        for total in 0..40 {
            for factor in 1..7 {
                let kept = (0..total).filter(|&i| should_keep(i, factor)).count() as u64;
                assert_eq!(kept, expected_kept_frames(total, factor), "{total}/{factor}");
            }
        }
    }

    #[test]
    fn zero_speed_factor_is_rejected() {
        let error = Decimator::new(0).unwrap_err();
        assert!(matches!(error, SpeedupError::InvalidSpeedFactor(0)));
        assert!(!should_keep(0, 0));
        assert_eq!(expected_kept_frames(10, 0), 0);
    }

    #[test]
    fn default_factor_is_two() {
        assert_eq!(Decimator::default().speed_factor(), 2);
    }

    #[test]
    fn intermediate_without_frames_is_rejected() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("fast.mov");
        std::fs::write(&path, b"moov and nothing else").expect("write file");

        let error = verify_intermediate(&path, 0).unwrap_err();
        assert!(matches!(error, SpeedupError::IntermediateWriteFailed(ref p) if *p == path));
        assert_eq!(verify_intermediate(&path, 3).unwrap(), 21);
    }

    #[test]
    fn missing_intermediate_is_rejected() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let error = verify_intermediate(&dir.path().join("absent.mov"), 5).unwrap_err();
        assert!(matches!(error, SpeedupError::IntermediateWriteFailed(_)));
    }

    #[test]
    fn partial_intermediate_is_removed_on_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("fast.mov");
        std::fs::write(&path, b"header without trailer").expect("write file");

        let result: Result<(), SpeedupError> = discard_on_error(
            &path,
            Err(SpeedupError::VideoDecodeError("corrupt packet".to_string())),
        );
        assert!(matches!(result, Err(SpeedupError::VideoDecodeError(_))));
        assert!(!path.exists());
    }

    #[test]
    fn intermediate_is_kept_on_success() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("fast.mov");
        std::fs::write(&path, b"frames").expect("write file");

        assert_eq!(discard_on_error(&path, Ok(7)).unwrap(), 7);
        assert!(path.exists());
    }
}
