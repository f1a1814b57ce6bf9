//! The complete speed-up pipeline.
//!
//! [`speed_up_video`] probes the source, decimates it into a uniquely named
//! intermediate, hands that to the external encoder, and returns a
//! [`SpeedUpReport`]. The intermediate lives in a scoped temporary file:
//! it is removed if any stage before the encoder fails, and is kept on
//! disk only when the encoder fails under [`CleanupPolicy::OnSuccess`].
//!
//! # Example
//!
//! ```no_run
//! use speedup::SpeedUpOptions;
//!
//! let report = speedup::speed_up_video(
//!     "~/Movies/cup_stacking.MOV",
//!     "~/Movies/cup_stacking_2x.mp4",
//!     &SpeedUpOptions::new(),
//! )?;
//! println!("{} frames -> {}", report.decimation.frames_written, report.output.display());
//! # Ok::<(), speedup::SpeedupError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::{
    config::SpeedUpOptions,
    decimate::DecimationReport,
    error::SpeedupError,
    metadata::SourceMetadata,
    source::VideoSource,
    transcode::CleanupPolicy,
    utilities,
};

const INTERMEDIATE_PREFIX: &str = "speedup-";
const INTERMEDIATE_SUFFIX: &str = ".mov";

/// Outcome of [`speed_up_video`].
#[derive(Debug, Clone)]
#[must_use]
pub struct SpeedUpReport {
    /// Metadata of the source as probed.
    pub source: SourceMetadata,
    /// Result of the decimation stage. `decimation.path` no longer exists
    /// unless the cleanup policy kept it.
    pub decimation: DecimationReport,
    /// Final artifact.
    pub output: PathBuf,
}

/// Speed up `input` by `options.speed_factor` and write an MP4 to `output`.
///
/// Both paths may start with `~`. Nothing is created when the speed factor
/// is invalid or the source is missing or unreadable.
///
/// # Errors
///
/// Any [`SpeedupError`] raised by a stage. When the encoder fails under
/// [`CleanupPolicy::OnSuccess`], the intermediate is persisted and named
/// in the `EncoderFailed` error.
pub fn speed_up_video<P1: AsRef<Path>, P2: AsRef<Path>>(
    input: P1,
    output: P2,
    options: &SpeedUpOptions,
) -> Result<SpeedUpReport, SpeedupError> {
    let output = utilities::expand_home(output);
    let decimator = options.decimator()?;

    let mut source = VideoSource::open(input)?;
    source.ensure_readable()?;
    let source_metadata = source.metadata().clone();

    let intermediate_dir = options
        .intermediate_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let intermediate = tempfile::Builder::new()
        .prefix(INTERMEDIATE_PREFIX)
        .suffix(INTERMEDIATE_SUFFIX)
        .tempfile_in(&intermediate_dir)?
        .into_temp_path();

    let decimation = decimator.run(&mut source, &intermediate)?;
    drop(source);

    log::info!(
        "Sped-up video saved ({} frames at {} fps); converting to {}",
        decimation.frames_written,
        decimation.frame_rate,
        output.display(),
    );

    let transcoder = options.transcoder();
    match transcoder.run(&intermediate, &output) {
        Ok(report) => Ok(SpeedUpReport {
            source: source_metadata,
            decimation,
            output: report.output,
        }),
        Err(error) => {
            if options.cleanup == CleanupPolicy::OnSuccess && intermediate.exists() {
                match intermediate.keep() {
                    Ok(kept) => log::warn!("Intermediate kept at {}", kept.display()),
                    Err(persist) => log::warn!("Could not keep intermediate: {}", persist.error),
                }
            }
            Err(error)
        }
    }
}
