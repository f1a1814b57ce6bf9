//! Final re-encode through an external `ffmpeg` process.
//!
//! [`Transcoder`] runs
//! `ffmpeg -y -i <intermediate> -vcodec h264 -acodec aac <output>`
//! synchronously, with stdin closed and stdout/stderr inherited, and then
//! removes the intermediate according to its [`CleanupPolicy`].
//!
//! # Example
//!
//! ```no_run
//! use speedup::{CleanupPolicy, Transcoder};
//!
//! let report = Transcoder::new()
//!     .program("/opt/ffmpeg/bin/ffmpeg")
//!     .cleanup(CleanupPolicy::OnSuccess)
//!     .run("intermediate.mov", "output.mp4")?;
//! assert!(report.intermediate_removed);
//! # Ok::<(), speedup::SpeedupError>(())
//! ```

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::error::SpeedupError;

/// When the transcoder deletes its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Delete the intermediate only after the encoder exits successfully
    /// and the output exists. On failure the intermediate is left in place.
    #[default]
    OnSuccess,
    /// Delete the intermediate as soon as the encoder process returns,
    /// whatever its exit status.
    Always,
}

/// Outcome of a transcode.
#[derive(Debug, Clone)]
#[must_use]
pub struct TranscodeReport {
    /// Final artifact path.
    pub output: PathBuf,
    /// Whether the intermediate was deleted.
    pub intermediate_removed: bool,
}

/// Builder for the external encoder invocation.
#[derive(Debug, Clone)]
pub struct Transcoder {
    program: OsString,
    video_codec: String,
    audio_codec: String,
    cleanup: CleanupPolicy,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self {
            program: OsString::from("ffmpeg"),
            video_codec: "h264".to_string(),
            audio_codec: "aac".to_string(),
            cleanup: CleanupPolicy::OnSuccess,
        }
    }
}

impl Transcoder {
    /// A transcoder running `ffmpeg` from `PATH` with `h264`/`aac`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the encoder executable.
    pub fn program<S: Into<OsString>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    /// Set the video codec name passed to `-vcodec`.
    pub fn video_codec<S: Into<String>>(mut self, codec: S) -> Self {
        self.video_codec = codec.into();
        self
    }

    /// Set the audio codec name passed to `-acodec`.
    pub fn audio_codec<S: Into<String>>(mut self, codec: S) -> Self {
        self.audio_codec = codec.into();
        self
    }

    /// Set when the intermediate is deleted.
    pub fn cleanup(mut self, policy: CleanupPolicy) -> Self {
        self.cleanup = policy;
        self
    }

    /// Build the encoder command without running it.
    pub fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vcodec")
            .arg(&self.video_codec)
            .arg("-acodec")
            .arg(&self.audio_codec)
            .arg(output)
            .stdin(Stdio::null());
        command
    }

    /// Convert `input` into `output`, then clean up `input`.
    ///
    /// # Errors
    ///
    /// - [`SpeedupError::IntermediateNotFound`] if `input` does not exist.
    /// - [`SpeedupError::EncoderSpawn`] if the program cannot be started.
    /// - [`SpeedupError::EncoderFailed`] on a non-zero exit.
    /// - [`SpeedupError::OutputMissing`] if the encoder exits cleanly but
    ///   `output` does not exist.
    /// - [`SpeedupError::IoError`] if the encode succeeded but the
    ///   intermediate cannot be deleted. After a failed encode the removal
    ///   error is only logged.
    pub fn run<P1: AsRef<Path>, P2: AsRef<Path>>(
        &self,
        input: P1,
        output: P2,
    ) -> Result<TranscodeReport, SpeedupError> {
        let input = input.as_ref();
        let output = output.as_ref();

        if !input.exists() {
            return Err(SpeedupError::IntermediateNotFound(input.to_path_buf()));
        }

        log::info!(
            "Converting {} -> {} ({}/{})",
            input.display(),
            output.display(),
            self.video_codec,
            self.audio_codec,
        );

        let status = self.command(input, output).status().map_err(|source| {
            SpeedupError::EncoderSpawn {
                program: self.program.to_string_lossy().into_owned(),
                source,
            }
        })?;

        let outcome = if !status.success() {
            Err(SpeedupError::EncoderFailed {
                status,
                input: input.to_path_buf(),
            })
        } else if !output.exists() {
            Err(SpeedupError::OutputMissing(output.to_path_buf()))
        } else {
            Ok(())
        };

        let remove = match self.cleanup {
            CleanupPolicy::Always => true,
            CleanupPolicy::OnSuccess => outcome.is_ok(),
        };

        let mut intermediate_removed = false;
        if remove && input.exists() {
            match fs::remove_file(input) {
                Ok(()) => {
                    intermediate_removed = true;
                    log::debug!("Removed intermediate {}", input.display());
                }
                // The encoder's own failure is the more useful error.
                Err(error) if outcome.is_err() => log::warn!(
                    "Could not remove intermediate {}: {error}",
                    input.display()
                ),
                Err(error) => return Err(error.into()),
            }
        } else if outcome.is_err() && input.exists() {
            log::warn!("Keeping intermediate {} for inspection", input.display());
        }

        outcome.map(|()| TranscodeReport {
            output: output.to_path_buf(),
            intermediate_removed,
        })
    }
}
