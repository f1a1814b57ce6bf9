//! Pipeline configuration.
//!
//! [`SpeedUpOptions`] gathers everything [`speed_up_video`](crate::speed_up_video)
//! needs beyond the input and output paths. All settings have defaults that
//! reproduce the classic behaviour: double speed, `ffmpeg` from `PATH`,
//! H.264 video and AAC audio.
//!
//! # Example
//!
//! ```
//! use speedup::{CleanupPolicy, SpeedUpOptions};
//!
//! let options = SpeedUpOptions::new()
//!     .with_speed_factor(4)
//!     .with_ffmpeg_program("/opt/homebrew/bin/ffmpeg")
//!     .with_cleanup(CleanupPolicy::Always);
//! assert_eq!(options.speed_factor, 4);
//! ```

use std::{ffi::OsString, path::PathBuf};

use crate::{
    decimate::{DEFAULT_SPEED_FACTOR, Decimator},
    error::SpeedupError,
    transcode::{CleanupPolicy, Transcoder},
};

/// Settings for a speed-up run.
#[derive(Debug, Clone)]
pub struct SpeedUpOptions {
    /// Keep one frame in every `speed_factor` and multiply the frame rate
    /// by it. Must be non-zero.
    pub speed_factor: u32,
    /// Bitrate of the intermediate file. `None` uses the writer default.
    pub intermediate_bitrate: Option<usize>,
    /// Directory for the intermediate file. `None` uses the system
    /// temporary directory.
    pub intermediate_dir: Option<PathBuf>,
    /// External encoder executable.
    pub ffmpeg_program: OsString,
    /// Final video codec name.
    pub video_codec: String,
    /// Final audio codec name.
    pub audio_codec: String,
    /// When the intermediate is deleted.
    pub cleanup: CleanupPolicy,
}

impl Default for SpeedUpOptions {
    fn default() -> Self {
        Self {
            speed_factor: DEFAULT_SPEED_FACTOR,
            intermediate_bitrate: None,
            intermediate_dir: None,
            ffmpeg_program: OsString::from("ffmpeg"),
            video_codec: "h264".to_string(),
            audio_codec: "aac".to_string(),
            cleanup: CleanupPolicy::OnSuccess,
        }
    }
}

impl SpeedUpOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the speed factor.
    pub fn with_speed_factor(mut self, speed_factor: u32) -> Self {
        self.speed_factor = speed_factor;
        self
    }

    /// Set the intermediate bitrate in bits per second.
    pub fn with_intermediate_bitrate(mut self, bitrate: usize) -> Self {
        self.intermediate_bitrate = Some(bitrate);
        self
    }

    /// Place the intermediate file in `dir`.
    pub fn with_intermediate_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.intermediate_dir = Some(dir.into());
        self
    }

    /// Set the external encoder executable.
    pub fn with_ffmpeg_program<S: Into<OsString>>(mut self, program: S) -> Self {
        self.ffmpeg_program = program.into();
        self
    }

    /// Set the final video codec name.
    pub fn with_video_codec<S: Into<String>>(mut self, codec: S) -> Self {
        self.video_codec = codec.into();
        self
    }

    /// Set the final audio codec name.
    pub fn with_audio_codec<S: Into<String>>(mut self, codec: S) -> Self {
        self.audio_codec = codec.into();
        self
    }

    /// Set the cleanup policy.
    pub fn with_cleanup(mut self, policy: CleanupPolicy) -> Self {
        self.cleanup = policy;
        self
    }

    /// Build the decimation stage.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedupError::InvalidSpeedFactor`] for a zero factor.
    pub fn decimator(&self) -> Result<Decimator, SpeedupError> {
        let decimator = Decimator::new(self.speed_factor)?;
        Ok(match self.intermediate_bitrate {
            Some(bitrate) => decimator.bitrate(bitrate),
            None => decimator,
        })
    }

    /// Build the transcoding stage.
    pub fn transcoder(&self) -> Transcoder {
        Transcoder::new()
            .program(self.ffmpeg_program.clone())
            .video_codec(self.video_codec.clone())
            .audio_codec(self.audio_codec.clone())
            .cleanup(self.cleanup)
    }
}
