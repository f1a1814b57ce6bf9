//! # speedup
//!
//! Speed up a video by dropping frames at a fixed stride, then re-encode the
//! result to MP4 with an external `ffmpeg`.
//!
//! The work happens in two stages:
//!
//! 1. **Decimation** ([`Decimator`]) decodes the source with FFmpeg via
//!    [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), keeps frames
//!    `0, N, 2N, ...`, and writes them to an intermediate MOV at `N` times
//!    the source frame rate.
//! 2. **Transcoding** ([`Transcoder`]) runs
//!    `ffmpeg -y -i <intermediate> -vcodec h264 -acodec aac <output>` and
//!    deletes the intermediate.
//!
//! [`speed_up_video`] runs both with a uniquely named, scoped intermediate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use speedup::SpeedUpOptions;
//!
//! let report = speedup::speed_up_video(
//!     "~/Movies/input.MOV",
//!     "~/Movies/output.mp4",
//!     &SpeedUpOptions::new().with_speed_factor(2),
//! )?;
//! println!("kept {} frames", report.decimation.frames_written);
//! # Ok::<(), speedup::SpeedupError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build the crate, and
//! an `ffmpeg` executable must be available at run time for the final
//! encode.

pub mod config;
pub mod decimate;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod metadata;
pub mod pipeline;
pub mod source;
pub mod transcode;
pub mod utilities;

pub use config::SpeedUpOptions;
pub use decimate::{
    DEFAULT_SPEED_FACTOR, DecimationReport, Decimator, decimate, expected_kept_frames,
    should_keep,
};
pub use encode::{FrameWriter, FrameWriterOptions, MP4V_TAG};
pub use error::SpeedupError;
pub use ffmpeg::{FfmpegLogLevel, UnknownLogLevel, set_ffmpeg_log_level};
pub use metadata::SourceMetadata;
pub use pipeline::{SpeedUpReport, speed_up_video};
pub use source::{DecodedFrames, VideoSource};
pub use transcode::{CleanupPolicy, TranscodeReport, Transcoder};
pub use utilities::expand_home;
