//! Error types for the `speedup` crate.
//!
//! This module defines [`SpeedupError`], the unified error type returned by
//! every fallible stage: probing the source, decimating frames, and handing
//! the intermediate file to the external encoder. Variants carry the paths
//! and values involved so callers can report failures without scraping log
//! output.

use std::{
    io::Error as IoError,
    path::PathBuf,
    process::ExitStatus,
};

use ffmpeg_next::{Error as FfmpegError, Rational};
use thiserror::Error;

/// The unified error type for all `speedup` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpeedupError {
    /// The source video does not exist on disk.
    #[error("Input file does not exist: {0}")]
    SourceNotFound(PathBuf),

    /// The source video could not be opened by FFmpeg.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The source opened, but reports a zero frame count, frame rate, or
    /// dimension.
    #[error(
        "Cannot read video file {path}: {width}x{height}, {frames_per_second} fps, {frame_count} frames"
    )]
    UnreadableSource {
        /// Path of the rejected source.
        path: PathBuf,
        /// Reported frame width.
        width: u32,
        /// Reported frame height.
        height: u32,
        /// Reported frame rate.
        frames_per_second: f64,
        /// Reported (or estimated) frame count.
        frame_count: u64,
    },

    /// A speed factor of zero was provided.
    #[error("Speed factor must be greater than zero (got {0})")]
    InvalidSpeedFactor(u32),

    /// The source frame rate times the speed factor cannot be encoded.
    #[error("Cannot speed up {frame_rate} fps by {speed_factor}x: resulting frame rate is out of range")]
    UnsupportedFrameRate {
        /// Source frame rate.
        frame_rate: Rational,
        /// Requested speed factor.
        speed_factor: u32,
    },

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The intermediate encoder could not be found, opened, or fed.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// The intermediate container could not be written.
    #[error("Video write error: {0}")]
    VideoWriteError(String),

    /// Decimation finished but the intermediate file is missing or empty.
    #[error("Failed to save sped-up video (file does not exist): {0}")]
    IntermediateWriteFailed(PathBuf),

    /// The transcoder was handed an intermediate file that does not exist.
    #[error("File to convert does not exist: {0}")]
    IntermediateNotFound(PathBuf),

    /// The external encoder process could not be started.
    #[error("Failed to start encoder `{program}`: {source}")]
    EncoderSpawn {
        /// Program that was executed.
        program: String,
        /// Error returned by the operating system.
        #[source]
        source: IoError,
    },

    /// The external encoder ran but exited unsuccessfully.
    #[error("Encoder exited with {status} while converting {input}")]
    EncoderFailed {
        /// Exit status reported by the process.
        status: ExitStatus,
        /// Intermediate file the encoder was reading.
        input: PathBuf,
    },

    /// The external encoder exited successfully without producing output.
    #[error("Encoder reported success but produced no output at {0}")]
    OutputMissing(PathBuf),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for SpeedupError {
    fn from(error: FfmpegError) -> Self {
        SpeedupError::FfmpegError(error.to_string())
    }
}
