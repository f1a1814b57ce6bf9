//! Source video metadata.
//!
//! [`SourceMetadata`] is read once when a [`VideoSource`](crate::VideoSource)
//! is opened and cached for its lifetime.

use std::time::Duration;

use ffmpeg_next::Rational;

/// Properties of the video stream being sped up.
///
/// # Example
///
/// ```no_run
/// use speedup::VideoSource;
///
/// let source = VideoSource::open("input.mov")?;
/// let metadata = source.metadata();
/// println!("{}x{} @ {} fps", metadata.width, metadata.height, metadata.frames_per_second);
/// # Ok::<(), speedup::SpeedupError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct SourceMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Exact average frame rate of the stream.
    pub frame_rate: Rational,
    /// `frame_rate` as a floating point value.
    pub frames_per_second: f64,
    /// Total number of frames. Taken from the container when it records
    /// one, otherwise estimated from duration and frame rate.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"hevc"`, `"prores"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
    /// Container duration.
    pub duration: Duration,
}

impl SourceMetadata {
    /// Whether every attribute needed for decimation is non-zero.
    pub fn is_readable(&self) -> bool {
        self.width > 0 && self.height > 0 && self.frame_count > 0 && self.frames_per_second > 0.0
    }
}
