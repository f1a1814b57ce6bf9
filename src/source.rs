//! Opening source videos and reading their frames.
//!
//! [`VideoSource`] opens a file, locates the best video stream, and caches
//! its [`SourceMetadata`]. [`DecodedFrames`] is a lazy, pull-based iterator
//! over that stream: each call to [`next()`](Iterator::next) reads and
//! decodes just enough packets to produce the next frame, so a whole video
//! is never held in memory.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::context::Input,
    frame::Video as VideoFrame,
    media::Type,
};

use crate::{error::SpeedupError, metadata::SourceMetadata, utilities};

/// An opened source video.
///
/// # Example
///
/// ```no_run
/// use speedup::VideoSource;
///
/// let mut source = VideoSource::open("~/Movies/clip.mov")?;
/// source.ensure_readable()?;
///
/// let mut count = 0;
/// for frame in source.frames()? {
///     frame?;
///     count += 1;
/// }
/// println!("decoded {count} frames");
/// # Ok::<(), speedup::SpeedupError>(())
/// ```
pub struct VideoSource {
    input_context: Input,
    metadata: SourceMetadata,
    video_stream_index: usize,
    file_path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a source video.
    ///
    /// A leading `~` is expanded to the home directory. Opening does not
    /// reject zero-sized or frameless streams; call
    /// [`ensure_readable`](VideoSource::ensure_readable) for that.
    ///
    /// # Errors
    ///
    /// - [`SpeedupError::SourceNotFound`] if nothing exists at the path.
    /// - [`SpeedupError::FileOpen`] if FFmpeg cannot open or probe it.
    /// - [`SpeedupError::NoVideoStream`] if it has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SpeedupError> {
        let file_path = utilities::expand_home(path);
        if !file_path.exists() {
            return Err(SpeedupError::SourceNotFound(file_path));
        }

        log::debug!("Opening source video: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| SpeedupError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&file_path).map_err(|error| SpeedupError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let duration = match input_context.duration() {
            micros if micros > 0 => Duration::from_micros(micros as u64),
            _ => Duration::ZERO,
        };
        let format = input_context.format().name().to_string();

        let (video_stream_index, metadata) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(SpeedupError::NoVideoStream)?;
            let index = stream.index();

            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| SpeedupError::FileOpen {
                    path: file_path.clone(),
                    reason: format!("Failed to create video decoder for stream {index}: {error}"),
                })?;

            // Prefer the average rate; fall back to the stream's base rate.
            let frame_rate = if stream.avg_frame_rate().numerator() > 0
                && stream.avg_frame_rate().denominator() > 0
            {
                stream.avg_frame_rate()
            } else {
                stream.rate()
            };
            let frames_per_second = utilities::rational_to_f64(frame_rate);

            let frame_count = match stream.frames() {
                frames if frames > 0 => frames as u64,
                _ if frames_per_second > 0.0 => {
                    (duration.as_secs_f64() * frames_per_second).round() as u64
                }
                _ => 0,
            };

            let codec = decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let metadata = SourceMetadata {
                width: decoder.width(),
                height: decoder.height(),
                frame_rate,
                frames_per_second,
                frame_count,
                codec,
                format,
                duration,
            };
            (index, metadata)
        };

        log::debug!(
            "Source {}: {}x{} @ {:.3} fps, {} frames [{}]",
            file_path.display(),
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            file_path,
        })
    }

    /// Cached metadata of the video stream.
    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// The expanded path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Reject sources whose frame count, frame rate, width, or height is
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedupError::UnreadableSource`] describing what was read.
    pub fn ensure_readable(&self) -> Result<(), SpeedupError> {
        if self.metadata.is_readable() {
            return Ok(());
        }
        Err(SpeedupError::UnreadableSource {
            path: self.file_path.clone(),
            width: self.metadata.width,
            height: self.metadata.height,
            frames_per_second: self.metadata.frames_per_second,
            frame_count: self.metadata.frame_count,
        })
    }

    /// Iterate over decoded frames, in presentation order, from the current
    /// read position.
    ///
    /// # Errors
    ///
    /// Returns an FFmpeg error if the decoder cannot be created.
    pub fn frames(&mut self) -> Result<DecodedFrames<'_>, SpeedupError> {
        DecodedFrames::new(self)
    }
}

/// A lazy iterator over the decoded frames of a [`VideoSource`].
///
/// Borrows the source mutably; dropping the iterator releases the decoder
/// and the borrow.
pub struct DecodedFrames<'a> {
    source: &'a mut VideoSource,
    decoder: VideoDecoder,
    read_errors: u32,
    eof_sent: bool,
    done: bool,
}

/// Consecutive demuxer read errors tolerated before giving up.
const MAX_READ_ERRORS: u32 = 64;

impl<'a> DecodedFrames<'a> {
    fn new(source: &'a mut VideoSource) -> Result<Self, SpeedupError> {
        let stream = source
            .input_context
            .stream(source.video_stream_index)
            .ok_or(SpeedupError::NoVideoStream)?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        Ok(Self {
            source,
            decoder,
            read_errors: 0,
            eof_sent: false,
            done: false,
        })
    }
}

impl Iterator for DecodedFrames<'_> {
    type Item = Result<VideoFrame, SpeedupError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let mut frame = VideoFrame::empty();
            if self.decoder.receive_frame(&mut frame).is_ok() {
                return Some(Ok(frame));
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.source.input_context) {
                Ok(()) => {
                    self.read_errors = 0;
                    if packet.stream() != self.source.video_stream_index {
                        continue;
                    }
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        self.done = true;
                        return Some(Err(SpeedupError::VideoDecodeError(error.to_string())));
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(SpeedupError::VideoDecodeError(error.to_string())));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    self.read_errors += 1;
                    if self.read_errors >= MAX_READ_ERRORS {
                        self.done = true;
                        return Some(Err(SpeedupError::VideoDecodeError(format!(
                            "giving up after {MAX_READ_ERRORS} read errors: {error}"
                        ))));
                    }
                }
            }
        }
    }
}
