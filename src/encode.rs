//! Intermediate video writer.
//!
//! [`FrameWriter`] encodes decoded FFmpeg frames into a MOV container using
//! MPEG-4 Part 2 video tagged `mp4v`. Frames are written with consecutive
//! timestamps at the configured frame rate, so the playback speed of the
//! output is set entirely by that rate.
//!
//! # Example
//!
//! ```no_run
//! use ffmpeg_next::Rational;
//! use speedup::{FrameWriter, FrameWriterOptions, VideoSource};
//!
//! let mut source = VideoSource::open("input.mov")?;
//! let metadata = source.metadata().clone();
//! let options = FrameWriterOptions::new(metadata.width, metadata.height, Rational::new(60, 1));
//! let mut writer = FrameWriter::create("copy.mov", options)?;
//! for frame in source.frames()? {
//!     writer.write(&frame?)?;
//! }
//! writer.finish()?;
//! # Ok::<(), speedup::SpeedupError>(())
//! ```

use std::path::{Path, PathBuf};

use ffmpeg_next::codec::Id;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::encoder::Video as VideoEncoder;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::{Flags as FormatFlags, Pixel};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Packet, Rational};

use crate::error::SpeedupError;

/// Four-character code stored in the container for the video track.
pub const MP4V_TAG: u32 = u32::from_le_bytes(*b"mp4v");

const DEFAULT_BITRATE: usize = 8_000_000;

/// Options for [`FrameWriter`].
#[derive(Debug, Clone, Copy)]
pub struct FrameWriterOptions {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub frame_rate: Rational,
    /// Target bitrate in bits per second (default: 8 Mb/s).
    pub bitrate: usize,
}

impl FrameWriterOptions {
    /// Options for a `width`x`height` stream at `frame_rate`.
    pub fn new(width: u32, height: u32, frame_rate: Rational) -> Self {
        Self {
            width,
            height,
            frame_rate,
            bitrate: DEFAULT_BITRATE,
        }
    }

    /// Set the target bitrate in bits per second.
    pub fn bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = bitrate;
        self
    }
}

/// Streams frames into an `mp4v` video file.
///
/// Create with [`FrameWriter::create`], feed frames with
/// [`write`](FrameWriter::write), and call [`finish`](FrameWriter::finish)
/// to flush the encoder and write the trailer. Dropping a writer without
/// finishing closes the file but leaves it without a trailer.
pub struct FrameWriter {
    output: Output,
    encoder: VideoEncoder,
    scaler: Option<ScalingContext>,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    next_pts: i64,
    path: PathBuf,
}

impl FrameWriter {
    const PIXEL_FORMAT: Pixel = Pixel::YUV420P;

    /// Open `path` for writing and write the container header.
    ///
    /// The container format is inferred from the extension, so `path`
    /// should end in `.mov` (or another extension whose muxer accepts
    /// MPEG-4 Part 2).
    ///
    /// # Errors
    ///
    /// - [`SpeedupError::VideoWriteError`] if the file or stream cannot be
    ///   created.
    /// - [`SpeedupError::VideoEncodeError`] if the MPEG-4 encoder is
    ///   unavailable or rejects the options.
    pub fn create<P: AsRef<Path>>(
        path: P,
        options: FrameWriterOptions,
    ) -> Result<Self, SpeedupError> {
        let path = path.as_ref();
        let FrameWriterOptions {
            width,
            height,
            frame_rate,
            bitrate,
        } = options;

        if width == 0 || height == 0 || frame_rate.numerator() <= 0 || frame_rate.denominator() <= 0 {
            return Err(SpeedupError::VideoEncodeError(format!(
                "invalid stream parameters: {width}x{height} @ {frame_rate}"
            )));
        }

        log::debug!(
            "Creating intermediate {} ({width}x{height} @ {frame_rate}, {bitrate} b/s)",
            path.display()
        );

        ffmpeg_next::init()
            .map_err(|e| SpeedupError::VideoWriteError(format!("FFmpeg initialisation failed: {e}")))?;

        let mut output = ffmpeg_next::format::output(&path)
            .map_err(|e| SpeedupError::VideoWriteError(format!("cannot open output: {e}")))?;

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(Id::MPEG4).ok_or_else(|| {
            SpeedupError::VideoEncodeError("MPEG-4 Part 2 encoder not available".to_string())
        })?;

        let encoder_time_base = frame_rate.invert();

        let mut stream = output
            .add_stream(codec)
            .map_err(|e| SpeedupError::VideoWriteError(format!("cannot add stream: {e}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.encoder().video())
            .map_err(|e| SpeedupError::VideoEncodeError(format!("cannot create encoder: {e}")))?;

        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(Self::PIXEL_FORMAT);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(frame_rate));
        encoder.set_bit_rate(bitrate);

        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let encoder = encoder
            .open_as(codec)
            .map_err(|e| SpeedupError::VideoEncodeError(format!("cannot open encoder: {e}")))?;

        stream.set_parameters(&encoder);
        stream.set_time_base(encoder_time_base);
        stream.set_avg_frame_rate(frame_rate);
        unsafe {
            (*stream.parameters().as_mut_ptr()).codec_tag = MP4V_TAG;
        }

        output
            .write_header()
            .map_err(|e| SpeedupError::VideoWriteError(format!("cannot write header: {e}")))?;

        // The muxer may pick its own time base while writing the header.
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| SpeedupError::VideoWriteError("output stream vanished".to_string()))?;

        Ok(Self {
            output,
            encoder,
            scaler: None,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width,
            height,
            next_pts: 0,
            path: path.to_path_buf(),
        })
    }

    /// Path being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.next_pts as u64
    }

    /// Encode one frame.
    ///
    /// Frames in another pixel format or size are converted to the output
    /// format first. The frame's own timestamp is ignored: each frame is
    /// placed one tick after the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedupError::VideoWriteError`] or
    /// [`SpeedupError::VideoEncodeError`] on failure.
    pub fn write(&mut self, frame: &VideoFrame) -> Result<(), SpeedupError> {
        if self.scaler.is_none() {
            let scaler = ScalingContext::get(
                frame.format(),
                frame.width(),
                frame.height(),
                Self::PIXEL_FORMAT,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|e| SpeedupError::VideoWriteError(format!("cannot create scaler: {e}")))?;
            self.scaler = Some(scaler);
        }

        let mut converted = VideoFrame::empty();
        if let Some(scaler) = &mut self.scaler {
            scaler
                .run(frame, &mut converted)
                .map_err(|e| SpeedupError::VideoWriteError(format!("scaling failed: {e}")))?;
        }

        converted.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&converted)
            .map_err(|e| SpeedupError::VideoEncodeError(format!("send_frame failed: {e}")))?;

        self.drain_packets()
    }

    /// Flush the encoder, write the trailer, and close the file.
    ///
    /// Returns the number of frames written.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedupError::VideoWriteError`] or
    /// [`SpeedupError::VideoEncodeError`] on failure.
    pub fn finish(mut self) -> Result<u64, SpeedupError> {
        self.encoder
            .send_eof()
            .map_err(|e| SpeedupError::VideoEncodeError(format!("send_eof failed: {e}")))?;
        self.drain_packets()?;

        self.output
            .write_trailer()
            .map_err(|e| SpeedupError::VideoWriteError(format!("cannot write trailer: {e}")))?;

        log::debug!("Wrote {} frames to {}", self.next_pts, self.path.display());
        Ok(self.frames_written())
    }

    fn drain_packets(&mut self) -> Result<(), SpeedupError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            if packet.duration() == 0 {
                packet.set_duration(1);
            }
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| SpeedupError::VideoWriteError(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }
}
