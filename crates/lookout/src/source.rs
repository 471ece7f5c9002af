//! Frame acquisition.
//!
//! A [`FrameSource`] yields a lazy, finite, non-restartable sequence of
//! decoded RGB frames, terminated by `Ok(None)`. The ffmpeg-backed
//! [`VideoFileSource`] is feature-gated (`ffmpeg`) so the core library and
//! its tests build without system ffmpeg libraries.

use image::RgbImage;

use crate::error::SourceError;

/// A single decoded video frame.
///
/// Owned exclusively by the loop iteration that fetched it until it is
/// handed to the renderer and display.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonically increasing sequence index, starting at 0
    pub index: u64,
    image: RgbImage,
}

impl Frame {
    /// Wraps a raw RGB8 buffer. Returns `None` if the buffer length does
    /// not match `width * height * 3`.
    pub fn from_rgb8(index: u64, width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(|image| Self { index, image })
    }

    /// A uniformly colored frame, mainly useful in tests.
    pub fn solid(index: u64, width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            index,
            image: RgbImage::from_pixel(width, height, image::Rgb(color)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Raw RGB8 pixel bytes, row-major, no padding.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Sequential frame supplier.
pub trait FrameSource {
    /// Fetch the next frame. `Ok(None)` signals end of stream; the source
    /// must not be polled again afterwards.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

#[cfg(feature = "ffmpeg")]
pub use self::ffmpeg_source::VideoFileSource;

#[cfg(feature = "ffmpeg")]
mod ffmpeg_source {
    use ffmpeg_next as ffmpeg;
    use tracing::info;

    use super::{Frame, FrameSource};
    use crate::error::SourceError;

    /// ffmpeg-backed video source: file path, RTSP URI, or anything else
    /// libavformat can open. Decodes the best video stream and converts
    /// every frame to RGB24 via swscale.
    pub struct VideoFileSource {
        ictx: ffmpeg::format::context::Input,
        decoder: ffmpeg::decoder::Video,
        scaler: ffmpeg::software::scaling::Context,
        stream_index: usize,
        next_index: u64,
        flushed: bool,
    }

    impl VideoFileSource {
        /// Opens the input and prepares decoder and RGB converter.
        pub fn open(uri: &str) -> Result<Self, SourceError> {
            ffmpeg::init().map_err(|e| SourceError::Open {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;

            let ictx = ffmpeg::format::input(&uri).map_err(|e| SourceError::Open {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;

            let stream = ictx
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| SourceError::NoVideoStream(uri.to_string()))?;
            let stream_index = stream.index();

            let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| SourceError::Open {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                })?;
            let decoder = context.decoder().video().map_err(|e| SourceError::Open {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;

            let scaler = ffmpeg::software::scaling::Context::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                ffmpeg::format::Pixel::RGB24,
                decoder.width(),
                decoder.height(),
                ffmpeg::software::scaling::Flags::BILINEAR,
            )
            .map_err(|e| SourceError::Open {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;

            info!(
                "Opened video source {} ({}x{})",
                uri,
                decoder.width(),
                decoder.height()
            );

            Ok(Self {
                ictx,
                decoder,
                scaler,
                stream_index,
                next_index: 0,
                flushed: false,
            })
        }

        /// Pull one decoded frame out of the codec, if available.
        fn receive_decoded(&mut self) -> Result<Option<Frame>, SourceError> {
            let mut decoded = ffmpeg::util::frame::Video::empty();
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => {
                    let mut rgb = ffmpeg::util::frame::Video::empty();
                    self.scaler
                        .run(&decoded, &mut rgb)
                        .map_err(|e| SourceError::Decode(e.to_string()))?;

                    let width = rgb.width();
                    let height = rgb.height();
                    let stride = rgb.stride(0);
                    let plane = rgb.data(0);
                    let row_len = width as usize * 3;

                    // swscale pads rows; copy them out tightly packed
                    let mut data = Vec::with_capacity(row_len * height as usize);
                    for y in 0..height as usize {
                        let start = y * stride;
                        data.extend_from_slice(&plane[start..start + row_len]);
                    }

                    let index = self.next_index;
                    self.next_index += 1;

                    Frame::from_rgb8(index, width, height, data)
                        .map(Some)
                        .ok_or_else(|| {
                            SourceError::Decode(format!(
                                "decoded frame {} has a short pixel buffer",
                                index
                            ))
                        })
                }
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {
                    Ok(None)
                }
                Err(ffmpeg::Error::Eof) => Ok(None),
                Err(e) => Err(SourceError::Decode(e.to_string())),
            }
        }
    }

    impl FrameSource for VideoFileSource {
        fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
            loop {
                if let Some(frame) = self.receive_decoded()? {
                    return Ok(Some(frame));
                }
                if self.flushed {
                    return Ok(None);
                }

                // Feed the decoder the next packet of our stream, or flush
                // it once the demuxer runs dry.
                let stream_index = self.stream_index;
                let packet = self
                    .ictx
                    .packets()
                    .find(|(stream, _)| stream.index() == stream_index)
                    .map(|(_, packet)| packet);

                match packet {
                    Some(packet) => {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|e| SourceError::Decode(e.to_string()))?;
                    }
                    None => {
                        self.decoder
                            .send_eof()
                            .map_err(|e| SourceError::Decode(e.to_string()))?;
                        self.flushed = true;
                    }
                }
            }
        }
    }
}
