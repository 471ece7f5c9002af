//! Frame compression for transmission.

use image::codecs::jpeg;

use crate::error::EncodeError;
use crate::source::Frame;

/// Codec tag carried alongside an encoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Jpeg,
}

/// A transmission-ready compressed frame. Transient: dropped right after
/// the remote call.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub codec: Codec,
    pub bytes: Vec<u8>,
}

/// Compresses a raw frame into a transmission-ready byte buffer.
///
/// Failures are recoverable: the session loop skips the frame.
pub trait FrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<EncodedFrame, EncodeError>;
}

/// JPEG encoder backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(90)
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&self, frame: &Frame) -> Result<EncodedFrame, EncodeError> {
        let expected = frame.width() as usize * frame.height() as usize * 3;
        if frame.as_raw().len() != expected {
            return Err(EncodeError::InvalidBuffer {
                index: frame.index,
                len: frame.as_raw().len(),
                width: frame.width(),
                height: frame.height(),
            });
        }

        let mut bytes = Vec::new();
        jpeg::JpegEncoder::new_with_quality(&mut bytes, self.quality).encode(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgb8,
        )?;

        Ok(EncodedFrame {
            codec: Codec::Jpeg,
            bytes,
        })
    }
}
