use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::capabilities::RawFrame;
use crate::{AppError, ErrorKind, MAX_FRAME_DIMENSION};

pub const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame has zero width or height")]
    Empty,

    #[error("frame too large: {width}x{height}, max {max}x{max}")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("jpeg encoding failed: {source}")]
    Encode {
        #[from]
        source: image::ImageError,
    },

    #[error("not a base64 data URI: {reason}")]
    InvalidDataUri { reason: &'static str },
}

impl From<FrameError> for AppError {
    fn from(err: FrameError) -> Self {
        let kind = match err {
            FrameError::InvalidDataUri { .. } => ErrorKind::InputMissing,
            _ => ErrorKind::Internal,
        };
        AppError::new(kind, "Unable to process the image. Please try again.")
            .with_internal(err.to_string())
    }
}

/// Encodes an RGBA still as a baseline JPEG. Alpha is dropped.
#[instrument(skip(frame), fields(width = frame.width, height = frame.height))]
pub fn encode_jpeg(frame: &RawFrame, quality: u8) -> Result<Vec<u8>, FrameError> {
    let (width, height) = (frame.width, frame.height);
    if width == 0 || height == 0 {
        return Err(FrameError::Empty);
    }
    if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
        return Err(FrameError::TooLarge {
            width,
            height,
            max: MAX_FRAME_DIMENSION,
        });
    }

    let expected = width as usize * height as usize * 4;
    if frame.rgba.len() != expected {
        return Err(FrameError::BufferMismatch {
            width,
            height,
            expected,
            actual: frame.rgba.len(),
        });
    }

    let rgb: Vec<u8> = frame
        .rgba
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Vec::with_capacity(rgb.len() / 8);
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).write_image(
        &rgb,
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;

    debug!(bytes = out.len(), quality, "frame encoded");
    Ok(out)
}

pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Captures a frame as the `data:image/jpeg;base64,...` payload the
/// classification flow expects.
pub fn encode_data_uri(frame: &RawFrame, quality: u8) -> Result<String, FrameError> {
    let jpeg = encode_jpeg(frame, quality)?;
    Ok(to_data_uri(JPEG_MIME, &jpeg))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn parse_data_uri(uri: &str) -> Result<DataUri, FrameError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or(FrameError::InvalidDataUri {
            reason: "missing data: prefix",
        })?;
    let (header, payload) = rest.split_once(',').ok_or(FrameError::InvalidDataUri {
        reason: "missing ',' separator",
    })?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(FrameError::InvalidDataUri {
            reason: "payload is not base64",
        })?;
    if !mime.contains('/') {
        return Err(FrameError::InvalidDataUri {
            reason: "missing MIME type",
        });
    }
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| FrameError::InvalidDataUri {
            reason: "invalid base64",
        })?;
    if bytes.is_empty() {
        return Err(FrameError::InvalidDataUri {
            reason: "empty payload",
        });
    }
    Ok(DataUri {
        mime: mime.to_string(),
        bytes,
    })
}
