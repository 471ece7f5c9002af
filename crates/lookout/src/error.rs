//! Error taxonomy for the overlay client.
//!
//! The split mirrors how failures are handled by the session loop:
//! - `SourceError` is fatal and surfaces before or during frame fetch.
//! - `EncodeError` is recoverable; the loop skips the frame and continues.
//! - `InferenceError` is fatal once the retry policy is exhausted.
//! - `DisplayError` is fatal (nothing left to present to).
//!
//! Absence of an optional result group (embedding, boxes, keypoints,
//! masks) is never an error; it is a normal, checked state.

use std::time::Duration;

use thiserror::Error;

/// Failures opening or reading the video source. Fatal.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The input could not be opened at session start
    #[error("failed to open video source '{uri}': {reason}")]
    Open { uri: String, reason: String },

    /// The container has no video stream
    #[error("no video stream in '{0}'")]
    NoVideoStream(String),

    /// Decoding a frame failed mid-stream
    #[error("video decode error: {0}")]
    Decode(String),
}

/// Failures compressing a frame for transmission. Recoverable: the loop
/// logs and skips the frame.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// JPEG encoder error
    #[error("jpeg encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),

    /// Frame buffer does not match its declared dimensions
    #[error("frame {index} has an invalid pixel buffer ({len} bytes for {width}x{height})")]
    InvalidBuffer {
        index: u64,
        len: usize,
        width: u32,
        height: u32,
    },
}

/// Failures of the remote inference call. Fatal to the session once the
/// bounded retry policy is exhausted.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The configured endpoint is not a valid URI
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Could not establish the gRPC channel
    #[error("failed to connect to detector: {0}")]
    Connect(#[from] tonic::transport::Error),

    /// The call itself failed (transport or server-side status)
    #[error("inference call failed: {0}")]
    Grpc(#[from] tonic::Status),

    /// The call did not complete within the configured deadline
    #[error("inference call timed out after {0:?}")]
    Timeout(Duration),

    /// The response is not index-aligned with the request. Malformed,
    /// never retried.
    #[error("detector returned {actual} results for {expected} images")]
    ResultCountMismatch { expected: usize, actual: usize },
}

impl InferenceError {
    /// Whether the retry policy may absorb this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Grpc(_) | InferenceError::Timeout(_) => true,
            InferenceError::InvalidEndpoint { .. }
            | InferenceError::Connect(_)
            | InferenceError::ResultCountMismatch { .. } => false,
        }
    }
}

/// Failures presenting a frame or polling for cancellation. Fatal.
#[derive(Error, Debug)]
pub enum DisplayError {
    /// The window could not be created
    #[error("failed to open display window: {0}")]
    Open(String),

    /// Presenting a frame failed
    #[error("failed to present frame: {0}")]
    Present(String),
}

/// Loop-boundary error: everything that terminates a session abnormally.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Display(#[from] DisplayError),
}
