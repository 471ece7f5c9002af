//! Real-time detection overlay client.
//!
//! Streams video frames to a remote object detector over gRPC and renders
//! the returned bounding boxes back onto the frames with identity-stable
//! colors. The pipeline is a chain of small seams:
//!
//! - [`source`]: frame acquisition ([`source::FrameSource`]; ffmpeg-backed
//!   file/stream decoding behind the `ffmpeg` feature)
//! - [`encode`]: per-frame JPEG compression for transmission
//! - [`client`]: the tonic detector client with retry and deadline handling
//! - [`detections`]: decoded result groups (embedding, boxes, keypoints,
//!   masks)
//! - [`annotate`]: color assignment and overlay drawing
//! - [`display`]: presentation and cancel polling (minifb window behind the
//!   `display` feature, or headless)
//! - [`session`]: the loop tying the stages together

pub mod annotate;
pub mod client;
pub mod config;
pub mod detections;
pub mod display;
pub mod encode;
pub mod error;
pub mod labels;
pub mod session;
pub mod source;

pub use annotate::{Annotator, ColorMap};
pub use client::{Infer, InferenceClient};
pub use config::{ClientConfig, RetryPolicy, SessionConfig, DEFAULT_ENDPOINT};
pub use detections::{BoundingBox, Detections, Embedding, Keypoint, KeypointSet};
pub use display::{DisplaySink, HeadlessDisplay};
pub use encode::{Codec, EncodedFrame, FrameEncoder, JpegEncoder};
pub use error::{DisplayError, EncodeError, InferenceError, SessionError, SourceError};
pub use labels::LabelTable;
pub use session::{ExitReason, Session, SessionSummary};
pub use source::{Frame, FrameSource};

#[cfg(feature = "ffmpeg")]
pub use source::VideoFileSource;

#[cfg(feature = "display")]
pub use display::WindowDisplay;
