//! Generated wire types for the lookout detector service.
//!
//! The `.proto` source lives in `proto/detection.proto` and is compiled at
//! build time by tonic-build. Both the `Detector` client (used by the
//! lookout binary) and server stubs (used by integration tests) are
//! generated.

#![allow(clippy::derive_partial_eq_without_eq)]

tonic::include_proto!("lookout.detection");
