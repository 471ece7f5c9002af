//! Typed detection results.
//!
//! The wire types in `lookout-proto` are normalized into these domain
//! structs before anything downstream touches them. Presence of the
//! optional embedding group is explicit (`Option`); empty-but-present
//! sequences for boxes/keypoints/masks mean "zero detections" and are
//! distinct from an absent group.

use lookout_proto as proto;

/// Classification embedding attached to a result, when the model
/// produces one.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub data: Vec<f32>,
    pub shape: Vec<i32>,
}

/// Axis-aligned detection box in frame-pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub width: f32,
    pub height: f32,
    /// Track identity; the join key for stable overlay coloring
    pub identity: i64,
    pub confidence: f32,
    pub class_id: i32,
}

/// One 2D keypoint with confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// Ordered keypoints for one detected instance (e.g. a pose skeleton).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeypointSet {
    pub points: Vec<Keypoint>,
}

/// Decoded per-frame detection result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detections {
    /// Absent unless the model produced an embedding for this frame
    pub embedding: Option<Embedding>,
    pub boxes: Vec<BoundingBox>,
    pub keypoints: Vec<KeypointSet>,
    /// Opaque per-instance segmentation blobs, not interpreted here
    pub masks: Vec<Vec<u8>>,
}

impl Detections {
    /// Normalizes a raw wire result.
    pub fn from_proto(raw: proto::DetectionResult) -> Self {
        Self {
            embedding: raw.embedding.map(|e| Embedding {
                data: e.data,
                shape: e.shape,
            }),
            boxes: raw
                .boxes
                .into_iter()
                .map(|b| BoundingBox {
                    xmin: b.xmin,
                    ymin: b.ymin,
                    width: b.width,
                    height: b.height,
                    identity: b.identity,
                    confidence: b.confidence,
                    class_id: b.class_id,
                })
                .collect(),
            keypoints: raw
                .keypoints
                .into_iter()
                .map(|set| KeypointSet {
                    points: set
                        .points
                        .into_iter()
                        .map(|p| Keypoint {
                            x: p.x,
                            y: p.y,
                            confidence: p.confidence,
                        })
                        .collect(),
                })
                .collect(),
            masks: raw.masks,
        }
    }

    /// Exact inverse of [`Detections::from_proto`].
    pub fn to_proto(&self) -> proto::DetectionResult {
        proto::DetectionResult {
            embedding: self.embedding.as_ref().map(|e| proto::Embedding {
                data: e.data.clone(),
                shape: e.shape.clone(),
            }),
            boxes: self
                .boxes
                .iter()
                .map(|b| proto::BoundingBox {
                    xmin: b.xmin,
                    ymin: b.ymin,
                    width: b.width,
                    height: b.height,
                    identity: b.identity,
                    confidence: b.confidence,
                    class_id: b.class_id,
                })
                .collect(),
            keypoints: self
                .keypoints
                .iter()
                .map(|set| proto::KeypointSet {
                    points: set
                        .points
                        .iter()
                        .map(|p| proto::Keypoint {
                            x: p.x,
                            y: p.y,
                            confidence: p.confidence,
                        })
                        .collect(),
                })
                .collect(),
            masks: self.masks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_proto_result() -> proto::DetectionResult {
        proto::DetectionResult {
            embedding: Some(proto::Embedding {
                data: vec![0.1, 0.7, 0.2],
                shape: vec![1, 3],
            }),
            boxes: vec![proto::BoundingBox {
                xmin: 10.0,
                ymin: 10.0,
                width: 50.0,
                height: 50.0,
                identity: 7,
                confidence: 0.92,
                class_id: 2,
            }],
            keypoints: vec![proto::KeypointSet {
                points: vec![proto::Keypoint {
                    x: 12.5,
                    y: 40.0,
                    confidence: 0.88,
                }],
            }],
            masks: vec![vec![1, 2, 3, 4]],
        }
    }

    #[test]
    fn test_decode_fidelity_all_groups_present() {
        let raw = full_proto_result();
        let decoded = Detections::from_proto(raw.clone());
        assert_eq!(decoded.to_proto(), raw);
    }

    #[test]
    fn test_absent_embedding_is_none() {
        let mut raw = full_proto_result();
        raw.embedding = None;
        let decoded = Detections::from_proto(raw);
        assert!(decoded.embedding.is_none());
        // The other groups are unaffected
        assert_eq!(decoded.boxes.len(), 1);
    }

    #[test]
    fn test_empty_groups_are_present_but_zero() {
        let decoded = Detections::from_proto(proto::DetectionResult::default());
        assert!(decoded.embedding.is_none());
        assert!(decoded.boxes.is_empty());
        assert!(decoded.keypoints.is_empty());
        assert!(decoded.masks.is_empty());
    }
}
