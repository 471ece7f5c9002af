//! Class-name lookup table for overlay labels.
//!
//! Accepts either a newline-separated list or a JSON string array, and
//! falls back to the COCO-80 names when no table is supplied.

use std::path::Path;

/// Maps numeric class IDs to human-readable names.
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Table with the built-in COCO class names.
    pub fn coco() -> Self {
        Self {
            labels: default_coco_labels(),
        }
    }

    /// Empty table; every lookup misses and labels fall back to the raw
    /// numeric identity.
    pub fn empty() -> Self {
        Self { labels: Vec::new() }
    }

    /// Parse from a string (newline-separated or JSON array).
    pub fn parse(labels_str: &str) -> Self {
        Self {
            labels: parse_labels(labels_str),
        }
    }

    /// Load from a file.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    /// Name for a class ID, if the table covers it.
    pub fn get(&self, class_id: i32) -> Option<&str> {
        usize::try_from(class_id)
            .ok()
            .and_then(|i| self.labels.get(i))
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::coco()
    }
}

/// Parse labels from string (newline-separated or JSON array)
fn parse_labels(labels_str: &str) -> Vec<String> {
    let trimmed = labels_str.trim();

    // Try JSON array first
    if trimmed.starts_with('[') {
        if let Ok(labels) = serde_json::from_str::<Vec<String>>(trimmed) {
            return labels;
        }
    }

    // Fall back to newline-separated
    trimmed.lines().map(|s| s.trim().to_string()).collect()
}

/// Default COCO class labels
fn default_coco_labels() -> Vec<String> {
    vec![
        "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
        "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
        "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
        "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
        "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
        "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
        "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
        "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
        "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
        "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
        "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
        "toothbrush",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_newline_and_json() {
        let newline = "person\ncar\nbike";
        assert_eq!(LabelTable::parse(newline).get(1), Some("car"));

        let json = r#"["person", "car", "bike"]"#;
        assert_eq!(LabelTable::parse(json).get(2), Some("bike"));
    }

    #[test]
    fn test_out_of_range_lookup_misses() {
        let table = LabelTable::parse("person\ncar");
        assert_eq!(table.get(5), None);
        assert_eq!(table.get(-1), None);
    }

    #[test]
    fn test_coco_defaults() {
        let table = LabelTable::coco();
        assert_eq!(table.len(), 80);
        assert_eq!(table.get(0), Some("person"));
        assert_eq!(table.get(2), Some("car"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cat\ndog").unwrap();
        let table = LabelTable::from_file(file.path()).unwrap();
        assert_eq!(table.get(1), Some("dog"));
    }
}
