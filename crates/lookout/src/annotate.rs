//! Overlay rendering with identity-stable colors.
//!
//! [`ColorMap`] is the only state that survives across frames: the first
//! time a track identity is seen it gets a random color, and that color is
//! immutable for the rest of the session. [`Annotator`] draws box outlines,
//! a filled label background, and the label text onto the frame in place.

use std::collections::HashMap;

use ab_glyph::{FontVec, PxScale};
use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detections::BoundingBox;
use crate::labels::LabelTable;
use crate::source::Frame;

/// Box outline stroke width in pixels.
pub const STROKE_WIDTH: u32 = 2;

/// Label text height in pixels. Matches the reference rendering, which
/// draws at 0.7 of a 32 px base size.
pub const LABEL_TEXT_SCALE: f32 = 22.4;

/// Horizontal/vertical padding of the label background.
const LABEL_PADDING: i32 = 10;

/// Inset of the label text from the background's top-left corner.
const LABEL_INSET: i32 = 5;

/// Session-scoped identity→color assignment.
///
/// Entries are added lazily on first sight of an identity and never
/// removed; if the upstream detector recycles identities, the old color
/// sticks for the rest of the session.
#[derive(Debug)]
pub struct ColorMap {
    colors: HashMap<i64, [u8; 3]>,
    rng: StdRng,
}

impl ColorMap {
    /// Entropy-seeded map for normal sessions.
    pub fn new() -> Self {
        Self {
            colors: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic map for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            colors: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Color for an identity, assigning a fresh one on first sight.
    /// Each channel is drawn independently and uniformly from [0, 255].
    pub fn color_for(&mut self, identity: i64) -> [u8; 3] {
        if let Some(color) = self.colors.get(&identity) {
            return *color;
        }
        let color = [
            self.rng.gen_range(0..=255u8),
            self.rng.gen_range(0..=255u8),
            self.rng.gen_range(0..=255u8),
        ];
        self.colors.insert(identity, color);
        color
    }

    /// Color already assigned to an identity, if any.
    pub fn get(&self, identity: i64) -> Option<[u8; 3]> {
        self.colors.get(&identity).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Placement of a label background and its text for one box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
    /// Background rectangle, inclusive corners
    pub bg_top_left: (i32, i32),
    pub bg_bottom_right: (i32, i32),
    /// Top-left of the rendered text
    pub text_pos: (i32, i32),
}

/// Computes label geometry for a box at `(xmin, ymin)` given the measured
/// text extent.
///
/// The background sits immediately above the box's top edge and is NOT
/// clamped to the frame: for boxes near the top edge the coordinates go
/// negative and the drawing layer clips the off-frame part.
pub fn label_layout(xmin: i32, ymin: i32, text_w: i32, text_h: i32) -> LabelLayout {
    LabelLayout {
        bg_top_left: (xmin, ymin - text_h - LABEL_PADDING),
        bg_bottom_right: (xmin + text_w + LABEL_PADDING, ymin),
        text_pos: (xmin + LABEL_INSET, ymin - text_h - LABEL_INSET),
    }
}

/// Builds the overlay label for a box: class name when the table covers
/// the class, raw numeric identity otherwise.
pub fn label_text(b: &BoundingBox, labels: &LabelTable) -> String {
    match labels.get(b.class_id) {
        Some(name) => format!("{}: ID {}, Conf: {:.2}", name, b.identity, b.confidence),
        None => format!("{}: ID {}, Conf: {:.2}", b.identity, b.identity, b.confidence),
    }
}

/// Draws detection overlays onto frames.
///
/// The font is optional so headless and test configurations can run
/// without a font file on disk; without one, only box outlines are drawn.
pub struct Annotator {
    font: Option<FontVec>,
    labels: LabelTable,
    scale: PxScale,
}

impl Annotator {
    pub fn new(font: Option<FontVec>, labels: LabelTable) -> Self {
        Self {
            font,
            labels,
            scale: PxScale::from(LABEL_TEXT_SCALE),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Renders `boxes` onto `frame` in input order, assigning colors for
    /// unseen identities through `colors`.
    pub fn render(&self, frame: &mut Frame, boxes: &[BoundingBox], colors: &mut ColorMap) {
        for b in boxes {
            let color = Rgb(colors.color_for(b.identity));
            let image = frame.image_mut();

            let x = b.xmin as i32;
            let y = b.ymin as i32;
            let w = b.width as u32;
            let h = b.height as u32;

            // Outline with a fixed stroke width, drawn as nested 1px rects
            for inset in 0..STROKE_WIDTH {
                let (rw, rh) = (w.saturating_sub(inset * 2), h.saturating_sub(inset * 2));
                if rw == 0 || rh == 0 {
                    break;
                }
                draw_hollow_rect_mut(
                    image,
                    Rect::at(x + inset as i32, y + inset as i32).of_size(rw, rh),
                    color,
                );
            }

            let Some(font) = &self.font else { continue };

            let text = label_text(b, &self.labels);
            let (text_w, text_h) = text_size(self.scale, font, &text);
            let layout = label_layout(x, y, text_w as i32, text_h as i32);

            let bg_w = (layout.bg_bottom_right.0 - layout.bg_top_left.0) as u32;
            let bg_h = (layout.bg_bottom_right.1 - layout.bg_top_left.1) as u32;
            if bg_w > 0 && bg_h > 0 {
                draw_filled_rect_mut(
                    image,
                    Rect::at(layout.bg_top_left.0, layout.bg_top_left.1).of_size(bg_w, bg_h),
                    color,
                );
            }

            draw_text_mut(
                image,
                Rgb([255u8, 255, 255]),
                layout.text_pos.0,
                layout.text_pos.1,
                self.scale,
                font,
                &text,
            );
        }
    }
}
