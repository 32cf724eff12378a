//! Plain data shared by the detection stages.

use image::{ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// Single-channel float image, values normalized to `[0, 1]`.
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Number of interior grid lines per axis of an 8×8 board.
pub const INTERIOR_LINES: usize = 7;

/// Axis-aligned box `(y0, y1, x0, x1)`, half-open on the high side.
///
/// Always non-empty: `y0 < y1` and `x0 < x1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub y0: u32,
    pub y1: u32,
    pub x0: u32,
    pub x1: u32,
}

impl BoundingBox {
    /// Returns `None` for empty or inverted boxes.
    pub fn new(y0: u32, y1: u32, x0: u32, x1: u32) -> Option<Self> {
        (y0 < y1 && x0 < x1).then_some(Self { y0, y1, x0, x1 })
    }

    /// Box covering a whole `width × height` frame.
    ///
    /// Boxes are never empty, so a zero dimension yields a one-pixel extent
    /// on that axis; callers handing in empty images get `(0, 1, 0, 1)`.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            y0: 0,
            y1: height.max(1),
            x0: 0,
            x1: width.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Re-expresses a box given in a sub-image frame in the outer frame whose
    /// top-left corner sits at `offset = (y, x)`.
    pub fn offset_by(self, offset: (u32, u32)) -> Self {
        let (dy, dx) = offset;
        Self {
            y0: self.y0 + dy,
            y1: self.y1 + dy,
            x0: self.x0 + dx,
            x1: self.x1 + dx,
        }
    }

    /// Top-left corner as `(y, x)`.
    pub fn origin(&self) -> (u32, u32) {
        (self.y0, self.x0)
    }

    /// Copies the boxed region out of `image` into a fresh buffer.
    pub fn crop(&self, image: &RgbImage) -> RgbImage {
        image::imageops::crop_imm(image, self.x0, self.y0, self.width(), self.height()).to_image()
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.y0, self.y1, self.x0, self.x1)
    }
}

/// Ascending pixel positions of detected grid lines along one axis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineSet {
    pub positions: Vec<usize>,
}

impl LineSet {
    pub fn new(positions: Vec<usize>) -> Self {
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn first(&self) -> Option<usize> {
        self.positions.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.positions.last().copied()
    }

    /// Consecutive differences; empty for fewer than two lines.
    pub fn diffs(&self) -> Vec<f64> {
        self.positions
            .windows(2)
            .map(|w| w[1] as f64 - w[0] as f64)
            .collect()
    }

    /// Mean spacing between consecutive lines.
    pub fn mean_step(&self) -> Option<f64> {
        let diffs = self.diffs();
        (!diffs.is_empty()).then(|| diffs.iter().sum::<f64>() / diffs.len() as f64)
    }
}

impl From<Vec<usize>> for LineSet {
    fn from(positions: Vec<usize>) -> Self {
        Self::new(positions)
    }
}

/// Outcome of one detection call.
///
/// When `success` is false, `cropped` is the working image handed to the
/// cropper (rough crop or the full input) and `bbox` spans all of it; callers
/// must treat that as "board not found".
#[derive(Clone, Debug)]
pub struct DetectionResult {
    pub cropped: RgbImage,
    /// Box in the original image's coordinate frame.
    pub bbox: BoundingBox,
    pub success: bool,
}
