//! Final board crop from the interior grid lines.

use image::RgbImage;
use log::debug;
use serde::Serialize;

use crate::threshold::GridLines;
use crate::types::{BoundingBox, DetectionResult, LineSet};

/// The nine boundary lines per axis: seven detected, two extrapolated.
///
/// Outer lines may fall outside the working image; the crop clamps them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BoardGrid {
    pub x: Vec<i64>,
    pub y: Vec<i64>,
}

/// Rounded mean spacing of a line set (ties to even).
fn step(lines: &LineSet) -> Option<i64> {
    lines.mean_step().map(|s| s.round_ties_even() as i64)
}

/// Adds one step before the first and after the last line.
fn extend(lines: &LineSet) -> Option<Vec<i64>> {
    let step = step(lines)?;
    let first = lines.first()? as i64;
    let last = lines.last()? as i64;
    let mut all = Vec::with_capacity(lines.len() + 2);
    all.push(first - step);
    all.extend(lines.positions.iter().map(|&p| p as i64));
    all.push(last + step);
    Some(all)
}

impl BoardGrid {
    pub fn from_lines(lines: &GridLines) -> Option<Self> {
        Some(Self {
            x: extend(&lines.x)?,
            y: extend(&lines.y)?,
        })
    }

    /// Outer extent of the grid clamped to a `width × height` image.
    pub fn extent(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let clamp = |v: i64, hi: u32| v.clamp(0, hi as i64) as u32;
        BoundingBox::new(
            clamp(*self.y.first()?, height),
            clamp(*self.y.last()?, height),
            clamp(*self.x.first()?, width),
            clamp(*self.x.last()?, width),
        )
    }
}

/// Result for a working image where no board was found.
pub fn fallback(working: &RgbImage, offset: (u32, u32)) -> DetectionResult {
    let (w, h) = working.dimensions();
    DetectionResult {
        cropped: working.clone(),
        bbox: BoundingBox::full(w, h).offset_by(offset),
        success: false,
    }
}

/// Crops `working` to the full board and maps the box into the original
/// frame using the rough-crop `offset` (`(y, x)`).
pub fn crop_board(
    working: &RgbImage,
    lines: &GridLines,
    offset: (u32, u32),
) -> (DetectionResult, BoardGrid) {
    let (w, h) = working.dimensions();
    let Some(grid) = BoardGrid::from_lines(lines) else {
        return (fallback(working, offset), BoardGrid::default());
    };
    let Some(local) = grid.extent(w, h) else {
        debug!("grid extent collapsed after clamping to {}x{}", w, h);
        return (fallback(working, offset), grid);
    };

    let result = DetectionResult {
        cropped: local.crop(working),
        bbox: local.offset_by(offset),
        success: true,
    };
    (result, grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn grid_lines(x: Vec<usize>, y: Vec<usize>) -> GridLines {
        GridLines {
            level: 1,
            x: LineSet::new(x),
            y: LineSet::new(y),
        }
    }

    #[test]
    fn test_extends_by_mean_step() {
        let lines = grid_lines(
            vec![50, 100, 150, 200, 250, 300, 350],
            vec![40, 81, 120, 161, 200, 241, 280],
        );
        let grid = BoardGrid::from_lines(&lines).unwrap();
        assert_eq!(grid.x.first(), Some(&0));
        assert_eq!(grid.x.last(), Some(&400));
        assert_eq!(grid.x.len(), 9);
        // Mean y step is 40.
        assert_eq!(grid.y, vec![0, 40, 81, 120, 161, 200, 241, 280, 320]);
    }

    #[test]
    fn test_crop_board_clamps_and_offsets() {
        let working = RgbImage::from_fn(380, 330, |x, y| Rgb([x as u8, y as u8, 0]));
        let lines = grid_lines(
            vec![50, 100, 150, 200, 250, 300, 350],
            vec![20, 60, 100, 140, 180, 220, 260],
        );
        let (result, grid) = crop_board(&working, &lines, (7, 11));
        assert!(result.success);
        // x runs 0..400 before clamping, y runs -20..300.
        assert_eq!(grid.y[0], -20);
        assert_eq!(result.bbox, BoundingBox::new(7, 307, 11, 391).unwrap());
        assert_eq!(result.cropped.dimensions(), (380, 300));
        assert_eq!(result.cropped.get_pixel(5, 3).0, [5, 3, 0]);
    }

    #[test]
    fn test_fallback_spans_working_image() {
        let working = RgbImage::new(120, 90);
        let result = fallback(&working, (15, 30));
        assert!(!result.success);
        assert_eq!(result.bbox, BoundingBox::new(15, 105, 30, 150).unwrap());
        assert_eq!(result.cropped.dimensions(), (120, 90));
    }

    #[test]
    fn test_empty_lines_fall_back() {
        let working = RgbImage::new(64, 64);
        let (result, grid) = crop_board(&working, &grid_lines(vec![], vec![]), (0, 0));
        assert!(!result.success);
        assert!(grid.x.is_empty());
        assert_eq!(result.bbox, BoundingBox::full(64, 64));
    }
}
