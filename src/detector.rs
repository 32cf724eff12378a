//! Board detection pipeline.
//!
//! raw image → rough crop → grayscale, histogram equalization, `[0, 1]`
//! normalization → gradient projection → adaptive threshold search → crop.
//!
//! Every call is a pure function of its input: no shared state, no I/O, and
//! a bounded amount of work. Failure never raises; it yields
//! `success = false` with the working image and its full extent.

use std::path::Path;

use anyhow::Result;
use image::{GrayImage, RgbImage};
use log::{info, warn};
use serde::Serialize;

use crate::capture::load_screenshot;
use crate::config::DetectorConfig;
use crate::crop::{crop_board, fallback, BoardGrid};
use crate::projection::{gradients, normalize, project, Gradients, Projection};
use crate::rough_crop::{rough_crop, RoughCrop};
use crate::threshold::{search_grid_lines, GridLines};
use crate::types::{BoundingBox, DetectionResult};

/// Intermediate artifacts of one detection, for diagnostics only.
#[derive(Clone, Debug)]
pub struct DetectionTrace {
    pub rough_crop: RoughCrop,
    /// Equalized grayscale of the working image.
    pub equalized: GrayImage,
    pub gradients: Gradients,
    pub projection: Projection,
    /// Interior lines in working-image coordinates, when both axes matched.
    pub lines: Option<GridLines>,
    /// Nine boundary lines per axis; empty on failure.
    pub grid: BoardGrid,
}

/// Pixel-free view of a trace, suitable for JSON.
#[derive(Clone, Debug, Serialize)]
pub struct TraceSummary<'a> {
    pub rough_crop: &'a RoughCrop,
    pub working_size: (u32, u32),
    pub projection_x: &'a [f64],
    pub projection_y: &'a [f64],
    pub threshold_level: Option<u32>,
    pub lines_x: &'a [usize],
    pub lines_y: &'a [usize],
    pub grid: &'a BoardGrid,
    pub bbox: BoundingBox,
    pub success: bool,
}

impl DetectionTrace {
    pub fn summary<'a>(&'a self, result: &DetectionResult) -> TraceSummary<'a> {
        let (lines_x, lines_y): (&[usize], &[usize]) = match &self.lines {
            Some(l) => (&l.x.positions, &l.y.positions),
            None => (&[], &[]),
        };
        TraceSummary {
            rough_crop: &self.rough_crop,
            working_size: self.equalized.dimensions(),
            projection_x: &self.projection.x,
            projection_y: &self.projection.y,
            threshold_level: self.lines.as_ref().map(|l| l.level),
            lines_x,
            lines_y,
            grid: &self.grid,
            bbox: result.bbox,
            success: result.success,
        }
    }
}

/// Detects the board and returns the intermediate artifacts alongside.
///
/// Expects a non-empty image. An empty one is not an error: it yields
/// `success = false`, an empty crop and the one-pixel box of
/// [`BoundingBox::full`].
pub fn detect_board_traced(
    image: &RgbImage,
    cfg: &DetectorConfig,
) -> (DetectionResult, DetectionTrace) {
    if image.width() == 0 || image.height() == 0 {
        warn!("empty {}x{} image, nothing to detect", image.width(), image.height());
    }
    let rough = rough_crop(image, &cfg.rough_crop);
    let working = rough.apply(image);
    let offset = rough.offset();

    let gray = image::imageops::grayscale(&working);
    let equalized = imageproc::contrast::equalize_histogram(&gray);
    let grads = gradients(&normalize(&equalized), &cfg.gradient);
    let projection = project(&grads);

    let lines = search_grid_lines(&projection, &cfg.threshold, &cfg.lines);
    let (result, grid) = match &lines {
        Some(found) => crop_board(&working, found, offset),
        None => (fallback(&working, offset), BoardGrid::default()),
    };

    info!(
        "board {}: bbox {} (rough crop found: {}, working {}x{}, level {:?})",
        if result.success { "detected" } else { "not detected" },
        result.bbox,
        rough.found,
        working.width(),
        working.height(),
        lines.as_ref().map(|l| l.level)
    );

    let trace = DetectionTrace {
        rough_crop: rough,
        equalized,
        gradients: grads,
        projection,
        lines,
        grid,
    };
    (result, trace)
}

/// Detects the board in `image`.
pub fn detect_board(image: &RgbImage, cfg: &DetectorConfig) -> DetectionResult {
    detect_board_traced(image, cfg).0
}

/// Loads a screenshot from disk and detects the board in it.
pub fn detect_file(path: &Path, cfg: &DetectorConfig) -> Result<DetectionResult> {
    let image = load_screenshot(path)?;
    Ok(detect_board(&image, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{board_on_canvas, checkerboard, fill_rect, gray_to_rgb};
    use image::Rgb;

    const LINES: [usize; 7] = [50, 100, 150, 200, 250, 300, 350];

    fn near(a: u32, b: u32, tol: u32) -> bool {
        a.abs_diff(b) <= tol
    }

    fn assert_bbox_near(bbox: BoundingBox, expected: (u32, u32, u32, u32), tol: u32) {
        let (y0, y1, x0, x1) = expected;
        assert!(
            near(bbox.y0, y0, tol)
                && near(bbox.y1, y1, tol)
                && near(bbox.x0, x0, tol)
                && near(bbox.x1, x1, tol),
            "bbox {} not within {} of {:?}",
            bbox,
            tol,
            expected
        );
    }

    fn canvas_scene() -> RgbImage {
        board_on_canvas((600, 600), (100, 100), 400, 50, Rgb([255, 255, 255]), 255)
    }

    fn no_rough_crop() -> DetectorConfig {
        let mut cfg = DetectorConfig::default();
        cfg.rough_crop.enabled = false;
        cfg
    }

    #[test]
    fn test_synthetic_400_board_lines_and_extent() {
        let img = gray_to_rgb(&checkerboard(400, 50, 0, 255));
        let (result, trace) = detect_board_traced(&img, &no_rough_crop());
        assert!(result.success);

        let lines = trace.lines.expect("both axes should match");
        for (found, expected) in lines.x.positions.iter().zip(LINES) {
            assert!(found.abs_diff(expected) <= 1, "x {:?}", lines.x);
        }
        for (found, expected) in lines.y.positions.iter().zip(LINES) {
            assert!(found.abs_diff(expected) <= 1, "y {:?}", lines.y);
        }
        assert_eq!(trace.grid.x.len(), 9);
        assert_bbox_near(result.bbox, (0, 400, 0, 400), 2);
    }

    #[test]
    fn test_board_on_canvas_maps_to_original_frame() {
        let img = canvas_scene();
        let (result, trace) = detect_board_traced(&img, &DetectorConfig::default());
        assert!(trace.rough_crop.found);
        assert!(result.success);
        assert_bbox_near(result.bbox, (100, 500, 100, 500), 3);
        assert_eq!(
            result.cropped.dimensions(),
            (result.bbox.width(), result.bbox.height())
        );
    }

    #[test]
    fn test_detection_is_deterministic() {
        let img = canvas_scene();
        let cfg = DetectorConfig::default();
        let a = detect_board(&img, &cfg);
        let b = detect_board(&img, &cfg);
        assert_eq!(a.bbox, b.bbox);
        assert_eq!(a.success, b.success);
        assert_eq!(a.cropped, b.cropped);
    }

    #[test]
    fn test_recrop_fills_the_frame() {
        let cfg = DetectorConfig::default();
        let first = detect_board(&canvas_scene(), &cfg);
        assert!(first.success);

        let (w, h) = first.cropped.dimensions();
        let second = detect_board(&first.cropped, &cfg);
        assert!(second.success);
        assert_bbox_near(second.bbox, (0, h, 0, w), 4);
    }

    #[test]
    fn test_gridless_region_falls_back_with_offset() {
        let mut img = RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]));
        fill_rect(&mut img, (100, 50), (200, 200), Rgb([20, 20, 20]));
        let (result, trace) = detect_board_traced(&img, &DetectorConfig::default());

        assert!(trace.rough_crop.found);
        assert!(!result.success);
        assert!(trace.lines.is_none());
        assert!(trace.grid.x.is_empty());
        let region = trace.rough_crop.region;
        assert_eq!(result.bbox, region);
        assert!(result.bbox.x0 > 0 && result.bbox.y0 > 0);
        assert_eq!(result.cropped.dimensions(), (region.width(), region.height()));
    }

    #[test]
    fn test_uniform_image_returns_input() {
        let img = RgbImage::from_pixel(320, 240, Rgb([40, 120, 200]));
        let result = detect_board(&img, &DetectorConfig::default());
        assert!(!result.success);
        assert_eq!(result.bbox, BoundingBox::full(320, 240));
        assert_eq!(result.cropped, img);
    }

    #[test]
    fn test_empty_image_is_not_detected() {
        for (w, h) in [(0, 0), (0, 40), (40, 0)] {
            let img = RgbImage::new(w, h);
            let (result, trace) = detect_board_traced(&img, &DetectorConfig::default());
            assert!(!result.success);
            assert!(trace.lines.is_none());
            assert_eq!(result.cropped.dimensions(), (w, h));
            assert_eq!(result.bbox, BoundingBox::full(w, h));
        }
        assert_eq!(BoundingBox::full(0, 0), BoundingBox::new(0, 1, 0, 1).unwrap());
    }

    #[test]
    fn test_trace_does_not_change_result() {
        let img = canvas_scene();
        let cfg = DetectorConfig::default();
        let (traced, trace) = detect_board_traced(&img, &cfg);
        let plain = detect_board(&img, &cfg);
        assert_eq!(traced.bbox, plain.bbox);
        assert_eq!(traced.cropped, plain.cropped);

        let json = serde_json::to_string(&trace.summary(&traced)).unwrap();
        assert!(json.contains("\"lines_x\""));
        assert!(json.contains("\"success\":true"));
        assert_eq!(trace.projection.x.len(), trace.equalized.width() as usize);
        assert_eq!(trace.projection.y.len(), trace.equalized.height() as usize);
    }

    #[test]
    fn test_detect_file_reads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenshot.png");
        canvas_scene().save(&path).unwrap();
        let result = detect_file(&path, &DetectorConfig::default()).unwrap();
        assert!(result.success);
        assert_bbox_near(result.bbox, (100, 500, 100, 500), 3);
    }
}
