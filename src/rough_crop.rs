//! Contour-based rough crop.
//!
//! Isolates the board region from surrounding browser chrome, side panels
//! and evaluation bars before fine line detection. One edge map is built
//! (grayscale, Gaussian blur, Canny) and a closed copy of it (morphological
//! closing); three contour strategies are scored against them and the best
//! candidate across all strategies wins.

use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, Contour};
use imageproc::distance_transform::Norm;
use log::{debug, trace};
use serde::Serialize;

use crate::config::RoughCropConfig;
use crate::types::BoundingBox;

/// How contours are extracted from the edge maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ContourStrategy {
    /// Closed edges, outermost contours only.
    ClosedExternal,
    /// Closed edges, every contour including holes (boards inside frames).
    ClosedTree,
    /// Unclosed edges, outermost contours only (dense layouts where closing
    /// merges the board with neighbouring widgets).
    RawExternal,
}

impl ContourStrategy {
    pub const ALL: [ContourStrategy; 3] = [
        ContourStrategy::ClosedExternal,
        ContourStrategy::ClosedTree,
        ContourStrategy::RawExternal,
    ];

    fn contours(self, edges: &EdgeMaps) -> Vec<Contour<i32>> {
        match self {
            ContourStrategy::ClosedExternal => outermost(find_contours::<i32>(&edges.closed)),
            ContourStrategy::ClosedTree => find_contours::<i32>(&edges.closed),
            ContourStrategy::RawExternal => outermost(find_contours::<i32>(&edges.raw)),
        }
    }

    /// Best-scoring eligible rectangle among this strategy's largest contours.
    pub fn best_candidate(self, edges: &EdgeMaps, cfg: &RoughCropConfig) -> Option<Candidate> {
        let mut contours: Vec<(f64, BoundingBox)> = self
            .contours(edges)
            .iter()
            .filter_map(|c| Some((contour_area(c), bounding_rect(c)?)))
            .collect();
        contours.sort_by(|a, b| b.0.total_cmp(&a.0));

        let image_area = edges.raw.width() as f64 * edges.raw.height() as f64;
        let mut best: Option<Candidate> = None;
        for (_, rect) in contours.into_iter().take(cfg.max_contours) {
            let (bw, bh) = (rect.width() as f64, rect.height() as f64);
            if bw * bh < cfg.min_area_frac * image_area {
                continue;
            }
            let aspect = bw / bh;
            if aspect < cfg.min_aspect || aspect > cfg.max_aspect {
                continue;
            }
            let score = score_candidate(rect.width(), rect.height(), image_area, cfg.area_weight);
            trace!("{:?}: rect {} score {:.4}", self, rect, score);
            if best.as_ref().is_none_or(|b| score < b.score) {
                best = Some(Candidate {
                    strategy: self,
                    rect,
                    score,
                });
            }
        }
        best
    }
}

/// A board-shaped rectangle proposed by one strategy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Candidate {
    pub strategy: ContourStrategy,
    /// Unpadded bounding rectangle in input coordinates.
    pub rect: BoundingBox,
    /// Lower is better.
    pub score: f64,
}

/// Edge maps shared by all strategies.
#[derive(Clone, Debug)]
pub struct EdgeMaps {
    pub raw: GrayImage,
    pub closed: GrayImage,
}

impl EdgeMaps {
    pub fn build(image: &RgbImage, cfg: &RoughCropConfig) -> Self {
        let gray = image::imageops::grayscale(image);
        let blurred = imageproc::filter::gaussian_blur_f32(&gray, cfg.blur_sigma);
        let raw = imageproc::edges::canny(&blurred, cfg.canny_low, cfg.canny_high);

        let (w, h) = image.dimensions();
        let side = cfg
            .close_kernel_min
            .max(w.min(h) / cfg.close_kernel_divisor.max(1));
        let radius = (side / 2).clamp(1, u8::MAX as u32) as u8;
        let closed = imageproc::morphology::close(&raw, Norm::LInf, radius);
        Self { raw, closed }
    }
}

/// Outcome of the rough crop.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoughCrop {
    /// Padded and clamped region; the full input when nothing was found.
    pub region: BoundingBox,
    pub found: bool,
    pub winner: Option<Candidate>,
    /// Best candidate of every strategy that produced one.
    pub candidates: Vec<Candidate>,
}

impl RoughCrop {
    fn not_found(width: u32, height: u32, candidates: Vec<Candidate>) -> Self {
        Self {
            region: BoundingBox::full(width, height),
            found: false,
            winner: None,
            candidates,
        }
    }

    /// Top-left corner of the region in input coordinates, `(y, x)`.
    pub fn offset(&self) -> (u32, u32) {
        self.region.origin()
    }

    /// The region as a fresh image; a copy of the input when not found.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        if self.found {
            self.region.crop(image)
        } else {
            image.clone()
        }
    }
}

/// Board-likeness of a `bw × bh` rectangle; lower is better.
///
/// Quadratic penalty on non-square aspect, minus a bonus for covering more
/// of the image.
pub fn score_candidate(bw: u32, bh: u32, image_area: f64, area_weight: f64) -> f64 {
    let aspect = if bh > 0 { bw as f64 / bh as f64 } else { 0.0 };
    let area_frac = (bw as f64 * bh as f64) / image_area;
    (1.0 - aspect).powi(2) - area_weight * area_frac
}

fn outermost(contours: Vec<Contour<i32>>) -> Vec<Contour<i32>> {
    contours.into_iter().filter(|c| c.parent.is_none()).collect()
}

/// Polygon (shoelace) area enclosed by the contour's border points.
fn contour_area(contour: &Contour<i32>) -> f64 {
    let pts = &contour.points;
    if pts.len() < 3 {
        return 0.0;
    }
    let twice: i64 = pts
        .iter()
        .zip(pts.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Inclusive pixel bounds of the contour as a half-open box.
fn bounding_rect(contour: &Contour<i32>) -> Option<BoundingBox> {
    let xs = contour.points.iter().map(|p| p.x);
    let ys = contour.points.iter().map(|p| p.y);
    let (x0, x1) = (xs.clone().min()?, xs.max()?);
    let (y0, y1) = (ys.clone().min()?, ys.max()?);
    BoundingBox::new(
        u32::try_from(y0).ok()?,
        u32::try_from(y1 + 1).ok()?,
        u32::try_from(x0).ok()?,
        u32::try_from(x1 + 1).ok()?,
    )
}

/// Pads `rect` by `padding_frac` of its own size per side, clamped to the image.
fn pad_and_clamp(rect: BoundingBox, padding_frac: f64, width: u32, height: u32) -> BoundingBox {
    let pad_x = (padding_frac * rect.width() as f64) as u32;
    let pad_y = (padding_frac * rect.height() as f64) as u32;
    BoundingBox {
        y0: rect.y0.saturating_sub(pad_y),
        y1: (rect.y1 + pad_y).min(height),
        x0: rect.x0.saturating_sub(pad_x),
        x1: (rect.x1 + pad_x).min(width),
    }
}

/// Finds an approximate board rectangle in `image`.
pub fn rough_crop(image: &RgbImage, cfg: &RoughCropConfig) -> RoughCrop {
    let (w, h) = image.dimensions();
    if !cfg.enabled || w == 0 || h == 0 {
        return RoughCrop::not_found(w, h, Vec::new());
    }

    let edges = EdgeMaps::build(image, cfg);
    let candidates: Vec<Candidate> = ContourStrategy::ALL
        .iter()
        .filter_map(|s| s.best_candidate(&edges, cfg))
        .collect();

    // First strategy wins ties.
    let winner = candidates
        .iter()
        .copied()
        .reduce(|best, c| if c.score < best.score { c } else { best });

    let Some(winner) = winner else {
        debug!("rough crop: no board-shaped contour in {}x{} image", w, h);
        return RoughCrop::not_found(w, h, candidates);
    };

    let region = pad_and_clamp(winner.rect, cfg.padding_frac, w, h);
    debug!(
        "rough crop: {:?} rect {} (score {:.4}) -> region {}",
        winner.strategy, winner.rect, winner.score, region
    );
    RoughCrop {
        region,
        found: true,
        winner: Some(winner),
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{board_on_canvas, fill_rect};
    use image::Rgb;

    fn close_to(a: u32, b: u32, tol: u32) -> bool {
        a.abs_diff(b) <= tol
    }

    #[test]
    fn test_score_prefers_square_then_larger() {
        let area = 1000.0 * 1000.0;
        let square = score_candidate(400, 400, area, 0.5);
        let oblong = score_candidate(600, 400, area, 0.5);
        let small_square = score_candidate(200, 200, area, 0.5);
        assert!(square < oblong);
        assert!(square < small_square);
        assert_eq!(score_candidate(10, 0, area, 0.5), 1.0);
    }

    #[test]
    fn test_pad_and_clamp() {
        let rect = BoundingBox::new(5, 205, 100, 300).unwrap();
        let padded = pad_and_clamp(rect, 0.02, 302, 400);
        assert_eq!(padded, BoundingBox::new(1, 209, 96, 302).unwrap());
    }

    #[test]
    fn test_finds_board_on_plain_canvas() {
        let img = board_on_canvas((420, 300), (40, 50), 200, 25, Rgb([128, 128, 128]), 255);
        let crop = rough_crop(&img, &RoughCropConfig::default());
        assert!(crop.found);
        let rect = crop.winner.unwrap().rect;
        assert!(close_to(rect.x0, 40, 2) && close_to(rect.x1, 240, 2), "rect {}", rect);
        assert!(close_to(rect.y0, 50, 2) && close_to(rect.y1, 250, 2), "rect {}", rect);
        // Padding is 2% of ~200 px per side.
        assert!(close_to(crop.region.x0, 36, 2) && close_to(crop.region.x1, 244, 2));
        assert_eq!(crop.offset(), (crop.region.y0, crop.region.x0));
        let region = crop.apply(&img);
        assert_eq!(region.dimensions(), (crop.region.width(), crop.region.height()));
    }

    #[test]
    fn test_uniform_image_is_not_found() {
        let img = RgbImage::from_pixel(200, 150, Rgb([90, 90, 90]));
        let crop = rough_crop(&img, &RoughCropConfig::default());
        assert!(!crop.found);
        assert!(crop.candidates.is_empty());
        assert_eq!(crop.region, BoundingBox::full(200, 150));
        assert_eq!(crop.offset(), (0, 0));
        assert_eq!(crop.apply(&img), img);
    }

    #[test]
    fn test_small_and_elongated_shapes_are_rejected() {
        let mut img = RgbImage::from_pixel(400, 400, Rgb([255, 255, 255]));
        // 30x30 square: under 5% of the area.
        fill_rect(&mut img, (20, 20), (30, 30), Rgb([0, 0, 0]));
        // 300x40 bar: aspect 7.5.
        fill_rect(&mut img, (50, 300), (300, 40), Rgb([0, 0, 0]));
        let crop = rough_crop(&img, &RoughCropConfig::default());
        assert!(!crop.found);
        assert_eq!(crop.region, BoundingBox::full(400, 400));
    }

    #[test]
    fn test_disabled_returns_full_image() {
        let img = board_on_canvas((420, 300), (40, 50), 200, 25, Rgb([128, 128, 128]), 255);
        let cfg = RoughCropConfig {
            enabled: false,
            ..RoughCropConfig::default()
        };
        let crop = rough_crop(&img, &cfg);
        assert!(!crop.found);
        assert_eq!(crop.region, BoundingBox::full(420, 300));
    }

    #[test]
    fn test_raw_edges_recover_board_merged_by_closing() {
        // A black side panel 6 px right of the board: closing bridges the gap,
        // so both closed strategies see a 326 px wide blob.
        let mut img = board_on_canvas((420, 300), (40, 50), 200, 25, Rgb([128, 128, 128]), 255);
        fill_rect(&mut img, (246, 50), (120, 200), Rgb([0, 0, 0]));
        let crop = rough_crop(&img, &RoughCropConfig::default());
        assert!(crop.found);

        let merged = crop
            .candidates
            .iter()
            .find(|c| c.strategy == ContourStrategy::ClosedExternal)
            .expect("closed strategy should propose the merged blob");
        assert!(merged.rect.width() > 300, "merged rect {}", merged.rect);

        let winner = crop.winner.unwrap();
        assert_eq!(winner.strategy, ContourStrategy::RawExternal);
        assert!(close_to(winner.rect.x0, 40, 2) && close_to(winner.rect.x1, 240, 2));
        assert!(close_to(winner.rect.y0, 50, 2) && close_to(winner.rect.y1, 250, 2));
        assert!(crop.region.x1 < 246);
    }
}
