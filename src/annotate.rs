//! Bounding-box overlay for user feedback.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::types::BoundingBox;

pub const DEFAULT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const DEFAULT_THICKNESS: u32 = 3;

/// Returns a copy of `image` with `bbox` outlined; the input is untouched.
///
/// The outline grows inward from the box edge, `thickness` pixels wide, so
/// every painted pixel lies inside `bbox` and a full-frame box stays fully
/// visible.
pub fn draw_bbox(image: &RgbImage, bbox: BoundingBox, color: Rgb<u8>, thickness: u32) -> RgbImage {
    let mut annotated = image.clone();
    for inset in 0..thickness {
        let w = bbox.width().saturating_sub(2 * inset);
        let h = bbox.height().saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((bbox.x0 + inset) as i32, (bbox.y0 + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut annotated, rect, color);
    }
    annotated
}
