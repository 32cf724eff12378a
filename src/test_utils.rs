//! Synthetic screenshots for unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Square `size × size` checkerboard of `square`-pixel cells; the top-left
/// cell is `light`.
pub(crate) fn checkerboard(size: u32, square: u32, dark: u8, light: u8) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        let v = if ((x / square) + (y / square)) % 2 == 0 {
            light
        } else {
            dark
        };
        Luma([v])
    })
}

pub(crate) fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

/// Paints a solid `size = (w, h)` rectangle with its top-left at `origin = (x, y)`.
pub(crate) fn fill_rect(img: &mut RgbImage, origin: (u32, u32), size: (u32, u32), color: Rgb<u8>) {
    for y in origin.1..(origin.1 + size.1).min(img.height()) {
        for x in origin.0..(origin.0 + size.0).min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

/// A board with black dark squares and `light` light squares, drawn at
/// `origin = (x, y)` on a uniform canvas of `canvas = (w, h)`.
pub(crate) fn board_on_canvas(
    canvas: (u32, u32),
    origin: (u32, u32),
    size: u32,
    square: u32,
    light: Rgb<u8>,
    background: u8,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(canvas.0, canvas.1, Rgb([background; 3]));
    for y in 0..size {
        for x in 0..size {
            let color = if ((x / square) + (y / square)) % 2 == 0 {
                light
            } else {
                Rgb([0, 0, 0])
            };
            img.put_pixel(origin.0 + x, origin.1 + y, color);
        }
    }
    img
}
