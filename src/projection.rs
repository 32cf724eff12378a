//! Directional gradient projection.
//!
//! - Large separable derivative filter (binomial smoothing × binomial
//!   difference, reflect-101 borders), so the response follows board-scale
//!   structure rather than piece outlines.
//! - Each gradient is split into its positive and negative parts and summed
//!   along the orthogonal axis; the product of the two sums peaks only where
//!   both transition directions stack up, i.e. on grid lines.
//!
//! The passes are written out here because `imageproc::filter` pads with
//! clamped edges, while the projection relies on reflect-101 borders to keep
//! the first and last columns free of spurious transitions.
//!
//! Complexity: O(W·H·K) for kernel size K; two float buffers per gradient.

use image::{GrayImage, Luma};

use crate::config::GradientConfig;
use crate::types::FloatImage;

/// Horizontal and vertical derivatives of a normalized image.
#[derive(Clone, Debug)]
pub struct Gradients {
    /// Derivative along x (responds to vertical lines).
    pub gx: FloatImage,
    /// Derivative along y (responds to horizontal lines).
    pub gy: FloatImage,
}

/// One score per column (`x`) and per row (`y`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Maps `u8` intensities onto `[0, 1]`.
pub fn normalize(gray: &GrayImage) -> FloatImage {
    let (w, h) = gray.dimensions();
    FloatImage::from_fn(w, h, |x, y| Luma([gray.get_pixel(x, y)[0] as f32 / 255.0]))
}

/// Row `n` of Pascal's triangle.
fn binomial_row(n: usize) -> Vec<f64> {
    let mut row = vec![1.0f64];
    for _ in 0..n {
        let mut next = vec![1.0; row.len() + 1];
        for i in 1..row.len() {
            next[i] = row[i - 1] + row[i];
        }
        row = next;
    }
    row
}

/// Smoothing and derivative taps of a `size`-tap Sobel-style filter.
///
/// The smoothing kernel sums to one and the derivative kernel's positive half
/// sums to one; both have `size` taps, the derivative being antisymmetric.
pub fn sobel_kernels(size: usize) -> (Vec<f64>, Vec<f64>) {
    let size = size.max(3) | 1;
    let smooth = binomial_row(size - 1);
    let base = binomial_row(size - 2);
    let deriv: Vec<f64> = (0..size)
        .map(|k| {
            let left = if k > 0 { base[k - 1] } else { 0.0 };
            let right = base.get(k).copied().unwrap_or(0.0);
            left - right
        })
        .collect();

    let smooth_sum: f64 = smooth.iter().sum();
    let deriv_sum: f64 = deriv.iter().filter(|&&v| v > 0.0).sum();
    (
        smooth.into_iter().map(|v| v / smooth_sum).collect(),
        deriv.into_iter().map(|v| v / deriv_sum).collect(),
    )
}

/// Reflect-101 index into `0..n` (`dcb|abcd|cba`).
#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let last = n as isize - 1;
    let mut i = i;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}

/// Symmetric 1D filter along rows (`along_x`) or columns.
fn smooth_axis(src: &[f32], w: usize, h: usize, kernel: &[f64], along_x: bool) -> Vec<f32> {
    let r = kernel.len() / 2;
    let (len, lines) = if along_x { (w, h) } else { (h, w) };
    let idx = |line: usize, pos: usize| if along_x { line * w + pos } else { pos * w + line };
    let mut out = vec![0.0f32; w * h];
    for line in 0..lines {
        for pos in 0..len {
            let mut acc = kernel[r] * src[idx(line, pos)] as f64;
            for k in 1..=r {
                let a = reflect101(pos as isize + k as isize, len);
                let b = reflect101(pos as isize - k as isize, len);
                acc += kernel[r + k] * (src[idx(line, a)] as f64 + src[idx(line, b)] as f64);
            }
            out[idx(line, pos)] = acc as f32;
        }
    }
    out
}

/// Antisymmetric 1D filter along rows (`along_x`) or columns.
///
/// Taps are applied to `p[x + k] - p[x - k]`, so flat regions give exactly 0.
fn derive_axis(src: &[f32], w: usize, h: usize, kernel: &[f64], along_x: bool) -> Vec<f32> {
    let r = kernel.len() / 2;
    let (len, lines) = if along_x { (w, h) } else { (h, w) };
    let idx = |line: usize, pos: usize| if along_x { line * w + pos } else { pos * w + line };
    let mut out = vec![0.0f32; w * h];
    for line in 0..lines {
        for pos in 0..len {
            let mut acc = 0.0f64;
            for k in 1..=r {
                let a = reflect101(pos as isize + k as isize, len);
                let b = reflect101(pos as isize - k as isize, len);
                acc += kernel[r + k] * (src[idx(line, a)] as f64 - src[idx(line, b)] as f64);
            }
            out[idx(line, pos)] = acc as f32;
        }
    }
    out
}

/// Computes both derivatives with a `cfg.kernel_size` filter.
pub fn gradients(image: &FloatImage, cfg: &GradientConfig) -> Gradients {
    let (w, h) = image.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    if wu == 0 || hu == 0 {
        return Gradients {
            gx: FloatImage::new(w, h),
            gy: FloatImage::new(w, h),
        };
    }
    let (smooth, deriv) = sobel_kernels(cfg.kernel_size);
    let src = image.as_raw();

    let gx = derive_axis(&smooth_axis(src, wu, hu, &smooth, false), wu, hu, &deriv, true);
    let gy = derive_axis(&smooth_axis(src, wu, hu, &smooth, true), wu, hu, &deriv, false);

    Gradients {
        gx: FloatImage::from_raw(w, h, gx).unwrap_or_else(|| FloatImage::new(w, h)),
        gy: FloatImage::from_raw(w, h, gy).unwrap_or_else(|| FloatImage::new(w, h)),
    }
}

/// Reduces gradients to the per-column and per-row line scores.
///
/// `x[c] = Σpos(gx[.., c]) · Σneg(gx[.., c]) / h²`, symmetric for `y`.
pub fn project(grad: &Gradients) -> Projection {
    let (w, h) = grad.gx.dimensions();
    let (wu, hu) = (w as usize, h as usize);

    let mut col_pos = vec![0.0f64; wu];
    let mut col_neg = vec![0.0f64; wu];
    for (i, &v) in grad.gx.as_raw().iter().enumerate() {
        let v = v as f64;
        col_pos[i % wu] += v.max(0.0);
        col_neg[i % wu] += (-v).max(0.0);
    }

    let mut row_pos = vec![0.0f64; hu];
    let mut row_neg = vec![0.0f64; hu];
    for (i, &v) in grad.gy.as_raw().iter().enumerate() {
        let v = v as f64;
        row_pos[i / wu] += v.max(0.0);
        row_neg[i / wu] += (-v).max(0.0);
    }

    let h2 = (h as f64) * (h as f64);
    let w2 = (w as f64) * (w as f64);
    Projection {
        x: col_pos.iter().zip(&col_neg).map(|(p, n)| p * n / h2).collect(),
        y: row_pos.iter().zip(&row_neg).map(|(p, n)| p * n / w2).collect(),
    }
}

/// Largest score of a signal, `0.0` when empty.
pub fn signal_max(signal: &[f64]) -> f64 {
    signal.iter().copied().fold(0.0, f64::max)
}
