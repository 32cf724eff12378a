//! Grid-line extraction from a 1D projection signal.
//!
//! A signal is binarized at a threshold, smoothed with a Gaussian window so
//! neighbouring hits merge into one hump, and reduced to strict local maxima.
//! The surviving peak positions are then pruned to the run of seven equally
//! spaced interior lines, with a single missing line interpolated when the
//! run has exactly one doubled gap.

use log::trace;

use crate::config::LineConfig;
use crate::types::{LineSet, INTERIOR_LINES};

/// Consistent diffs that must follow the reference diff of a run.
const CONSISTENT_DIFFS: usize = INTERIOR_LINES - 2;

/// Lines found on one axis at one threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLines {
    pub lines: LineSet,
    pub matched: bool,
}

/// Normalized Gaussian window of odd length `size`.
pub fn gaussian_window(size: usize, sigma: f64) -> Vec<f64> {
    let center = (size / 2) as f64;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}

/// `1.0` where the signal exceeds `threshold`, else `0.0`.
pub fn binarize(signal: &[f64], threshold: f64) -> Vec<f64> {
    signal
        .iter()
        .map(|&v| if v > threshold { 1.0 } else { 0.0 })
        .collect()
}

/// Centered convolution with zero padding; output length equals the input.
pub fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len() as isize;
    let half = (kernel.len() / 2) as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    let j = i + half - k as isize;
                    (0..n).contains(&j).then(|| signal[j as usize] * w)
                })
                .sum()
        })
        .collect()
}

/// 1D non-maximum suppression: only strict local maxima stay nonzero.
pub fn skeletonize(signal: &[f64]) -> Vec<f64> {
    let mut out = signal.to_vec();
    let n = out.len();
    for i in 0..n.saturating_sub(1) {
        if out[i] <= out[i + 1] {
            out[i] = 0.0;
        }
    }
    for i in (1..n).rev() {
        if out[i - 1] > out[i] {
            out[i] = 0.0;
        }
    }
    out
}

/// Indices of the nonzero samples of a skeletonized signal.
pub fn peak_positions(signal: &[f64], threshold: f64, cfg: &LineConfig) -> Vec<usize> {
    let window = gaussian_window(cfg.smoothing_window, cfg.smoothing_sigma);
    let smoothed = convolve_same(&binarize(signal, threshold), &window);
    skeletonize(&smoothed)
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > 0.0)
        .map(|(i, _)| i)
        .collect()
}

fn within_margin(lines: &[usize], dim: usize, margin: usize) -> Vec<usize> {
    lines
        .iter()
        .copied()
        .filter(|&x| x > margin && x + margin < dim)
        .collect()
}

/// Tolerance around a reference step; the empty reference uses the floor.
fn spacing_tolerance(reference: f64, cfg: &LineConfig) -> f64 {
    if reference > 0.0 {
        cfg.min_tolerance.max(reference * cfg.tolerance_frac)
    } else {
        cfg.min_tolerance
    }
}

/// Whether the trailing run of diffs has enough equally spaced entries.
///
/// The reference step is the first diff of the current run and is replaced
/// by whichever diff breaks the tolerance.
pub fn check_match(lines: &[usize], cfg: &LineConfig) -> bool {
    if lines.len() < INTERIOR_LINES {
        return false;
    }
    let mut reference = 0.0;
    let mut count = 0;
    for w in lines.windows(2) {
        let diff = (w[1] - w[0]) as f64;
        if (diff - reference).abs() < spacing_tolerance(reference, cfg) {
            count += 1;
        } else {
            count = 0;
            reference = diff;
        }
    }
    count >= CONSISTENT_DIFFS
}

/// Drops margin peaks and returns the first run of seven equally spaced
/// lines, or everything that survived the margin filter when no run exists.
pub fn prune_lines(lines: &[usize], dim: usize, cfg: &LineConfig) -> Vec<usize> {
    let lines = within_margin(lines, dim, cfg.margin);
    if lines.len() < INTERIOR_LINES {
        return lines;
    }
    let mut reference = 0.0;
    let mut count = 0;
    let mut start = 0;
    for (i, w) in lines.windows(2).enumerate() {
        let diff = (w[1] - w[0]) as f64;
        if (diff - reference).abs() < spacing_tolerance(reference, cfg) {
            count += 1;
            if count == CONSISTENT_DIFFS {
                return lines[start..i + 2].to_vec();
            }
        } else {
            count = 0;
            reference = diff;
            start = i;
        }
    }
    lines
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Interpolates one missing line inside a run of regular steps.
///
/// Looks at windows of up to five diffs for a pattern where all but one diff
/// match the median step and the remaining one is about twice that step.
/// The result is margin-filtered; when no such window exists the filtered
/// input is returned unchanged.
pub fn fill_missing_lines(lines: &[usize], dim: usize, cfg: &LineConfig) -> Vec<usize> {
    let lines = within_margin(lines, dim, cfg.margin);
    if lines.len() < INTERIOR_LINES - 1 {
        return lines;
    }
    let diffs: Vec<f64> = lines.windows(2).map(|w| (w[1] - w[0]) as f64).collect();

    for start in 0..diffs.len() {
        if start + CONSISTENT_DIFFS - 1 > diffs.len() {
            break;
        }
        let segment = &diffs[start..(start + CONSISTENT_DIFFS).min(diffs.len())];
        let Some(segment_median) = median(segment) else {
            continue;
        };
        let regular: Vec<f64> = segment
            .iter()
            .copied()
            .filter(|&d| d < segment_median * 1.5)
            .collect();
        let Some(step) = median(&regular) else {
            continue;
        };

        let mut consistent = 0;
        let mut doubled = None;
        for (j, &d) in segment.iter().enumerate() {
            if (d - step).abs() < step * cfg.repair_step_tolerance {
                consistent += 1;
            } else if (d - 2.0 * step).abs() < step * cfg.repair_double_tolerance {
                doubled = Some(j);
            }
        }

        if let Some(j) = doubled.filter(|_| consistent + 1 >= segment.len()) {
            let insert_at = start + j + 1;
            let missing = (lines[insert_at - 1] as f64 + step).round_ties_even() as usize;
            trace!("interpolating missing line at {} (step {:.1})", missing, step);
            let mut repaired = lines;
            repaired.insert(insert_at, missing);
            return repaired;
        }
    }
    lines
}

/// Finds the interior lines of one axis at one threshold.
pub fn resolve_lines(signal: &[f64], threshold: f64, cfg: &LineConfig) -> ResolvedLines {
    let dim = signal.len();
    let raw = peak_positions(signal, threshold, cfg);

    let mut lines = prune_lines(&raw, dim, cfg);
    if lines.len() != INTERIOR_LINES || !check_match(&lines, cfg) {
        lines = prune_lines(&fill_missing_lines(&raw, dim, cfg), dim, cfg);
    }
    let matched = lines.len() == INTERIOR_LINES && check_match(&lines, cfg);
    trace!(
        "threshold {:.4e}: {} raw peaks -> {:?} (matched: {})",
        threshold,
        raw.len(),
        lines,
        matched
    );
    ResolvedLines {
        lines: LineSet::new(lines),
        matched,
    }
}
