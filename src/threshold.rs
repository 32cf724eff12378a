//! Adaptive threshold search over both projection signals.

use log::debug;
use serde::Serialize;

use crate::config::{LineConfig, ThresholdConfig};
use crate::lines::resolve_lines;
use crate::projection::{signal_max, Projection};
use crate::types::LineSet;

/// Interior lines found on both axes at one threshold level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GridLines {
    /// Level `a` of the threshold `max * a / levels` that produced the lines.
    pub level: u32,
    pub x: LineSet,
    pub y: LineSet,
}

/// Resolves both axes at `max * level / levels`; `Some` only when both match.
fn try_level(
    proj: &Projection,
    level: u32,
    search: &ThresholdConfig,
    lines: &LineConfig,
) -> Option<GridLines> {
    let frac = level as f64 / search.levels as f64;
    let rx = resolve_lines(&proj.x, signal_max(&proj.x) * frac, lines);
    let ry = resolve_lines(&proj.y, signal_max(&proj.y) * frac, lines);
    debug!(
        "threshold level {}/{}: x {} lines (matched {}), y {} lines (matched {})",
        level,
        search.levels,
        rx.lines.len(),
        rx.matched,
        ry.lines.len(),
        ry.matched
    );
    (rx.matched && ry.matched).then(|| GridLines {
        level,
        x: rx.lines,
        y: ry.lines,
    })
}

/// Walks the threshold levels from the loosest up and stops at the first one
/// where both axes match. When that level is not the last, the next, sharper
/// level is tried once and preferred if it still matches.
pub fn search_grid_lines(
    proj: &Projection,
    search: &ThresholdConfig,
    lines: &LineConfig,
) -> Option<GridLines> {
    let last = search.levels.saturating_sub(1);
    for level in 1..=last {
        let Some(found) = try_level(proj, level, search, lines) else {
            continue;
        };
        let sharper = (level < last)
            .then(|| try_level(proj, level + 1, search, lines))
            .flatten();
        return Some(sharper.unwrap_or(found));
    }
    debug!("no threshold level matched both axes");
    None
}
