//! Config module.
//! Manages I/O for the detector's JSON config (rough crop, gradient, line and
//! threshold parameters). Uses serde for JSON serialization.
//! Every field has a default, so a partial file only overrides what it names.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level detector parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub rough_crop: RoughCropConfig,
    pub gradient: GradientConfig,
    pub lines: LineConfig,
    pub threshold: ThresholdConfig,
}

/// Contour search used to discard UI chrome around the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoughCropConfig {
    /// When false the whole input is used as the working image.
    pub enabled: bool,
    /// Minimum bounding-rect area as a fraction of the image area.
    pub min_area_frac: f64,
    /// Padding added on each side, as a fraction of the winning rect's size.
    pub padding_frac: f64,
    /// Largest contours examined per strategy.
    pub max_contours: usize,
    pub min_aspect: f64,
    pub max_aspect: f64,
    /// Weight of the area bonus in the candidate score.
    pub area_weight: f64,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Closing kernel side is `max(close_kernel_min, min(h, w) / close_kernel_divisor)`.
    pub close_kernel_min: u32,
    pub close_kernel_divisor: u32,
}

impl Default for RoughCropConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_area_frac: 0.05,
            padding_frac: 0.02,
            max_contours: 20,
            min_aspect: 0.5,
            max_aspect: 2.0,
            area_weight: 0.5,
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            close_kernel_min: 10,
            close_kernel_divisor: 80,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    /// Derivative filter size; odd, at least 3.
    pub kernel_size: usize,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self { kernel_size: 31 }
    }
}

/// Peak extraction and equal-spacing rules for one projection signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Peaks this close to either end of the signal are discarded.
    pub margin: usize,
    /// Absolute floor of the spacing tolerance, in pixels.
    pub min_tolerance: f64,
    /// Spacing tolerance relative to the reference step.
    pub tolerance_frac: f64,
    pub smoothing_window: usize,
    pub smoothing_sigma: f64,
    /// Relative tolerance for a regular step during gap repair.
    pub repair_step_tolerance: f64,
    /// Relative tolerance for the doubled step during gap repair.
    pub repair_double_tolerance: f64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            margin: 10,
            min_tolerance: 5.0,
            tolerance_frac: 0.06,
            smoothing_window: 21,
            smoothing_sigma: 8.0,
            repair_step_tolerance: 0.08,
            repair_double_tolerance: 0.15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Thresholds tried are `max * a / levels` for `a` in `1..levels`.
    pub levels: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self { levels: 5 }
    }
}

impl DetectorConfig {
    /// Rejects parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let rc = &self.rough_crop;
        if !(0.0..1.0).contains(&rc.min_area_frac) {
            bail!("rough_crop.min_area_frac must be in [0, 1), got {}", rc.min_area_frac);
        }
        if !(0.0..0.5).contains(&rc.padding_frac) {
            bail!("rough_crop.padding_frac must be in [0, 0.5), got {}", rc.padding_frac);
        }
        if rc.min_aspect <= 0.0 || rc.min_aspect > rc.max_aspect {
            bail!(
                "rough_crop aspect range [{}, {}] is invalid",
                rc.min_aspect,
                rc.max_aspect
            );
        }
        if rc.blur_sigma <= 0.0 {
            bail!("rough_crop.blur_sigma must be positive, got {}", rc.blur_sigma);
        }
        if rc.canny_low < 1.0 || rc.canny_low > rc.canny_high {
            bail!(
                "rough_crop canny thresholds must satisfy 1 <= low <= high, got {} / {}",
                rc.canny_low,
                rc.canny_high
            );
        }
        if rc.close_kernel_divisor == 0 {
            bail!("rough_crop.close_kernel_divisor must be non-zero");
        }

        let k = self.gradient.kernel_size;
        if k < 3 || k % 2 == 0 {
            bail!("gradient.kernel_size must be odd and >= 3, got {}", k);
        }

        let lines = &self.lines;
        if lines.smoothing_window == 0 || lines.smoothing_window % 2 == 0 {
            bail!("lines.smoothing_window must be odd, got {}", lines.smoothing_window);
        }
        if lines.smoothing_sigma <= 0.0 {
            bail!("lines.smoothing_sigma must be positive, got {}", lines.smoothing_sigma);
        }
        if lines.min_tolerance <= 0.0 || lines.tolerance_frac < 0.0 {
            bail!("lines spacing tolerances must be positive");
        }
        if lines.repair_step_tolerance <= 0.0 || lines.repair_double_tolerance <= 0.0 {
            bail!("lines repair tolerances must be positive");
        }

        if self.threshold.levels < 2 {
            bail!("threshold.levels must be at least 2, got {}", self.threshold.levels);
        }
        Ok(())
    }
}

/// Loads and validates a config file.
pub fn load_config(path: &Path) -> Result<DetectorConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: DetectorConfig = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {}", path.display()))?;
    Ok(config)
}

/// Writes `config` as pretty-printed JSON.
pub fn save_config(path: &Path, config: &DetectorConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write config file {}", path.display()))
}
