//! Locates a chessboard's pixel grid inside a screenshot.
//!
//! The detector isolates the board from surrounding UI with a contour-based
//! rough crop, projects large-kernel gradients onto both axes, searches for
//! the seven interior grid lines per axis, and extrapolates the outer edges
//! to crop the board exactly.
//!
//! ```no_run
//! use chessboard_locator::{detect_file, DetectorConfig};
//!
//! let result = detect_file("screenshot.png".as_ref(), &DetectorConfig::default())?;
//! if result.success {
//!     println!("board at {}", result.bbox);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod annotate;
pub mod capture;
pub mod config;
pub mod crop;
pub mod detector;
pub mod lines;
pub mod projection;
pub mod rough_crop;
pub mod threshold;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::DetectorConfig;
pub use detector::{detect_board, detect_board_traced, detect_file, DetectionTrace};
pub use types::{BoundingBox, DetectionResult, LineSet};
