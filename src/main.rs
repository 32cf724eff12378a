use anyhow::{bail, Context, Result};
use chessboard_locator::annotate::{draw_bbox, DEFAULT_COLOR, DEFAULT_THICKNESS};
use chessboard_locator::capture::{load_screenshot, save_image};
use chessboard_locator::config::{load_config, save_config};
use chessboard_locator::{detect_board_traced, DetectorConfig};
use clap::{Arg, ArgAction, Command};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse CLI arguments
    let matches = Command::new("chessboard-locator")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Finds and crops the chessboard in a screenshot")
        .arg(
            Arg::new("image")
                .value_name("IMAGE")
                .help("Screenshot to search (PNG, JPEG, ...)")
                .value_parser(clap::value_parser!(PathBuf))
                .required_unless_present("write-config"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON detector config; missing fields keep their defaults")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .value_name("FILE")
                .help("Write the effective config as JSON")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("crop-out")
                .long("crop-out")
                .value_name("FILE")
                .help("Where to save the cropped board")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("annotate-out")
                .long("annotate-out")
                .value_name("FILE")
                .help("Where to save the screenshot with the board outlined")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .value_name("FILE")
                .help("Write pipeline diagnostics (signals, lines, rough crop) as JSON")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("no-rough-crop")
                .long("no-rough-crop")
                .help("Skip the contour search; use when the input is already close to the board")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_config(path)?,
        None => DetectorConfig::default(),
    };
    if matches.get_flag("no-rough-crop") {
        config.rough_crop.enabled = false;
    }

    if let Some(path) = matches.get_one::<PathBuf>("write-config") {
        save_config(path, &config)?;
        info!("Wrote config to {}", path.display());
    }

    let Some(image_path) = matches.get_one::<PathBuf>("image") else {
        return Ok(());
    };

    let screenshot = load_screenshot(image_path)?;

    let start = Instant::now();
    let (result, trace) = detect_board_traced(&screenshot, &config);
    info!("Detection latency: {:?}", start.elapsed());

    if let Some(path) = matches.get_one::<PathBuf>("trace") {
        write_trace(path, &serde_json::to_string_pretty(&trace.summary(&result))?)?;
    }

    if let Some(path) = matches.get_one::<PathBuf>("annotate-out") {
        let annotated = draw_bbox(&screenshot, result.bbox, DEFAULT_COLOR, DEFAULT_THICKNESS);
        save_image(path, &annotated)?;
    }

    if !result.success {
        bail!("Board not detected in {}", image_path.display());
    }

    println!("Board bbox (y0, y1, x0, x1): {}", result.bbox);
    println!(
        "Cropped board: {}x{}",
        result.cropped.width(),
        result.cropped.height()
    );

    if let Some(path) = matches.get_one::<PathBuf>("crop-out") {
        save_image(path, &result.cropped)?;
        println!("Saved crop to {}", path.display());
    }

    Ok(())
}

fn write_trace(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create trace directory {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write trace to {}", path.display()))
}
