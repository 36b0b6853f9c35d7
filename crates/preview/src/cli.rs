use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gridconfig::{LineStyle, ScanMode};
use gridscan::GpuPowerPreference;

#[derive(Parser, Debug)]
#[command(
    name = "gridscan-preview",
    author,
    version,
    about = "Preview the gridscan perspective-grid effect in a window"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; falls back to `GRIDSCAN_CONFIG`, then the user config directory.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, global = true)]
    pub size: Option<(u32, u32)>,

    /// Override `grid.grid_scale`.
    #[arg(long, value_name = "SCALE", global = true)]
    pub grid_scale: Option<f32>,

    /// Override `grid.line_style`: `solid`, `dashed` or `dotted`.
    #[arg(long, value_name = "STYLE", value_parser = parse_line_style, global = true)]
    pub line_style: Option<LineStyle>,

    /// Override `grid.scan_mode`: `inert` or `periodic`.
    #[arg(long, value_name = "MODE", value_parser = parse_scan_mode, global = true)]
    pub scan_mode: Option<ScanMode>,

    /// Do not request post-processing.
    #[arg(long, global = true)]
    pub no_post: bool,

    /// GPU power preference: `low` (default) or `high`.
    #[arg(long, value_name = "POWER", default_value_t = GpuPowerPreference::default(), global = true)]
    pub gpu_power: GpuPowerPreference,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the uniform values the resolved configuration produces, as JSON.
    Uniforms,
    /// Print which configuration file would be used.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let Some((width, height)) = trimmed.split_once(['x', 'X']) else {
        return Err(format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"));
    };
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height.trim()))?;
    if width == 0 || height == 0 {
        return Err("size must be non-zero in both dimensions".to_string());
    }
    Ok((width, height))
}

pub fn parse_line_style(value: &str) -> Result<LineStyle, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "solid" => Ok(LineStyle::Solid),
        "dashed" => Ok(LineStyle::Dashed),
        "dotted" => Ok(LineStyle::Dotted),
        other => Err(format!(
            "unknown line style '{other}'; expected solid, dashed, or dotted"
        )),
    }
}

pub fn parse_scan_mode(value: &str) -> Result<ScanMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "inert" | "time" => Ok(ScanMode::Inert),
        "periodic" | "table" => Ok(ScanMode::Periodic),
        other => Err(format!(
            "unknown scan mode '{other}'; expected inert or periodic"
        )),
    }
}
