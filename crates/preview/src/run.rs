use anyhow::{Context, Result};
use gridconfig::GridScanConfig;
use gridscan::{run_preview, PreviewOptions, UniformState};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::ConfigLocation;

const DEFAULT_FILTER: &str =
    "warn,gridscan=info,gridscan_preview=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error";
const DEFAULT_SIZE: (u32, u32) = (1280, 720);

pub fn initialise_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let size = args.size.unwrap_or(DEFAULT_SIZE);
    tracing::info!(
        width = size.0,
        height = size.1,
        gpu_power = %args.gpu_power,
        "opening gridscan preview"
    );
    run_preview(PreviewOptions {
        config,
        size,
        gpu_power: args.gpu_power,
    })
}

/// Prints the uniform block the configuration resolves to, sized as the
/// preview window would be at a pixel ratio of 1.
pub fn print_uniforms(args: &RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let (width, height) = args.size.unwrap_or(DEFAULT_SIZE);
    let mut uniforms = UniformState::from_config(&config.grid);
    uniforms.on_resize(width as f32, height as f32, 1.0);
    let json = serde_json::to_string_pretty(&uniforms.snapshot())
        .context("failed to serialise uniforms")?;
    println!("{json}");
    Ok(())
}

pub fn print_config_location(args: &RunArgs) -> Result<()> {
    let location = ConfigLocation::resolve(args.config.as_deref())?;
    let status = if location.path().is_file() {
        "present"
    } else {
        "missing"
    };
    println!(
        "{} ({}, {status})",
        location.path().display(),
        location.source()
    );
    Ok(())
}

pub fn resolve_config(args: &RunArgs) -> Result<GridScanConfig> {
    let location = ConfigLocation::resolve(args.config.as_deref())?;
    let mut config = load_config(&location)?;
    apply_overrides(&mut config, args);
    config
        .validate()
        .context("configuration is invalid after applying command-line overrides")?;
    Ok(config)
}

fn load_config(location: &ConfigLocation) -> Result<GridScanConfig> {
    let path = location.path();
    if !location.is_required() && !path.exists() {
        tracing::debug!(path = %path.display(), "no user config; using defaults");
        return Ok(GridScanConfig::default());
    }
    let config = GridScanConfig::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    tracing::info!(path = %path.display(), source = %location.source(), "loaded config");
    Ok(config)
}

fn apply_overrides(config: &mut GridScanConfig, args: &RunArgs) {
    if let Some(scale) = args.grid_scale {
        config.grid.grid_scale = scale;
    }
    if let Some(style) = args.line_style {
        config.grid.line_style = style;
    }
    if let Some(mode) = args.scan_mode {
        config.grid.scan_mode = mode;
    }
    if args.no_post {
        config.grid.enable_post = false;
    }
}
