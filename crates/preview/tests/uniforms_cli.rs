use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn preview() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_gridscan-preview"));
    command.env_remove("GRIDSCAN_CONFIG").env("RUST_LOG", "off");
    command
}

fn uniforms(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("uniforms output is JSON")
}

fn float(value: &Value, name: &str) -> f64 {
    value[name]
        .as_f64()
        .unwrap_or_else(|| panic!("{name} missing from {value}"))
}

#[test]
fn uniforms_reflect_the_config_file() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("gridscan.toml");
    fs::write(
        &path,
        r##"
version = 1

[grid]
grid_scale = 0.1
line_style = "dashed"
line_jitter = 1.5
lines_color = "#ff0000"
"##,
    )
    .unwrap();

    let output = preview()
        .arg("--config")
        .arg(&path)
        .args(["--size", "800x600", "uniforms"])
        .output()
        .expect("failed to run gridscan-preview uniforms");
    let value = uniforms(&output);

    assert!((float(&value, "uGridScale") - 0.1).abs() < 1e-6);
    assert_eq!(value["uLineStyle"], 1);
    assert_eq!(float(&value, "uLineJitter"), 1.0);
    assert_eq!(value["uLinesColor"], serde_json::json!([1.0, 0.0, 0.0]));
    assert_eq!(value["iResolution"], serde_json::json!([800.0, 600.0, 1.0]));
}

#[test]
fn environment_config_is_used_and_flags_override_it() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("env.toml");
    fs::write(&path, "[grid]\ngrid_scale = 0.5\n").unwrap();

    let output = preview()
        .env("GRIDSCAN_CONFIG", &path)
        .args(["uniforms", "--grid-scale", "0", "--no-post"])
        .output()
        .expect("failed to run gridscan-preview uniforms");
    let value = uniforms(&output);

    assert!(float(&value, "uGridScale") > 0.0);
    assert!(float(&value, "uGridScale") < 0.01);
    assert_eq!(value["uPostEnabled"], 0);
}

#[test]
fn where_reports_the_environment_path() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("absent.toml");

    let output = preview()
        .env("GRIDSCAN_CONFIG", &path)
        .arg("where")
        .output()
        .expect("failed to run gridscan-preview where");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&path.display().to_string()));
    assert!(stdout.contains("$GRIDSCAN_CONFIG"));
    assert!(stdout.contains("missing"));
}

#[test]
fn explicit_config_must_exist() {
    let root = TempDir::new().unwrap();
    let output = preview()
        .arg("--config")
        .arg(root.path().join("nope.toml"))
        .arg("uniforms")
        .output()
        .expect("failed to run gridscan-preview uniforms");
    assert!(!output.status.success());
}

#[test]
fn unknown_keys_are_rejected() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("typo.toml");
    fs::write(&path, "[grid]\ngrid_scael = 0.5\n").unwrap();

    let output = preview()
        .arg("--config")
        .arg(&path)
        .arg("uniforms")
        .output()
        .expect("failed to run gridscan-preview uniforms");
    assert!(!output.status.success());
}

#[test]
fn oversized_durations_are_reported_not_panicked_on() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("huge.toml");
    fs::write(&path, "[grid]\nscan_duration = 1e30\n").unwrap();

    let output = preview()
        .arg("--config")
        .arg(&path)
        .arg("uniforms")
        .output()
        .expect("failed to run gridscan-preview uniforms");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("panicked"), "stderr: {stderr}");
}
