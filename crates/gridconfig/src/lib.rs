//! Configuration schema for the grid-scan effect.
//!
//! A config file is TOML with one table per concern:
//!
//! ```toml
//! version = 1
//!
//! [grid]
//! lines_color = "#392e4e"
//! grid_scale = 0.1
//! line_style = "dashed"
//! scan_duration = "2s"
//!
//! [input]
//! scan_on_click = true
//! ```
//!
//! Parsing only rejects values that cannot be interpreted. Range clamping of
//! shader parameters happens when the renderer builds its uniform state, so a
//! config with `line_jitter = 5` loads fine and renders with a jitter of 1.

mod color;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub use color::Rgb;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// Integer code the fragment shader branches on.
    pub fn shader_code(self) -> i32 {
        match self {
            LineStyle::Solid => 0,
            LineStyle::Dashed => 1,
            LineStyle::Dotted => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDirection {
    Forward,
    Backward,
    #[default]
    Pingpong,
}

impl ScanDirection {
    pub fn shader_code(self) -> i32 {
        match self {
            ScanDirection::Forward => 0,
            ScanDirection::Backward => 1,
            ScanDirection::Pingpong => 2,
        }
    }
}

/// Where scan bands come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// A single band driven by shader time math; the scan table only holds
    /// click-triggered bands.
    #[default]
    Inert,
    /// Bands are scheduled into the scan table every `duration + delay`.
    Periodic,
}

impl ScanMode {
    pub fn shader_code(self) -> i32 {
        match self {
            ScanMode::Inert => 0,
            ScanMode::Periodic => 1,
        }
    }
}

/// Shader-facing parameters. Every field maps onto exactly one uniform.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub lines_color: Rgb,
    pub scan_color: Rgb,
    pub line_thickness: f32,
    pub grid_scale: f32,
    pub line_style: LineStyle,
    pub line_jitter: f32,
    pub scan_opacity: f32,
    pub scan_direction: ScanDirection,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub scan_duration: Duration,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub scan_delay: Duration,
    pub scan_glow: f32,
    pub scan_softness: f32,
    pub phase_taper: f32,
    pub noise_intensity: f32,
    pub enable_post: bool,
    pub scan_mode: ScanMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            lines_color: Rgb::new(0x39, 0x2e, 0x4e),
            scan_color: Rgb::new(0xff, 0x9f, 0xfc),
            line_thickness: 1.0,
            grid_scale: 0.1,
            line_style: LineStyle::Solid,
            line_jitter: 0.1,
            scan_opacity: 0.4,
            scan_direction: ScanDirection::Pingpong,
            scan_duration: Duration::from_secs(2),
            scan_delay: Duration::from_secs(2),
            scan_glow: 0.5,
            scan_softness: 2.0,
            phase_taper: 0.9,
            noise_intensity: 0.01,
            enable_post: true,
            scan_mode: ScanMode::Inert,
        }
    }
}

/// Parameters handed to optional post-processing capabilities.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostOptions {
    pub bloom_intensity: f32,
    pub chromatic_aberration: f32,
}

impl Default for PostOptions {
    fn default() -> Self {
        Self {
            bloom_intensity: 1.0,
            chromatic_aberration: 0.002,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputOptions {
    /// Request an external input capability (camera/face tracking).
    pub enable_input: bool,
    /// How far the pointer skews the grid.
    pub sensitivity: f32,
    /// Idle time after which the look eases back to centre.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub snap_back_delay: Duration,
    /// Start an extra scan band on every click.
    pub scan_on_click: bool,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            enable_input: false,
            sensitivity: 0.55,
            snap_back_delay: Duration::from_millis(250),
            scan_on_click: false,
        }
    }
}

/// Passthrough hooks for whatever hosts the effect.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Presentation {
    pub class_name: Option<String>,
    pub style: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridScanConfig {
    pub version: u32,
    pub grid: RenderConfig,
    pub post: PostOptions,
    pub input: InputOptions,
    pub presentation: Presentation,
}

impl Default for GridScanConfig {
    fn default() -> Self {
        Self {
            version: 1,
            grid: RenderConfig::default(),
            post: PostOptions::default(),
            input: InputOptions::default(),
            presentation: Presentation::default(),
        }
    }
}

impl GridScanConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: GridScanConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let post = [
            ("post.bloom_intensity", self.post.bloom_intensity),
            ("post.chromatic_aberration", self.post.chromatic_aberration),
            ("input.sensitivity", self.input.sensitivity),
        ];
        for (name, value) in post {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite number >= 0"
                )));
            }
        }

        if let Some(class_name) = &self.presentation.class_name {
            if class_name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "presentation.class_name may not be empty".into(),
                ));
            }
        }

        if self.presentation.style.keys().any(|key| key.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "presentation.style keys may not be empty".into(),
            ));
        }

        Ok(())
    }
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a finite, non-negative number"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("duration {v} is out of range: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[grid]
lines_color = "#112233"
scan_color = "#fff"
grid_scale = 0.25
line_style = "dotted"
line_jitter = 1.5
scan_direction = "backward"
scan_duration = "1500ms"
scan_delay = 0.5
scan_mode = "periodic"
enable_post = false

[post]
bloom_intensity = 0

[input]
scan_on_click = true
snap_back_delay = "1s"

[presentation]
class_name = "maintenance-backdrop"
style = { title = "Back soon" }
"##;

    #[test]
    fn parses_sample_config() {
        let config = GridScanConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.grid.lines_color, Rgb::new(0x11, 0x22, 0x33));
        assert_eq!(config.grid.scan_color, Rgb::new(255, 255, 255));
        assert_eq!(config.grid.line_style, LineStyle::Dotted);
        assert_eq!(config.grid.scan_direction, ScanDirection::Backward);
        assert_eq!(config.grid.scan_duration, Duration::from_millis(1500));
        assert_eq!(config.grid.scan_delay, Duration::from_millis(500));
        assert_eq!(config.grid.scan_mode, ScanMode::Periodic);
        assert!(!config.grid.enable_post);
        assert_eq!(config.post.bloom_intensity, 0.0);
        assert!(config.input.scan_on_click);
        assert_eq!(config.input.snap_back_delay, Duration::from_secs(1));
        assert_eq!(
            config.presentation.class_name.as_deref(),
            Some("maintenance-backdrop")
        );
        assert_eq!(
            config.presentation.style.get("title").map(String::as_str),
            Some("Back soon")
        );
    }

    #[test]
    fn out_of_range_shader_values_are_left_for_the_renderer() {
        let config = GridScanConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.grid.line_jitter, 1.5);
    }

    #[test]
    fn missing_tables_fall_back_to_defaults() {
        let config = GridScanConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config, GridScanConfig::default());
        assert_eq!(config.grid.grid_scale, 0.1);
        assert_eq!(config.grid.scan_direction, ScanDirection::Pingpong);
        assert_eq!(config.grid.scan_mode, ScanMode::Inert);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = GridScanConfig::from_toml_str("[grid]\ngrid_size = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = GridScanConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_durations() {
        let err = GridScanConfig::from_toml_str("[grid]\nscan_delay = -1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_durations_too_large_to_represent() {
        for input in [
            "[grid]\nscan_duration = 1e30",
            "[grid]\nscan_delay = 1e300",
            "[input]\nsnap_back_delay = 1e25",
        ] {
            let err = GridScanConfig::from_toml_str(input).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)), "{input}: {err}");
        }
    }

    #[test]
    fn rejects_negative_sensitivity() {
        let err = GridScanConfig::from_toml_str("[input]\nsensitivity = -0.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn serialises_back_to_loadable_toml() {
        let config = GridScanConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        let reparsed = GridScanConfig::from_toml_str(&text).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridscan.toml");
        std::fs::write(&path, "[grid]\nline_style = \"dashed\"\n").unwrap();
        let config = GridScanConfig::load(&path).unwrap();
        assert_eq!(config.grid.line_style, LineStyle::Dashed);

        let missing = GridScanConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn shader_codes_match_branch_order() {
        assert_eq!(LineStyle::Solid.shader_code(), 0);
        assert_eq!(LineStyle::Dashed.shader_code(), 1);
        assert_eq!(LineStyle::Dotted.shader_code(), 2);
        assert_eq!(ScanDirection::Pingpong.shader_code(), 2);
        assert_eq!(ScanMode::Periodic.shader_code(), 1);
    }
}
