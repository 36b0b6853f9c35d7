//! Host-side mirror of the fragment shader's uniform block.
//!
//! `UniformState` holds one value per [`UniformId`] and remembers which ones
//! changed since the last upload, so a steady-state frame only ships `iTime`
//! (plus `uLook` or the scan table when those move).

use std::collections::BTreeMap;

use gridconfig::RenderConfig;
use serde::Serialize;
use tracing::warn;

use crate::scan::{ScanTable, SCAN_SLOTS};

/// Smallest grid cell size handed to the shader; the shader divides by it.
pub const GRID_SCALE_EPSILON: f32 = 1e-4;
/// Shortest scan sweep in seconds; the shader divides elapsed time by it.
pub const MIN_SCAN_DURATION: f32 = 0.05;
/// Narrowest scan band falloff.
pub const MIN_SCAN_SOFTNESS: f32 = 0.01;

const PACKED_VEC4S: usize = SCAN_SLOTS / 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UniformId {
    Resolution,
    Time,
    LinesColor,
    LineThickness,
    ScanColor,
    GridScale,
    ScanStarts,
    ScanReverse,
    Look,
    LineStyle,
    LineJitter,
    ScanOpacity,
    ScanDirection,
    ScanDuration,
    ScanDelay,
    ScanGlow,
    ScanSoftness,
    PhaseTaper,
    NoiseIntensity,
    ScanCount,
    ScanMode,
    PostEnabled,
}

impl UniformId {
    pub const COUNT: usize = 22;

    pub const ALL: [UniformId; Self::COUNT] = [
        UniformId::Resolution,
        UniformId::Time,
        UniformId::LinesColor,
        UniformId::LineThickness,
        UniformId::ScanColor,
        UniformId::GridScale,
        UniformId::ScanStarts,
        UniformId::ScanReverse,
        UniformId::Look,
        UniformId::LineStyle,
        UniformId::LineJitter,
        UniformId::ScanOpacity,
        UniformId::ScanDirection,
        UniformId::ScanDuration,
        UniformId::ScanDelay,
        UniformId::ScanGlow,
        UniformId::ScanSoftness,
        UniformId::PhaseTaper,
        UniformId::NoiseIntensity,
        UniformId::ScanCount,
        UniformId::ScanMode,
        UniformId::PostEnabled,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Member name inside the shader's uniform block.
    pub fn name(self) -> &'static str {
        match self {
            UniformId::Resolution => "iResolution",
            UniformId::Time => "iTime",
            UniformId::LinesColor => "uLinesColor",
            UniformId::LineThickness => "uLineThickness",
            UniformId::ScanColor => "uScanColor",
            UniformId::GridScale => "uGridScale",
            UniformId::ScanStarts => "uScanStarts",
            UniformId::ScanReverse => "uScanReverse",
            UniformId::Look => "uLook",
            UniformId::LineStyle => "uLineStyle",
            UniformId::LineJitter => "uLineJitter",
            UniformId::ScanOpacity => "uScanOpacity",
            UniformId::ScanDirection => "uScanDirection",
            UniformId::ScanDuration => "uScanDuration",
            UniformId::ScanDelay => "uScanDelay",
            UniformId::ScanGlow => "uScanGlow",
            UniformId::ScanSoftness => "uScanSoftness",
            UniformId::PhaseTaper => "uPhaseTaper",
            UniformId::NoiseIntensity => "uNoiseIntensity",
            UniformId::ScanCount => "uScanCount",
            UniformId::ScanMode => "uScanMode",
            UniformId::PostEnabled => "uPostEnabled",
        }
    }

    pub fn kind(self) -> UniformKind {
        match self {
            UniformId::Resolution | UniformId::LinesColor | UniformId::ScanColor => {
                UniformKind::Vec3
            }
            UniformId::ScanStarts | UniformId::ScanReverse => UniformKind::Vec4Array(PACKED_VEC4S),
            UniformId::Look => UniformKind::Vec2,
            UniformId::LineStyle
            | UniformId::ScanDirection
            | UniformId::ScanCount
            | UniformId::ScanMode
            | UniformId::PostEnabled => UniformKind::Int,
            _ => UniformKind::Float,
        }
    }

    /// The `RenderConfig` field this uniform is derived from, if any.
    pub fn config_field(self) -> Option<&'static str> {
        match self {
            UniformId::LinesColor => Some("lines_color"),
            UniformId::LineThickness => Some("line_thickness"),
            UniformId::ScanColor => Some("scan_color"),
            UniformId::GridScale => Some("grid_scale"),
            UniformId::LineStyle => Some("line_style"),
            UniformId::LineJitter => Some("line_jitter"),
            UniformId::ScanOpacity => Some("scan_opacity"),
            UniformId::ScanDirection => Some("scan_direction"),
            UniformId::ScanDuration => Some("scan_duration"),
            UniformId::ScanDelay => Some("scan_delay"),
            UniformId::ScanGlow => Some("scan_glow"),
            UniformId::ScanSoftness => Some("scan_softness"),
            UniformId::PhaseTaper => Some("phase_taper"),
            UniformId::NoiseIntensity => Some("noise_intensity"),
            UniformId::PostEnabled => Some("enable_post"),
            UniformId::ScanMode => Some("scan_mode"),
            UniformId::Resolution
            | UniformId::Time
            | UniformId::ScanStarts
            | UniformId::ScanReverse
            | UniformId::Look
            | UniformId::ScanCount => None,
        }
    }
}

/// GLSL type of a uniform block member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4Array(usize),
}

impl UniformKind {
    pub fn byte_len(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4Array(len) => 16 * len,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4Array([[f32; 4]; PACKED_VEC4S]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4Array(_) => UniformKind::Vec4Array(PACKED_VEC4S),
        }
    }

    /// Raw little-endian bytes in std140 member layout.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(value) => bytemuck::bytes_of(value),
            UniformValue::Int(value) => bytemuck::bytes_of(value),
            UniformValue::Vec2(value) => bytemuck::bytes_of(value),
            UniformValue::Vec3(value) => bytemuck::bytes_of(value),
            UniformValue::Vec4Array(value) => bytemuck::cast_slice(value.as_slice()),
        }
    }
}

/// Set of uniforms written since the last upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtySet(u32);

impl DirtySet {
    pub fn all() -> Self {
        Self((1u32 << UniformId::COUNT) - 1)
    }

    pub fn insert(&mut self, id: UniformId) {
        self.0 |= 1 << id.index();
    }

    pub fn contains(&self, id: UniformId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = UniformId> {
        UniformId::ALL.into_iter().filter(move |id| self.contains(*id))
    }
}

#[derive(Debug, Clone)]
pub struct UniformState {
    values: [UniformValue; UniformId::COUNT],
    dirty: DirtySet,
}

impl UniformState {
    /// Maps every config field onto its uniform, clamping into the shader's
    /// valid ranges. The resolution stays zero until the first `on_resize`.
    pub fn from_config(config: &RenderConfig) -> Self {
        let defaults = RenderConfig::default();
        let mut values = [UniformValue::Float(0.0); UniformId::COUNT];
        let mut put = |id: UniformId, value: UniformValue| values[id.index()] = value;

        put(UniformId::Resolution, UniformValue::Vec3([0.0, 0.0, 1.0]));
        put(UniformId::Time, UniformValue::Float(0.0));
        put(UniformId::LinesColor, UniformValue::Vec3(config.lines_color.to_unit()));
        put(UniformId::ScanColor, UniformValue::Vec3(config.scan_color.to_unit()));
        put(
            UniformId::LineThickness,
            UniformValue::Float(sanitize(
                "line_thickness",
                config.line_thickness,
                defaults.line_thickness,
                0.0,
                f32::MAX,
            )),
        );
        put(
            UniformId::GridScale,
            UniformValue::Float(sanitize(
                "grid_scale",
                config.grid_scale,
                defaults.grid_scale,
                GRID_SCALE_EPSILON,
                f32::MAX,
            )),
        );
        put(
            UniformId::LineStyle,
            UniformValue::Int(config.line_style.shader_code()),
        );
        put(
            UniformId::LineJitter,
            UniformValue::Float(sanitize(
                "line_jitter",
                config.line_jitter,
                defaults.line_jitter,
                0.0,
                1.0,
            )),
        );
        put(
            UniformId::ScanOpacity,
            UniformValue::Float(sanitize(
                "scan_opacity",
                config.scan_opacity,
                defaults.scan_opacity,
                0.0,
                1.0,
            )),
        );
        put(
            UniformId::ScanDirection,
            UniformValue::Int(config.scan_direction.shader_code()),
        );
        put(
            UniformId::ScanDuration,
            UniformValue::Float(sanitize(
                "scan_duration",
                config.scan_duration.as_secs_f32(),
                defaults.scan_duration.as_secs_f32(),
                MIN_SCAN_DURATION,
                f32::MAX,
            )),
        );
        put(
            UniformId::ScanDelay,
            UniformValue::Float(config.scan_delay.as_secs_f32()),
        );
        put(
            UniformId::ScanGlow,
            UniformValue::Float(sanitize(
                "scan_glow",
                config.scan_glow,
                defaults.scan_glow,
                0.0,
                f32::MAX,
            )),
        );
        put(
            UniformId::ScanSoftness,
            UniformValue::Float(sanitize(
                "scan_softness",
                config.scan_softness,
                defaults.scan_softness,
                MIN_SCAN_SOFTNESS,
                f32::MAX,
            )),
        );
        put(
            UniformId::PhaseTaper,
            UniformValue::Float(sanitize(
                "phase_taper",
                config.phase_taper,
                defaults.phase_taper,
                0.0,
                1.0,
            )),
        );
        put(
            UniformId::NoiseIntensity,
            UniformValue::Float(sanitize(
                "noise_intensity",
                config.noise_intensity,
                defaults.noise_intensity,
                0.0,
                1.0,
            )),
        );
        put(UniformId::ScanStarts, UniformValue::Vec4Array([[0.0; 4]; PACKED_VEC4S]));
        put(UniformId::ScanReverse, UniformValue::Vec4Array([[0.0; 4]; PACKED_VEC4S]));
        put(UniformId::ScanCount, UniformValue::Int(0));
        put(UniformId::ScanMode, UniformValue::Int(config.scan_mode.shader_code()));
        put(UniformId::Look, UniformValue::Vec2([0.0, 0.0]));
        put(
            UniformId::PostEnabled,
            UniformValue::Int(i32::from(config.enable_post)),
        );

        Self {
            values,
            dirty: DirtySet::all(),
        }
    }

    pub fn get(&self, id: UniformId) -> UniformValue {
        self.values[id.index()]
    }

    pub fn float(&self, id: UniformId) -> Option<f32> {
        match self.get(id) {
            UniformValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn int(&self, id: UniformId) -> Option<i32> {
        match self.get(id) {
            UniformValue::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn vec3(&self, id: UniformId) -> Option<[f32; 3]> {
        match self.get(id) {
            UniformValue::Vec3(value) => Some(value),
            _ => None,
        }
    }

    /// Advances the clock uniform.
    pub fn tick(&mut self, elapsed_seconds: f32) {
        self.set(UniformId::Time, UniformValue::Float(elapsed_seconds));
    }

    /// Sets `iResolution` to the container size in logical pixels and the
    /// pixel ratio the drawable was scaled by.
    pub fn on_resize(&mut self, width: f32, height: f32, pixel_ratio: f32) {
        self.set(
            UniformId::Resolution,
            UniformValue::Vec3([width, height, pixel_ratio]),
        );
    }

    pub fn set_look(&mut self, look: [f32; 2]) {
        self.set(UniformId::Look, UniformValue::Vec2(look));
    }

    /// Forces the post toggle off when no post capability actually loaded.
    pub fn set_post_enabled(&mut self, enabled: bool) {
        self.set(UniformId::PostEnabled, UniformValue::Int(i32::from(enabled)));
    }

    pub fn post_enabled(&self) -> bool {
        self.int(UniformId::PostEnabled).unwrap_or(0) != 0
    }

    /// Mirrors the scan table into the packed `uScanStarts`/`uScanReverse` arrays.
    pub fn set_scans(&mut self, table: &ScanTable) {
        let mut starts = [[0.0f32; 4]; PACKED_VEC4S];
        let mut reverse = [[0.0f32; 4]; PACKED_VEC4S];
        for (slot, event) in table.active().iter().enumerate() {
            starts[slot / 4][slot % 4] = event.start;
            reverse[slot / 4][slot % 4] = if event.reverse { 1.0 } else { 0.0 };
        }
        self.set(UniformId::ScanStarts, UniformValue::Vec4Array(starts));
        self.set(UniformId::ScanReverse, UniformValue::Vec4Array(reverse));
        self.set(
            UniformId::ScanCount,
            UniformValue::Int(table.active_count() as i32),
        );
    }

    pub fn dirty(&self) -> DirtySet {
        self.dirty
    }

    /// Returns and clears the set of uniforms changed since the last call.
    pub fn take_dirty(&mut self) -> DirtySet {
        std::mem::take(&mut self.dirty)
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty = DirtySet::all();
    }

    /// Name-keyed view for diagnostics output.
    pub fn snapshot(&self) -> BTreeMap<&'static str, UniformValue> {
        UniformId::ALL
            .into_iter()
            .map(|id| (id.name(), self.get(id)))
            .collect()
    }

    fn set(&mut self, id: UniformId, value: UniformValue) {
        let slot = &mut self.values[id.index()];
        if *slot != value {
            *slot = value;
            self.dirty.insert(id);
        }
    }
}

fn sanitize(field: &'static str, value: f32, default: f32, min: f32, max: f32) -> f32 {
    let finite = if value.is_finite() {
        value
    } else {
        warn!(field, requested = value, applied = default, "non-finite value replaced by default");
        default
    };
    let clamped = finite.clamp(min, max);
    if clamped != finite {
        warn!(field, requested = finite, applied = clamped, "value clamped to valid range");
    }
    clamped
}
