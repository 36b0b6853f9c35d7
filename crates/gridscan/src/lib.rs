//! Animated grid-scan background effect.
//!
//! A single fragment shader draws a perspective grid with travelling scan
//! bands over a full-screen triangle. This crate owns everything around that
//! shader:
//!
//! ```text
//!   GridScanConfig ──▶ UniformState ──▶ ShaderProgram::upload ──▶ GPU UBO
//!                           ▲                      ▲
//!   host resize ──▶ RenderSurface          FrameScheduler::fire ◀── host timer
//! ```
//!
//! [`GridScan`] is the lifecycle manager the host talks to. It reaches the
//! platform only through the traits in [`backend`], so the same pipeline runs
//! against the wgpu/winit implementations in [`gpu`] and [`window`] or
//! against in-memory doubles in tests.
//!
//! Initialisation failures never reach the host: the effect logs once and
//! stays `Unmounted`, and the page (or window) simply has no background.

pub mod backend;
pub mod effects;
pub mod error;
pub mod gpu;
pub mod lifecycle;
pub mod look;
pub mod program;
pub mod scan;
pub mod scheduler;
pub mod surface;
pub mod types;
pub mod uniforms;
pub mod window;

pub use backend::{FrameTimer, GpuDevice, ProgramId, ProgramSource, SurfaceHost};
pub use effects::{CapabilityProbe, CapabilityRequest, Effect, EffectChain, InputSource, PostPass};
pub use error::{GridScanError, ShaderStageKind};
pub use gridconfig::{GridScanConfig, RenderConfig};
pub use lifecycle::{GridScan, LifecycleState};
pub use program::{reflect_uniform_block, ShaderProgram, UniformLayout, FRAGMENT_SHADER, VERTEX_SHADER};
pub use scan::{ScanEvent, ScanRequest, ScanScheduler, ScanTable, ScanTableFull, SCAN_SLOTS};
pub use scheduler::{FrameScheduler, FrameTick, MAX_FRAME_DELTA};
pub use surface::{RenderSurface, SurfaceMetrics, MAX_PIXEL_RATIO};
pub use types::GpuPowerPreference;
pub use uniforms::{UniformId, UniformKind, UniformState, UniformValue};
pub use window::{run_preview, PreviewOptions};
