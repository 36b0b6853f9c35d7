//! Seams between the pipeline and the platform it runs on.
//!
//! The wgpu/winit implementations live in `gpu` and `window`; tests drive the
//! same pipeline through in-memory doubles.

use crate::error::GridScanError;

/// Opaque handle to a program owned by a [`GpuDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Everything a device needs to build a program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    /// Size in bytes of the uniform block at set 0, binding 0.
    pub uniform_block_size: u64,
}

/// GPU context bound to one presentable surface.
///
/// Dropping the device releases the context and detaches the surface from its
/// container.
pub trait GpuDevice {
    /// Reconfigures the presentable surface to a new physical size.
    fn configure(&mut self, width: u32, height: u32);

    /// Builds a program; validation failures come back as errors instead of panics.
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, GridScanError>;

    /// Writes `bytes` into the program's uniform block at byte `offset`.
    fn write_uniform(&mut self, program: ProgramId, offset: u32, bytes: &[u8]);

    /// Issues one full-screen draw and presents it.
    fn draw(&mut self, program: ProgramId) -> Result<(), GridScanError>;

    /// Releases the program together with its uniform buffer and geometry state.
    fn release_program(&mut self, program: ProgramId);
}

/// The container the effect is mounted into.
pub trait SurfaceHost {
    type Device: GpuDevice;

    /// Current bounds in logical pixels.
    fn bounds(&self) -> (f64, f64);

    /// Ratio between physical and logical pixels.
    fn device_pixel_ratio(&self) -> f64;

    /// Creates a GPU context presenting into this container at the given physical size.
    fn create_device(&self, width: u32, height: u32) -> Result<Self::Device, GridScanError>;
}

/// The platform's per-frame timing primitive.
pub trait FrameTimer {
    /// Asks for one frame callback before the next repaint.
    fn request_frame(&mut self);

    /// Withdraws an outstanding request. Platforms that cannot retract a
    /// request rely on the scheduler ignoring the stale callback.
    fn cancel_frame(&mut self);
}
