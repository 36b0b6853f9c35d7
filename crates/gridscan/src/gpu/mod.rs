//! wgpu implementation of [`GpuDevice`].
//!
//! - `context` owns instance/device/surface wiring and reconfigures the
//!   swapchain on resize.
//! - `pipeline` turns a [`ProgramSource`] into a render pipeline with a single
//!   uniform bind group and records the full-screen triangle pass.

mod context;
mod pipeline;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use winit::window::Window;

use crate::backend::{GpuDevice, ProgramId, ProgramSource};
use crate::error::GridScanError;
use crate::types::GpuPowerPreference;

use context::GpuContext;
use pipeline::GpuProgram;

pub struct WgpuDevice {
    context: GpuContext,
    programs: HashMap<ProgramId, GpuProgram>,
    next_program: u32,
    // declared last so the surface is dropped before the window it points at
    _window: Arc<Window>,
}

impl WgpuDevice {
    pub fn new(
        window: Arc<Window>,
        width: u32,
        height: u32,
        gpu_power: GpuPowerPreference,
    ) -> Result<Self, GridScanError> {
        // SAFETY: the window is kept alive in `_window` for as long as the context.
        let context = unsafe { GpuContext::new(window.as_ref(), width, height, gpu_power) }
            .map_err(|err| GridScanError::ContextUnavailable(format!("{err:#}")))?;
        Ok(Self {
            context,
            programs: HashMap::new(),
            next_program: 1,
            _window: window,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.context.config.width, self.context.config.height)
    }
}

impl GpuDevice for WgpuDevice {
    fn configure(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, GridScanError> {
        let program = GpuProgram::new(&self.context.device, self.context.format(), source)?;
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(id, program);
        Ok(id)
    }

    fn write_uniform(&mut self, program: ProgramId, offset: u32, bytes: &[u8]) {
        let Some(program) = self.programs.get(&program) else {
            warn!(program = program.0, "uniform write for unknown program");
            return;
        };
        self.context
            .queue
            .write_buffer(&program.uniform_buffer, u64::from(offset), bytes);
    }

    fn draw(&mut self, program: ProgramId) -> Result<(), GridScanError> {
        let Some(program) = self.programs.get(&program) else {
            return Err(GridScanError::ShaderLink(format!(
                "program {} was released",
                program.0
            )));
        };
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(GridScanError::OutOfMemory),
            Err(err) => {
                debug!(error = ?err, "failed to acquire surface texture");
                return Err(GridScanError::SurfaceLost);
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gridscan encoder"),
            });
        program.encode(&mut encoder, &view);
        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn release_program(&mut self, program: ProgramId) {
        if let Some(released) = self.programs.remove(&program) {
            released.uniform_buffer.destroy();
            debug!(program = program.0, "released GPU program");
        }
    }
}
