use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use gridconfig::GridScanConfig;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::backend::{FrameTimer, SurfaceHost};
use crate::error::GridScanError;
use crate::gpu::WgpuDevice;
use crate::lifecycle::GridScan;
use crate::types::GpuPowerPreference;

const DEFAULT_TITLE: &str = "GridScan Preview";

/// What the preview window needs to host the effect.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub config: GridScanConfig,
    /// Initial window size in logical pixels.
    pub size: (u32, u32),
    pub gpu_power: GpuPowerPreference,
}

/// A winit window acting as the effect's container.
pub struct WindowHost {
    window: Arc<Window>,
    gpu_power: GpuPowerPreference,
}

impl WindowHost {
    pub fn new(window: Arc<Window>, gpu_power: GpuPowerPreference) -> Self {
        Self { window, gpu_power }
    }
}

impl SurfaceHost for WindowHost {
    type Device = WgpuDevice;

    fn bounds(&self) -> (f64, f64) {
        let size: LogicalSize<f64> = self.window.inner_size().to_logical(self.window.scale_factor());
        (size.width, size.height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn create_device(&self, width: u32, height: u32) -> Result<WgpuDevice, GridScanError> {
        WgpuDevice::new(self.window.clone(), width, height, self.gpu_power)
    }
}

/// Frame requests map onto `request_redraw`; winit cannot withdraw one, so a
/// cancelled request still delivers a redraw that the scheduler ignores.
pub struct RedrawTimer {
    window: Arc<Window>,
}

impl RedrawTimer {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl FrameTimer for RedrawTimer {
    fn request_frame(&mut self) {
        self.window.request_redraw();
    }

    fn cancel_frame(&mut self) {}
}

fn build_window(event_loop: &EventLoop<()>, options: &PreviewOptions) -> Result<Window> {
    let presentation = &options.config.presentation;
    let title = presentation
        .style
        .get("title")
        .map(String::as_str)
        .unwrap_or(DEFAULT_TITLE);
    let (width, height) = options.size;
    #[allow(unused_mut)]
    let mut builder = WindowBuilder::new()
        .with_title(title)
        .with_inner_size(LogicalSize::new(f64::from(width.max(1)), f64::from(height.max(1))));

    if let Some(class_name) = presentation.class_name.as_deref() {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            use winit::platform::wayland::WindowBuilderExtWayland;
            builder = WindowBuilderExtWayland::with_name(builder, class_name, class_name);
        }
        debug!(class_name, "applied presentation class name");
    }
    for (key, value) in presentation.style.iter().filter(|(key, _)| key.as_str() != "title") {
        debug!(key = %key, value = %value, "presentation style entry has no window equivalent");
    }

    builder
        .build(event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))
}

/// Opens a window, mounts the effect into it and runs until the window is
/// closed or Escape is pressed.
///
/// A failed mount leaves the window open and blank; the failure has already
/// been logged by the lifecycle.
pub fn run_preview(options: PreviewOptions) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = Arc::new(build_window(&event_loop, &options)?);

    let host = WindowHost::new(window.clone(), options.gpu_power);
    let timer = RedrawTimer::new(window.clone());
    let mut effect = GridScan::mount(&host, timer, &options.config, &[]);
    if let Some(err) = effect.failure() {
        warn!(error = %err, "preview window will stay blank");
    }

    let origin = Instant::now();
    event_loop
        .run(move |event, elwt| {
            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != window.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    effect.unmount();
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. }
                    if event.state == ElementState::Pressed
                        && event.logical_key == Key::Named(NamedKey::Escape) =>
                {
                    effect.unmount();
                    elwt.exit();
                }
                WindowEvent::Resized(size) => {
                    let scale = window.scale_factor();
                    let logical: LogicalSize<f64> = size.to_logical(scale);
                    effect.resize(logical.width, logical.height, scale);
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    let logical: LogicalSize<f64> = window.inner_size().to_logical(scale_factor);
                    effect.resize(logical.width, logical.height, scale_factor);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let logical = position.to_logical::<f64>(window.scale_factor());
                    effect.pointer_moved(logical.x, logical.y);
                }
                WindowEvent::CursorLeft { .. } => effect.pointer_left(),
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => {
                    effect.click();
                }
                WindowEvent::RedrawRequested => {
                    effect.frame(origin.elapsed());
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop terminated with an error: {err}"))?;

    info!("preview closed");
    Ok(())
}
