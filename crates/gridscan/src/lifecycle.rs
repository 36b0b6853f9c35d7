use std::time::Duration;

use gridconfig::GridScanConfig;
use tracing::{debug, error, info};

use crate::backend::{FrameTimer, GpuDevice, SurfaceHost};
use crate::effects::{CapabilityProbe, EffectChain};
use crate::error::GridScanError;
use crate::look::PointerLook;
use crate::program::{ShaderProgram, FRAGMENT_SHADER, VERTEX_SHADER};
use crate::scan::{ScanScheduler, ScanTable};
use crate::scheduler::{FrameScheduler, FrameTick};
use crate::surface::{RenderSurface, SurfaceMetrics};
use crate::uniforms::{UniformId, UniformState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unmounted,
    Initializing,
    Running,
    Disposing,
}

/// Everything that exists only while the effect is running.
struct Mounted<D: GpuDevice> {
    surface: RenderSurface<D>,
    program: ShaderProgram,
    uniforms: UniformState,
    scans: ScanTable,
    scan_scheduler: ScanScheduler,
    look: PointerLook,
    effects: EffectChain,
    scan_on_click: bool,
    now: f32,
}

impl<D: GpuDevice> Mounted<D> {
    fn initialise<H>(
        host: &H,
        config: &GridScanConfig,
        probes: &[&dyn CapabilityProbe],
    ) -> Result<Self, GridScanError>
    where
        H: SurfaceHost<Device = D>,
    {
        let mut surface = RenderSurface::create(host)?;
        let effects = EffectChain::probe(config, probes);
        let metrics = surface.metrics();

        let Some(device) = surface.device_mut() else {
            return Err(GridScanError::ContextUnavailable(
                "surface has no device".to_string(),
            ));
        };
        let mut program = ShaderProgram::compile(device, VERTEX_SHADER, FRAGMENT_SHADER)?;
        if let Err(err) = program.bind(&UniformId::ALL) {
            program.dispose(device);
            return Err(err);
        }

        let mut uniforms = UniformState::from_config(&config.grid);
        uniforms.set_post_enabled(config.grid.enable_post && effects.has_post());
        uniforms.on_resize(
            metrics.logical_width,
            metrics.logical_height,
            metrics.pixel_ratio,
        );
        let written = program.upload(device, &mut uniforms);
        debug!(written, "uploaded initial uniforms");

        Ok(Self {
            surface,
            program,
            uniforms,
            scans: ScanTable::new(),
            scan_scheduler: ScanScheduler::from_config(&config.grid),
            look: PointerLook::new(&config.input),
            effects,
            scan_on_click: config.input.scan_on_click,
            now: 0.0,
        })
    }

    fn render(&mut self, tick: &FrameTick) -> Result<(), GridScanError> {
        self.now = tick.elapsed;
        if self.scan_scheduler.advance(&mut self.scans, tick.elapsed) {
            self.uniforms.set_scans(&self.scans);
        }
        self.uniforms.tick(tick.elapsed);
        if let Some(target) = self.effects.sample_input() {
            self.look.set_target(target, tick.elapsed);
        }
        let look = self.look.advance(tick.elapsed, tick.dt.as_secs_f32());
        self.uniforms.set_look(look);

        let Some(program) = self.program.id() else {
            return Err(GridScanError::ShaderLink("program was released".to_string()));
        };
        let Some(device) = self.surface.device_mut() else {
            return Err(GridScanError::ContextUnavailable(
                "surface was disposed".to_string(),
            ));
        };
        self.program.upload(device, &mut self.uniforms);
        device.draw(program)?;
        self.effects.after_draw(tick, self.surface.metrics());
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(device) = self.surface.device_mut() {
            self.program.dispose(device);
        }
        self.surface.dispose();
    }
}

/// A mounted grid-scan effect.
///
/// Mounting never fails from the host's point of view: any error during
/// initialisation is logged once and leaves the effect `Unmounted`, drawing
/// nothing.
pub struct GridScan<D: GpuDevice, T: FrameTimer> {
    state: LifecycleState,
    history: Vec<LifecycleState>,
    scheduler: FrameScheduler<T>,
    mounted: Option<Mounted<D>>,
    failure: Option<GridScanError>,
}

impl<D: GpuDevice, T: FrameTimer> GridScan<D, T> {
    pub fn mount<H>(
        host: &H,
        timer: T,
        config: &GridScanConfig,
        probes: &[&dyn CapabilityProbe],
    ) -> Self
    where
        H: SurfaceHost<Device = D>,
    {
        let mut effect = Self {
            state: LifecycleState::Unmounted,
            history: vec![LifecycleState::Unmounted],
            scheduler: FrameScheduler::new(timer),
            mounted: None,
            failure: None,
        };

        effect.transition(LifecycleState::Initializing);
        match Mounted::initialise(host, config, probes) {
            Ok(mounted) => {
                let metrics = mounted.surface.metrics();
                effect.mounted = Some(mounted);
                effect.scheduler.start();
                effect.transition(LifecycleState::Running);
                info!(
                    width = metrics.width,
                    height = metrics.height,
                    pixel_ratio = metrics.pixel_ratio,
                    "grid-scan effect running"
                );
            }
            Err(err) => {
                error!(error = %err, "grid-scan effect disabled");
                effect.failure = Some(err);
                effect.transition(LifecycleState::Unmounted);
            }
        }
        effect
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Every state the effect has passed through, oldest first.
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// The error that stopped initialisation or tore the effect down.
    pub fn failure(&self) -> Option<&GridScanError> {
        self.failure.as_ref()
    }

    pub fn uniforms(&self) -> Option<&UniformState> {
        self.mounted.as_ref().map(|mounted| &mounted.uniforms)
    }

    pub fn metrics(&self) -> Option<SurfaceMetrics> {
        self.mounted.as_ref().map(|mounted| mounted.surface.metrics())
    }

    pub fn scans(&self) -> Option<&ScanTable> {
        self.mounted.as_ref().map(|mounted| &mounted.scans)
    }

    pub fn timer(&self) -> &T {
        self.scheduler.timer()
    }

    /// Frame callback from the host timer. Returns true when a frame was drawn.
    pub fn frame(&mut self, timestamp: Duration) -> bool {
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        let Some(result) = self.scheduler.fire(timestamp, |tick| mounted.render(&tick)) else {
            return false;
        };
        match result {
            Ok(()) => true,
            Err(GridScanError::SurfaceLost) => {
                debug!("surface lost; reconfiguring and skipping frame");
                mounted.surface.reconfigure();
                false
            }
            Err(err) if !err.is_fatal() => {
                debug!(error = %err, "skipping frame");
                false
            }
            Err(err) => {
                error!(error = %err, "grid-scan effect stopped");
                self.failure = Some(err);
                self.unmount();
                false
            }
        }
    }

    /// Applies new logical bounds to the surface and then the resolution
    /// uniform. Returns true when the drawable size changed.
    pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) -> bool {
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        match mounted.surface.resize(width, height, pixel_ratio) {
            Ok(true) => {
                let metrics = mounted.surface.metrics();
                mounted.uniforms.on_resize(
                    metrics.logical_width,
                    metrics.logical_height,
                    metrics.pixel_ratio,
                );
                debug!(
                    width = metrics.width,
                    height = metrics.height,
                    pixel_ratio = metrics.pixel_ratio,
                    "resized"
                );
                true
            }
            Ok(false) => false,
            Err(err) => {
                debug!(error = %err, "keeping previous surface size");
                false
            }
        }
    }

    /// Pointer position in logical pixels relative to the surface.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        let metrics = mounted.surface.metrics();
        mounted.look.pointer_moved(
            x,
            y,
            f64::from(metrics.logical_width),
            f64::from(metrics.logical_height),
            mounted.now,
        );
    }

    pub fn pointer_left(&mut self) {
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.look.release();
        }
    }

    /// Starts an extra scan band when click-to-scan is enabled. Returns true
    /// when a band was scheduled.
    pub fn click(&mut self) -> bool {
        let Some(mounted) = self.mounted.as_mut() else {
            return false;
        };
        if !mounted.scan_on_click {
            return false;
        }
        let request = mounted.scan_scheduler.on_demand();
        match mounted.scans.schedule(mounted.now, request) {
            Ok(slot) => {
                mounted.uniforms.set_scans(&mounted.scans);
                debug!(slot, now = mounted.now, "scheduled scan on click");
                true
            }
            Err(err) => {
                debug!(error = %err, "click ignored");
                false
            }
        }
    }

    /// Stops frame delivery, then releases the program, then the surface.
    /// Safe to call in any state.
    pub fn unmount(&mut self) {
        let Some(mut mounted) = self.mounted.take() else {
            return;
        };
        self.transition(LifecycleState::Disposing);
        self.scheduler.stop();
        mounted.teardown();
        drop(mounted);
        self.transition(LifecycleState::Unmounted);
        info!("grid-scan effect unmounted");
    }

    fn transition(&mut self, next: LifecycleState) {
        debug!(from = ?self.state, to = ?next, "lifecycle transition");
        self.state = next;
        self.history.push(next);
    }
}

impl<D: GpuDevice, T: FrameTimer> Drop for GridScan<D, T> {
    fn drop(&mut self) {
        self.unmount();
    }
}
