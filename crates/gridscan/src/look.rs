use std::time::Duration;

use gridconfig::InputOptions;

/// Rate (1/s) at which the camera eases toward its target.
const LOOK_SMOOTHING: f32 = 6.0;

/// Pointer-driven camera skew feeding `uLook`.
///
/// Pointer positions map to `[-1, 1]` on both axes scaled by sensitivity.
/// After `snap_back_delay` without input the target returns to centre.
#[derive(Debug, Clone)]
pub struct PointerLook {
    sensitivity: f32,
    snap_back_delay: f32,
    target: [f32; 2],
    current: [f32; 2],
    last_input: Option<f32>,
}

impl PointerLook {
    pub fn new(options: &InputOptions) -> Self {
        Self::with_parameters(options.sensitivity, options.snap_back_delay)
    }

    pub fn with_parameters(sensitivity: f32, snap_back_delay: Duration) -> Self {
        let sensitivity = if sensitivity.is_finite() {
            sensitivity.max(0.0)
        } else {
            0.0
        };
        Self {
            sensitivity,
            snap_back_delay: snap_back_delay.as_secs_f32(),
            target: [0.0; 2],
            current: [0.0; 2],
            last_input: None,
        }
    }

    /// Pointer at `(x, y)` inside a `width` x `height` area, in any consistent unit.
    pub fn pointer_moved(&mut self, x: f64, y: f64, width: f64, height: f64, now: f32) {
        if width <= 0.0 || height <= 0.0 || !x.is_finite() || !y.is_finite() {
            return;
        }
        let nx = ((x / width) * 2.0 - 1.0).clamp(-1.0, 1.0) as f32;
        // screen y grows downward; look up is positive
        let ny = (1.0 - (y / height) * 2.0).clamp(-1.0, 1.0) as f32;
        self.set_target([nx, ny], now);
    }

    /// Target in normalized `[-1, 1]` coordinates, e.g. from an external input source.
    pub fn set_target(&mut self, target: [f32; 2], now: f32) {
        self.target = [
            target[0].clamp(-1.0, 1.0) * self.sensitivity,
            target[1].clamp(-1.0, 1.0) * self.sensitivity,
        ];
        self.last_input = Some(now);
    }

    /// Pointer left the surface: return to centre without waiting for the delay.
    pub fn release(&mut self) {
        self.target = [0.0; 2];
        self.last_input = None;
    }

    /// Eases the camera toward its target and returns the value for `uLook`.
    pub fn advance(&mut self, now: f32, dt: f32) -> [f32; 2] {
        if let Some(last) = self.last_input {
            if now - last > self.snap_back_delay {
                self.target = [0.0; 2];
                self.last_input = None;
            }
        }
        let blend = 1.0 - (-LOOK_SMOOTHING * dt.max(0.0)).exp();
        for axis in 0..2 {
            self.current[axis] += (self.target[axis] - self.current[axis]) * blend;
            if self.current[axis].abs() < 1e-4 && self.target[axis] == 0.0 {
                self.current[axis] = 0.0;
            }
        }
        self.current
    }

    pub fn current(&self) -> [f32; 2] {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn look() -> PointerLook {
        PointerLook::with_parameters(0.5, Duration::from_millis(250))
    }

    #[test]
    fn centre_of_surface_is_neutral() {
        let mut look = look();
        look.pointer_moved(50.0, 50.0, 100.0, 100.0, 0.0);
        assert_eq!(look.advance(0.0, 1.0), [0.0, 0.0]);
    }

    #[test]
    fn corner_is_scaled_by_sensitivity() {
        let mut look = look();
        look.pointer_moved(100.0, 0.0, 100.0, 100.0, 0.0);
        let mut value = [0.0; 2];
        for step in 0..20 {
            value = look.advance(step as f32 * 0.01, 0.5);
        }
        assert!((value[0] - 0.5).abs() < 1e-3);
        assert!((value[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn snaps_back_after_inactivity() {
        let mut look = look();
        look.pointer_moved(0.0, 100.0, 100.0, 100.0, 1.0);
        look.advance(1.1, 1.0);
        assert!(look.current()[0] < 0.0);

        for step in 0..40 {
            look.advance(1.5 + step as f32 * 0.1, 0.5);
        }
        assert_eq!(look.current(), [0.0, 0.0]);
    }

    #[test]
    fn invalid_areas_are_ignored() {
        let mut look = look();
        look.pointer_moved(10.0, 10.0, 0.0, 100.0, 0.0);
        look.pointer_moved(f64::NAN, 10.0, 100.0, 100.0, 0.0);
        assert_eq!(look.advance(0.0, 1.0), [0.0, 0.0]);
    }
}
