//! Optional capabilities probed once when the effect mounts.
//!
//! Post-processing and external input are not implemented here; callers
//! supply [`CapabilityProbe`]s that may hand back an implementation. A probe
//! that declines leaves that feature inert, and an empty [`EffectChain`] is
//! the normal state.

use std::fmt;

use gridconfig::GridScanConfig;
use tracing::debug;

use crate::scheduler::FrameTick;
use crate::surface::SurfaceMetrics;

/// A pass that runs after the grid has been drawn each frame.
pub trait PostPass {
    fn after_draw(&mut self, tick: &FrameTick, metrics: SurfaceMetrics);
}

/// External source of camera look, e.g. a tracker.
pub trait InputSource {
    /// Latest look target in `[-1, 1]`, or `None` when nothing new arrived.
    fn sample(&mut self) -> Option<[f32; 2]>;
}

/// A loaded capability.
pub enum Effect {
    Bloom(Box<dyn PostPass>),
    ChromaticAberration(Box<dyn PostPass>),
    InputDriven(Box<dyn InputSource>),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Bloom(_) => f.write_str("Bloom"),
            Effect::ChromaticAberration(_) => f.write_str("ChromaticAberration"),
            Effect::InputDriven(_) => f.write_str("InputDriven"),
        }
    }
}

/// What the effect asks a probe for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapabilityRequest {
    Bloom { intensity: f32 },
    ChromaticAberration { offset: f32 },
    Input { sensitivity: f32 },
}

pub trait CapabilityProbe {
    /// Returns an implementation for `request`, or `None` when unavailable.
    fn try_load(&self, request: &CapabilityRequest) -> Option<Effect>;
}

/// Capabilities that actually loaded for one mount.
#[derive(Default)]
pub struct EffectChain {
    post: Vec<Box<dyn PostPass>>,
    input: Option<Box<dyn InputSource>>,
}

impl EffectChain {
    pub fn none() -> Self {
        Self::default()
    }

    /// Requests derived from the config; disabled or zero-intensity features
    /// are not requested at all.
    pub fn requests(config: &GridScanConfig) -> Vec<CapabilityRequest> {
        let mut requests = Vec::new();
        if config.grid.enable_post {
            if config.post.bloom_intensity > 0.0 {
                requests.push(CapabilityRequest::Bloom {
                    intensity: config.post.bloom_intensity,
                });
            }
            if config.post.chromatic_aberration > 0.0 {
                requests.push(CapabilityRequest::ChromaticAberration {
                    offset: config.post.chromatic_aberration,
                });
            }
        }
        if config.input.enable_input {
            requests.push(CapabilityRequest::Input {
                sensitivity: config.input.sensitivity,
            });
        }
        requests
    }

    /// Offers each request to the probes in order; the first one that answers wins.
    pub fn probe(config: &GridScanConfig, probes: &[&dyn CapabilityProbe]) -> Self {
        let mut chain = Self::none();
        for request in Self::requests(config) {
            match probes.iter().find_map(|probe| probe.try_load(&request)) {
                Some(effect) => {
                    debug!(?request, ?effect, "optional capability loaded");
                    chain.push(effect);
                }
                None => debug!(?request, "optional capability unavailable; feature inert"),
            }
        }
        chain
    }

    pub fn push(&mut self, effect: Effect) {
        match effect {
            Effect::Bloom(pass) | Effect::ChromaticAberration(pass) => self.post.push(pass),
            Effect::InputDriven(source) => self.input = Some(source),
        }
    }

    pub fn has_post(&self) -> bool {
        !self.post.is_empty()
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_post() && !self.has_input()
    }

    pub fn sample_input(&mut self) -> Option<[f32; 2]> {
        self.input.as_mut().and_then(|source| source.sample())
    }

    pub fn after_draw(&mut self, tick: &FrameTick, metrics: SurfaceMetrics) {
        for pass in &mut self.post {
            pass.after_draw(tick, metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct NoopPass;

    impl PostPass for NoopPass {
        fn after_draw(&mut self, _tick: &FrameTick, _metrics: SurfaceMetrics) {}
    }

    #[derive(Default)]
    struct BloomOnly {
        asked: Cell<usize>,
    }

    impl CapabilityProbe for BloomOnly {
        fn try_load(&self, request: &CapabilityRequest) -> Option<Effect> {
            self.asked.set(self.asked.get() + 1);
            match request {
                CapabilityRequest::Bloom { .. } => Some(Effect::Bloom(Box::new(NoopPass))),
                _ => None,
            }
        }
    }

    #[test]
    fn default_config_requests_post_only() {
        let requests = EffectChain::requests(&GridScanConfig::default());
        assert_eq!(
            requests,
            vec![
                CapabilityRequest::Bloom { intensity: 1.0 },
                CapabilityRequest::ChromaticAberration { offset: 0.002 },
            ]
        );
    }

    #[test]
    fn disabled_post_is_never_requested() {
        let mut config = GridScanConfig::default();
        config.grid.enable_post = false;
        config.input.enable_input = true;
        let probe = BloomOnly::default();
        let chain = EffectChain::probe(&config, &[&probe]);
        assert_eq!(probe.asked.get(), 1);
        assert!(chain.is_empty());
    }

    #[test]
    fn missing_capabilities_leave_an_empty_chain() {
        let chain = EffectChain::probe(&GridScanConfig::default(), &[]);
        assert!(chain.is_empty());
        assert!(!chain.has_post());
    }

    #[test]
    fn first_answering_probe_wins() {
        let probe = BloomOnly::default();
        let chain = EffectChain::probe(&GridScanConfig::default(), &[&probe]);
        assert!(chain.has_post());
        assert!(!chain.has_input());
        assert_eq!(probe.asked.get(), 2);
    }
}
