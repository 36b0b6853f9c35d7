//! Fixed-capacity table of scan bands plus the scheduler that feeds it.
//!
//! The shader reads `uScanStarts[0..uScanCount)`, so active events always
//! occupy a dense prefix of the table.

use gridconfig::{RenderConfig, ScanDirection, ScanMode};
use tracing::debug;

use crate::uniforms::MIN_SCAN_DURATION;

/// Number of bands the shader can composite at once.
pub const SCAN_SLOTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("scan table is full ({SCAN_SLOTS} active bands)")]
pub struct ScanTableFull;

/// One scheduled band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanEvent {
    /// Shader time (seconds) at which the band starts travelling.
    pub start: f32,
    pub duration: f32,
    /// Travel from far to near instead of near to far.
    pub reverse: bool,
}

impl ScanEvent {
    pub fn is_finished(&self, now: f32) -> bool {
        now - self.start > self.duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanRequest {
    pub direction: ScanDirection,
    pub duration: f32,
    pub delay: f32,
}

impl ScanRequest {
    pub fn new(direction: ScanDirection, duration: f32, delay: f32) -> Self {
        Self {
            direction,
            duration,
            delay,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanTable {
    slots: [Option<ScanEvent>; SCAN_SLOTS],
    active: usize,
}

impl ScanTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn is_full(&self) -> bool {
        self.active == SCAN_SLOTS
    }

    /// Active events in slot order.
    pub fn active(&self) -> Vec<ScanEvent> {
        self.slots[..self.active].iter().flatten().copied().collect()
    }

    pub fn get(&self, slot: usize) -> Option<ScanEvent> {
        self.slots.get(slot).copied().flatten()
    }

    /// Reserves the next free slot for a band starting `request.delay`
    /// seconds after `now`. `Pingpong` travels forward here; callers that
    /// want alternation pick the direction per request.
    pub fn schedule(&mut self, now: f32, request: ScanRequest) -> Result<usize, ScanTableFull> {
        if self.is_full() {
            return Err(ScanTableFull);
        }
        let slot = self.active;
        self.slots[slot] = Some(ScanEvent {
            start: now + request.delay.max(0.0),
            duration: request.duration.max(MIN_SCAN_DURATION),
            reverse: matches!(request.direction, ScanDirection::Backward),
        });
        self.active += 1;
        Ok(slot)
    }

    /// Frees `slot`, moving the last active event into the hole.
    pub fn retire(&mut self, slot: usize) -> Option<ScanEvent> {
        if slot >= self.active {
            return None;
        }
        let last = self.active - 1;
        let retired = self.slots[slot].take();
        if slot != last {
            self.slots[slot] = self.slots[last].take();
        }
        self.active = last;
        retired
    }

    /// Retires every band whose sweep has completed; returns how many went.
    pub fn retire_expired(&mut self, now: f32) -> usize {
        let mut retired = 0;
        let mut slot = 0;
        while slot < self.active {
            match self.slots[slot] {
                Some(event) if event.is_finished(now) => {
                    self.retire(slot);
                    retired += 1;
                }
                _ => slot += 1,
            }
        }
        retired
    }

    pub fn clear(&mut self) {
        self.slots = [None; SCAN_SLOTS];
        self.active = 0;
    }
}

/// Fills the scan table from the configured timing when `scan_mode` is periodic.
#[derive(Debug, Clone)]
pub struct ScanScheduler {
    mode: ScanMode,
    direction: ScanDirection,
    duration: f32,
    delay: f32,
    next_start: f32,
    sweeps: u64,
}

impl ScanScheduler {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            mode: config.scan_mode,
            direction: config.scan_direction,
            duration: config.scan_duration.as_secs_f32().max(MIN_SCAN_DURATION),
            delay: config.scan_delay.as_secs_f32(),
            next_start: 0.0,
            sweeps: 0,
        }
    }

    /// Request for a band fired on demand (click-to-scan), starting immediately.
    pub fn on_demand(&self) -> ScanRequest {
        let direction = match self.direction {
            ScanDirection::Pingpong => ScanDirection::Forward,
            other => other,
        };
        ScanRequest::new(direction, self.duration, 0.0)
    }

    /// Retires finished bands and, in periodic mode, starts the next sweep
    /// once its slot in the cycle arrives. Returns true if the table changed.
    pub fn advance(&mut self, table: &mut ScanTable, now: f32) -> bool {
        let mut changed = table.retire_expired(now) > 0;
        if self.mode != ScanMode::Periodic || now < self.next_start {
            return changed;
        }

        let direction = match self.direction {
            ScanDirection::Pingpong if self.sweeps % 2 == 1 => ScanDirection::Backward,
            ScanDirection::Pingpong => ScanDirection::Forward,
            other => other,
        };
        match table.schedule(now, ScanRequest::new(direction, self.duration, 0.0)) {
            Ok(slot) => {
                self.sweeps += 1;
                self.next_start = now + self.duration + self.delay;
                changed = true;
                debug!(slot, now, ?direction, "scheduled periodic scan");
            }
            Err(ScanTableFull) => {
                debug!(now, "scan table full; retrying next frame");
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn forward(duration: f32) -> ScanRequest {
        ScanRequest::new(ScanDirection::Forward, duration, 0.0)
    }

    #[test]
    fn schedule_fills_dense_prefix_until_full() {
        let mut table = ScanTable::new();
        for expected in 0..SCAN_SLOTS {
            assert_eq!(table.schedule(0.0, forward(1.0)), Ok(expected));
        }
        assert!(table.is_full());
        assert_eq!(table.schedule(0.0, forward(1.0)), Err(ScanTableFull));
        assert_eq!(table.active_count(), SCAN_SLOTS);
    }

    #[test]
    fn delay_offsets_start_and_direction_sets_reverse() {
        let mut table = ScanTable::new();
        table
            .schedule(3.0, ScanRequest::new(ScanDirection::Backward, 2.0, 0.5))
            .unwrap();
        let event = table.get(0).unwrap();
        assert_eq!(event.start, 3.5);
        assert!(event.reverse);
    }

    #[test]
    fn retire_compacts_by_moving_last_slot() {
        let mut table = ScanTable::new();
        for start in [0.0, 1.0, 2.0] {
            table.schedule(start, forward(1.0)).unwrap();
        }
        let retired = table.retire(0).unwrap();
        assert_eq!(retired.start, 0.0);
        assert_eq!(table.active_count(), 2);
        let starts: Vec<f32> = table.active().iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![2.0, 1.0]);
        assert_eq!(table.retire(5), None);
    }

    #[test]
    fn retire_expired_only_drops_completed_sweeps() {
        let mut table = ScanTable::new();
        table.schedule(0.0, forward(1.0)).unwrap();
        table.schedule(0.5, forward(1.0)).unwrap();
        table.schedule(0.9, forward(1.0)).unwrap();

        assert_eq!(table.retire_expired(1.0), 0);
        assert_eq!(table.retire_expired(1.6), 2);
        assert_eq!(table.active_count(), 1);
        assert_eq!(table.get(0).unwrap().start, 0.9);
    }

    fn config(mode: ScanMode, direction: ScanDirection) -> RenderConfig {
        RenderConfig {
            scan_mode: mode,
            scan_direction: direction,
            scan_duration: Duration::from_secs(1),
            scan_delay: Duration::from_millis(500),
            ..RenderConfig::default()
        }
    }

    #[test]
    fn inert_mode_never_fills_the_table() {
        let mut scheduler = ScanScheduler::from_config(&config(ScanMode::Inert, ScanDirection::Forward));
        let mut table = ScanTable::new();
        for frame in 0..600 {
            scheduler.advance(&mut table, frame as f32 / 60.0);
        }
        assert_eq!(table.active_count(), 0);
    }

    #[test]
    fn periodic_mode_schedules_one_sweep_per_cycle() {
        let mut scheduler =
            ScanScheduler::from_config(&config(ScanMode::Periodic, ScanDirection::Pingpong));
        let mut table = ScanTable::new();

        assert!(scheduler.advance(&mut table, 0.0));
        assert_eq!(table.active_count(), 1);
        assert!(!table.get(0).unwrap().reverse);

        assert!(!scheduler.advance(&mut table, 1.0));
        assert_eq!(table.active_count(), 1);

        // first sweep retires at 1.0+, second starts at 1.5
        assert!(scheduler.advance(&mut table, 1.2));
        assert_eq!(table.active_count(), 0);
        assert!(scheduler.advance(&mut table, 1.5));
        assert_eq!(table.active_count(), 1);
        assert!(table.get(0).unwrap().reverse);
    }

    #[test]
    fn periodic_mode_never_exceeds_capacity() {
        let mut scheduler = ScanScheduler::from_config(&RenderConfig {
            scan_mode: ScanMode::Periodic,
            scan_duration: Duration::from_secs(100),
            scan_delay: Duration::ZERO,
            ..RenderConfig::default()
        });
        let mut table = ScanTable::new();
        // duration+delay spacing means only one sweep per 100s; jump time forward
        for step in 0..20 {
            scheduler.advance(&mut table, step as f32 * 100.0 + 0.5 * (step as f32));
            assert!(table.active_count() <= SCAN_SLOTS);
        }
    }

    #[test]
    fn on_demand_requests_start_immediately() {
        let scheduler =
            ScanScheduler::from_config(&config(ScanMode::Inert, ScanDirection::Pingpong));
        let request = scheduler.on_demand();
        assert_eq!(request.delay, 0.0);
        assert_eq!(request.direction, ScanDirection::Forward);
        assert_eq!(request.duration, 1.0);
    }
}
