use std::time::Instant;

use crate::constants::net::MAX_DT;

/// Monotonic dt source for the simulation loops.
///
/// The delta is clamped so a stall (debugger, laptop lid) does not turn
/// into one giant physics step.
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Seconds since the previous tick, clamped to the frame cap
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt.min(MAX_DT)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
