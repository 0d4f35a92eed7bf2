//! Dual-rate cycle accounting.
//!
//! Every bus cycle advances a monotonic timestamp by one of two step sizes:
//! the FPI side runs at 2.8 MHz (`fast_step`), the Mega II side at 1.023 MHz
//! (`slow_step`). Slow RAM, the I/O window, and anything behind the speed
//! gate charge the slow step.

use serde::{Deserialize, Serialize};

/// Timestamp increments per bus cycle. The defaults put both clock domains
/// on a common grid (2.8 MHz : 1.023 MHz is close to 10 : 28).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSpec {
    pub fast_step: u32,
    pub slow_step: u32,
}

impl Default for ClockSpec {
    fn default() -> Self {
        Self {
            fast_step: 10,
            slow_step: 28,
        }
    }
}

impl ClockSpec {
    pub fn is_valid(&self) -> bool {
        self.fast_step > 0 && self.slow_step >= self.fast_step
    }
}

/// Monotonic machine clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    /// Timestamp in sub-cycle units
    pub ts: u64,
    pub spec: ClockSpec,
    /// When set, every access runs at the slow rate (the SPEED soft switch
    /// or the disk motor gate)
    pub slow_gate: bool,
}

impl Clock {
    pub fn new(spec: ClockSpec) -> Self {
        Self {
            ts: 0,
            spec,
            slow_gate: false,
        }
    }

    /// Charge one fast-side cycle; the speed gate can demote it.
    pub fn charge_fast(&mut self) {
        self.ts += if self.slow_gate {
            self.spec.slow_step as u64
        } else {
            self.spec.fast_step as u64
        };
    }

    /// Charge one Mega II cycle.
    pub fn charge_slow(&mut self) {
        self.ts += self.spec.slow_step as u64;
    }
}
