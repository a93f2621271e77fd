//! Frequency-independent alarm accumulator.
//!
//! The real-time-clock collaborator fires at whatever frequency it is
//! currently programmed to. Each tick advances every live process's
//! accumulator by `MAX_RTC_FREQ / frequency`, so the accumulator reaches
//! its ceiling after exactly [`ALARM_PERIOD_SECS`] of wall time no matter
//! how the frequency changes in between.

use crate::config::{ALARM_PERIOD_SECS, MAX_PROCESSES, MAX_RTC_FREQ};
use crate::process::table::Pid;

/// Accumulator ceiling: ticks-at-max-frequency per alarm period.
pub const ALARM_COUNTER_MAX: u32 = MAX_RTC_FREQ * ALARM_PERIOD_SECS;

/// Per-process alarm accumulators.
#[derive(Debug)]
pub struct AlarmClock {
    elapsed: [u32; MAX_PROCESSES],
}

impl AlarmClock {
    pub const fn new() -> Self {
        AlarmClock {
            elapsed: [0; MAX_PROCESSES],
        }
    }

    /// Restart the accumulator for a freshly spawned pid.
    pub fn reset(&mut self, pid: Pid) {
        self.elapsed[pid.index()] = 0;
    }

    /// Advance all accumulators by one clock tick at `frequency` Hz and
    /// invoke `fire` for every pid whose alarm period elapsed.
    pub fn on_tick(&mut self, frequency: u32, mut fire: impl FnMut(Pid)) {
        let step = MAX_RTC_FREQ / frequency.max(1);
        for (index, elapsed) in self.elapsed.iter_mut().enumerate() {
            *elapsed += step;
            if *elapsed >= ALARM_COUNTER_MAX {
                *elapsed = 0;
                fire(Pid::from_index(index));
            }
        }
    }
}

impl Default for AlarmClock {
    fn default() -> Self {
        Self::new()
    }
}
