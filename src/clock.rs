// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Time source abstraction used for scheduling retransmissions.

use std::time::{Duration, Instant};

/// The number of [`Ticks`] per second: this engine measures time in
/// milliseconds.
pub const TICKS_PER_SECOND: u64 = 1000;

/// A monotonic timestamp, measured in milliseconds since an arbitrary
/// epoch fixed when a [`Clock`] implementation is constructed.
///
/// Only ever compared against other `Ticks` values produced by the same
/// `Clock`.
pub type Ticks = u64;

/// Converts a [`Duration`] into the equivalent number of [`Ticks`],
/// saturating rather than panicking on overflow.
pub fn ticks_from_duration(d: Duration) -> Ticks {
    d.as_millis() as Ticks
}

/// Converts a [`Ticks`] duration back into a [`Duration`].
pub fn duration_from_ticks(ticks: Ticks) -> Duration {
    Duration::from_millis(ticks)
}

/// Abstracts over the passage of time so that [`crate::Context`] doesn't
/// have to depend on `std::time::Instant` directly.
///
/// This mirrors the role the teacher crate's `futures_timer`-backed
/// scheduling plays for its async endpoints, but without the reactor: here
/// the *caller* of [`crate::reactor`] hooks is responsible for calling
/// `now()` and sleeping, so this trait only needs to answer "what time is
/// it", not "wake me up later".
pub trait Clock {
    /// Returns the current time as [`Ticks`] since this clock's epoch.
    fn now(&self) -> Ticks;
}

/// A [`Clock`] backed by [`std::time::Instant`], with its epoch fixed at
/// construction time.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Creates a new clock whose epoch is the current instant.
    pub fn new() -> SystemClock {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Ticks {
        ticks_from_duration(self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn duration_round_trips() {
        let d = Duration::from_millis(2345);
        assert_eq!(duration_from_ticks(ticks_from_duration(d)), d);
    }
}
