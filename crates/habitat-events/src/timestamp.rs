//! Simulation Timestamp Types
//!
//! Simulation time is tracked both as a tick counter and as continuous world
//! seconds, since ticks may have variable length.
//!
//! # Example
//!
//! ```
//! use habitat_events::SimTime;
//!
//! let mut t = SimTime::start();
//! t.advance(0.5);
//! t.advance(0.25);
//! assert_eq!(t.tick, 2);
//! assert_eq!(t.to_string(), "tick_2@0.750s");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Number of completed ticks
    pub tick: u64,
    /// Elapsed world time in seconds
    pub seconds: f64,
}

impl SimTime {
    /// Creates a new timestamp.
    pub fn new(tick: u64, seconds: f64) -> Self {
        Self { tick, seconds }
    }

    /// The moment before the first tick.
    pub fn start() -> Self {
        Self::default()
    }

    /// Advances by one tick of `dt` seconds.
    ///
    /// Negative or non-finite `dt` still counts the tick but adds no time.
    pub fn advance(&mut self, dt: f32) {
        self.tick += 1;
        if dt.is_finite() && dt > 0.0 {
            self.seconds += f64::from(dt);
        }
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick_{}@{:.3}s", self.tick, self.seconds)
    }
}
