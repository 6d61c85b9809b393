use std::{cmp::Ordering, fmt, ops};

use serde::{Deserialize, Serialize};
use time::Duration;

/// Universal time, in seconds since the start of the game clock.
#[derive(Copy, Clone, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[repr(transparent)]
pub struct UT(f64);

impl UT {
    /// The instant after every other instant. Used as the end of a
    /// patch that never transitions.
    pub const NEVER: UT = UT(f64::INFINITY);

    pub const fn new_seconds(sec: f64) -> UT {
        UT(sec)
    }

    pub fn into_seconds(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// The later of two instants.
    #[must_use]
    pub fn max(self, other: UT) -> UT {
        UT(self.0.max(other.0))
    }

    /// Total ordering, placing NaN after everything else.
    pub fn total_cmp(&self, other: &UT) -> Ordering {
        self.0.total_cmp(&other.0)
    }

    /// Time remaining from `now` until this instant as a [`Duration`].
    /// `None` when either instant is not representable.
    pub fn until(self, now: UT) -> Option<Duration> {
        Duration::checked_seconds_f64(self.0 - now.0)
    }
}

impl ops::Sub<UT> for UT {
    type Output = f64;

    fn sub(self, rhs: UT) -> Self::Output {
        self.0 - rhs.0
    }
}

impl ops::Sub<f64> for UT {
    type Output = UT;

    fn sub(self, rhs: f64) -> Self::Output {
        UT(self.0 - rhs)
    }
}

impl ops::Add<f64> for UT {
    type Output = UT;

    fn add(self, rhs: f64) -> Self::Output {
        UT(self.0 + rhs)
    }
}

impl fmt::Display for UT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UT({}s)", self.0)
    }
}

impl fmt::Debug for UT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
