/*! Clock values.

[Instant] is a point in time and [Duration] a span between two of them,
both at microsecond resolution.

The daemon core never reads a clock. Every entry point takes the current
`Instant` from its caller, which lets simulations run on a synthetic clock;
only the binary calls [Instant::now].
*/

use core::{fmt, ops};

const MICROS_PER_MILLI: i64 = 1_000;
const MICROS_PER_SEC: i64 = 1_000_000;

/// A point in time, in microseconds since an arbitrary epoch such as
/// daemon startup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    micros: i64,
}

impl Instant {
    pub const ZERO: Instant = Instant { micros: 0 };

    pub const fn from_micros(micros: i64) -> Instant {
        Instant { micros }
    }

    pub fn from_millis<T: Into<i64>>(millis: T) -> Instant {
        Instant::from_micros(millis.into() * MICROS_PER_MILLI)
    }

    pub fn from_secs<T: Into<i64>>(secs: T) -> Instant {
        Instant::from_micros(secs.into() * MICROS_PER_SEC)
    }

    /// Read the monotonic clock. The epoch is the first call in the process.
    pub fn now() -> Instant {
        static EPOCH: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
        let epoch = *EPOCH.get_or_init(std::time::Instant::now);
        let elapsed = epoch.elapsed().as_micros().min(i64::MAX as u128);
        Instant::from_micros(elapsed as i64)
    }

    pub const fn total_micros(&self) -> i64 {
        self.micros
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let millis = self.micros.rem_euclid(MICROS_PER_SEC) / MICROS_PER_MILLI;
        write!(f, "{}.{:03}s", self.micros.div_euclid(MICROS_PER_SEC), millis)
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant::from_micros(self.micros.saturating_add(rhs.micros as i64))
    }
}

impl ops::AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

/// The distance between two instants, whichever comes first.
impl ops::Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        Duration::from_micros(self.micros.abs_diff(rhs.micros))
    }
}

/// A span of time. Never negative.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    micros: u64,
}

impl Duration {
    pub const ZERO: Duration = Duration { micros: 0 };

    pub const fn from_micros(micros: u64) -> Duration {
        Duration { micros }
    }

    pub const fn from_millis(millis: u64) -> Duration {
        Duration::from_micros(millis * MICROS_PER_MILLI as u64)
    }

    pub const fn from_secs(secs: u64) -> Duration {
        Duration::from_micros(secs * MICROS_PER_SEC as u64)
    }

    /// Whole seconds.
    pub const fn secs(&self) -> u64 {
        self.micros / MICROS_PER_SEC as u64
    }

    /// Milliseconds past the last whole second.
    pub const fn millis(&self) -> u64 {
        self.micros % MICROS_PER_SEC as u64 / MICROS_PER_MILLI as u64
    }

    pub const fn total_micros(&self) -> u64 {
        self.micros
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:03}s", self.secs(), self.millis())
    }
}

impl ops::Mul<u32> for Duration {
    type Output = Duration;

    fn mul(self, rhs: u32) -> Duration {
        Duration::from_micros(self.micros.saturating_mul(u64::from(rhs)))
    }
}

impl From<core::time::Duration> for Duration {
    fn from(other: core::time::Duration) -> Duration {
        Duration::from_micros(other.as_micros().min(u64::MAX as u128) as u64)
    }
}
