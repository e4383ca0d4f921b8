use super::trickle::TrickleTimer;
use crate::rand::Rand;
use crate::time::{Duration, Instant};

/// A timer that fires every `interval` once started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicTimer {
    interval: Duration,
    expires_at: Option<Instant>,
}

impl PeriodicTimer {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            expires_at: None,
        }
    }

    /// Arm the timer; the first expiry is one interval after `now`.
    pub fn start(&mut self, now: Instant) {
        self.expires_at = Some(now + self.interval);
    }

    /// Return `true` and re-arm if the timer expired.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) if now >= at => {
                // Missed periods are not replayed.
                let mut next = at + self.interval;
                if next <= now {
                    next = now + self.interval;
                }
                self.expires_at = Some(next);
                true
            }
            _ => false,
        }
    }

    pub fn poll_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// A timer that fires at most once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OneShotTimer {
    expires_at: Option<Instant>,
}

impl OneShotTimer {
    pub fn arm(&mut self, at: Instant) {
        self.expires_at = Some(at);
    }

    /// Return `true` and disarm if the timer expired.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) if now >= at => {
                self.expires_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn poll_at(&self) -> Option<Instant> {
        self.expires_at
    }
}

/// The timer driving the DIO re-announcements of one DODAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DioTimer {
    /// Constant-period re-announcement.
    Fixed(PeriodicTimer),
    /// Adaptive suppression.
    Trickle {
        timer: TrickleTimer,
        started: bool,
    },
}

impl DioTimer {
    pub fn fixed(interval: Duration) -> Self {
        DioTimer::Fixed(PeriodicTimer::new(interval))
    }

    pub fn trickle() -> Self {
        DioTimer::Trickle {
            timer: TrickleTimer::default(),
            started: false,
        }
    }

    pub fn is_trickle(&self) -> bool {
        matches!(self, DioTimer::Trickle { .. })
    }

    /// Current interval between DIOs.
    pub fn interval(&self) -> Duration {
        match self {
            DioTimer::Fixed(timer) => timer.interval(),
            DioTimer::Trickle { timer, .. } => timer.interval(),
        }
    }

    pub(crate) fn start(&mut self, now: Instant, rand: &mut Rand) {
        match self {
            DioTimer::Fixed(timer) => timer.start(now),
            DioTimer::Trickle { timer, started } => {
                timer.start(now, rand);
                *started = true;
            }
        }
    }

    /// Return `true` if the DODAG's DIO is due.
    pub(crate) fn poll(&mut self, now: Instant, rand: &mut Rand) -> bool {
        match self {
            DioTimer::Fixed(timer) => timer.poll(now),
            DioTimer::Trickle { timer, started } => *started && timer.poll(now, rand),
        }
    }

    pub(crate) fn poll_at(&self) -> Option<Instant> {
        match self {
            DioTimer::Fixed(timer) => timer.poll_at(),
            DioTimer::Trickle { timer, started } => started.then(|| timer.poll_at()),
        }
    }

    pub(crate) fn hear_consistent(&mut self) {
        if let DioTimer::Trickle { timer, .. } = self {
            timer.hear_consistent();
        }
    }

    pub(crate) fn hear_inconsistent(&mut self, now: Instant, rand: &mut Rand) {
        if let DioTimer::Trickle { timer, started: true } = self {
            timer.hear_inconsistent(now, rand);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn periodic_first_fire_after_one_interval() {
        let mut timer = PeriodicTimer::new(Duration::from_secs(5));
        assert!(!timer.poll(Instant::from_secs(100)));

        timer.start(Instant::ZERO);
        assert_eq!(timer.poll_at(), Some(Instant::from_secs(5)));
        assert!(!timer.poll(Instant::from_secs(4)));
        assert!(timer.poll(Instant::from_secs(5)));
        assert_eq!(timer.poll_at(), Some(Instant::from_secs(10)));
    }

    #[test]
    fn periodic_skips_missed_periods() {
        let mut timer = PeriodicTimer::new(Duration::from_secs(5));
        timer.start(Instant::ZERO);
        assert!(timer.poll(Instant::from_secs(23)));
        assert_eq!(timer.poll_at(), Some(Instant::from_secs(28)));
    }

    #[test]
    fn one_shot_fires_once() {
        let mut timer = OneShotTimer::default();
        assert_eq!(timer.poll_at(), None);
        timer.arm(Instant::from_secs(1));
        assert!(!timer.poll(Instant::ZERO));
        assert!(timer.poll(Instant::from_secs(1)));
        assert!(!timer.poll(Instant::from_secs(2)));
        assert_eq!(timer.poll_at(), None);
    }

    #[test]
    fn unstarted_trickle_is_silent() {
        let mut rand = Rand::new(1);
        let mut timer = DioTimer::trickle();
        assert!(timer.is_trickle());
        assert_eq!(timer.poll_at(), None);
        assert!(!timer.poll(Instant::from_secs(100), &mut rand));
    }

    #[test]
    fn dio_interval() {
        let mut rand = Rand::new(1);
        let fixed = DioTimer::fixed(Duration::from_secs(5));
        assert_eq!(fixed.interval(), Duration::from_secs(5));

        let mut trickle = DioTimer::trickle();
        trickle.start(Instant::ZERO, &mut rand);
        let first = trickle.interval();
        assert!(trickle.poll(Instant::ZERO + first, &mut rand));
        assert_eq!(trickle.interval(), first * 2);
    }
}
