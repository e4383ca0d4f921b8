//! The Trickle algorithm ([RFC 6206]) for adaptive DIO suppression.
//!
//! [RFC 6206]: https://datatracker.ietf.org/doc/html/rfc6206

use super::consts;
use crate::rand::Rand;
use crate::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrickleTimer {
    i_min: Duration,
    i_max: Duration,
    k: usize,

    i: Duration,
    t_expiration: Option<Instant>,
    i_expiration: Instant,
    counter: usize,
}

impl Default for TrickleTimer {
    fn default() -> Self {
        Self::new(
            consts::DEFAULT_DIO_INTERVAL_MIN as u32,
            consts::DEFAULT_DIO_INTERVAL_DOUBLINGS as u32,
            consts::DEFAULT_DIO_REDUNDANCY_CONSTANT as usize,
        )
    }
}

impl TrickleTimer {
    /// Create a Trickle timer with a minimum interval of `2^i_min` ms that
    /// may double `doublings` times, suppressing transmission after `k`
    /// consistent messages per interval.
    pub(crate) fn new(i_min: u32, doublings: u32, k: usize) -> Self {
        let i_min = Duration::from_millis(1 << i_min);
        Self {
            i_min,
            i_max: i_min * (1 << doublings),
            k,
            i: i_min,
            t_expiration: None,
            i_expiration: Instant::ZERO,
            counter: 0,
        }
    }

    /// Begin the first interval at `now`.
    ///
    /// RFC 6206 picks the first I in [Imin, Imax]; starting at Imin lets a
    /// fresh network converge faster.
    pub(crate) fn start(&mut self, now: Instant, rand: &mut Rand) {
        self.reset(self.i_min, now, rand);
    }

    /// Return `true` if a DIO should be sent now.
    pub(crate) fn poll(&mut self, now: Instant, rand: &mut Rand) -> bool {
        let mut transmit = false;
        if let Some(t) = self.t_expiration {
            if now >= t {
                transmit = self.k == 0 || self.counter < self.k;
                self.t_expiration = None;
            }
        }

        if now >= self.i_expiration {
            let i = (self.i * 2).min(self.i_max);
            self.reset(i, now, rand);
        }

        transmit
    }

    pub(crate) fn poll_at(&self) -> Instant {
        match self.t_expiration {
            Some(t) => t.min(self.i_expiration),
            None => self.i_expiration,
        }
    }

    /// A consistent DIO was heard.
    pub(crate) fn hear_consistent(&mut self) {
        self.counter += 1;
    }

    /// An inconsistent DIO was heard; fall back to the minimum interval.
    pub(crate) fn hear_inconsistent(&mut self, now: Instant, rand: &mut Rand) {
        if self.i > self.i_min {
            self.reset(self.i_min, now, rand);
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.i
    }

    fn reset(&mut self, i: Duration, now: Instant, rand: &mut Rand) {
        self.i = i;
        self.i_expiration = now + i;
        self.counter = 0;

        // t is drawn from [I/2, I).
        let half = i.total_micros() / 2;
        let jitter = rand.rand_u32() as u64 % (i.total_micros() - half).max(1);
        self.t_expiration = Some(now + Duration::from_micros(half + jitter));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interval_doubles_up_to_max() {
        let mut rand = Rand::new(1);
        let mut trickle = TrickleTimer::new(10, 2, 1);
        trickle.start(Instant::ZERO, &mut rand);
        assert_eq!(trickle.interval(), Duration::from_millis(1024));

        let mut now = Instant::ZERO;
        let mut sent = 0;
        for _ in 0..10_000 {
            now += Duration::from_millis(1);
            if trickle.poll(now, &mut rand) {
                sent += 1;
            }
        }

        assert_eq!(trickle.interval(), Duration::from_millis(4096));
        assert!(sent >= 3);
    }

    #[test]
    fn transmission_within_first_interval() {
        let mut rand = Rand::new(7);
        let mut trickle = TrickleTimer::new(10, 2, 1);
        trickle.start(Instant::ZERO, &mut rand);

        let at = trickle.poll_at();
        assert!(at >= Instant::from_millis(512));
        assert!(at < Instant::from_millis(1024));
        assert!(trickle.poll(at, &mut rand));
    }

    #[test]
    fn suppressed_when_consistent() {
        let mut rand = Rand::new(3);
        let mut trickle = TrickleTimer::new(10, 2, 1);
        trickle.start(Instant::ZERO, &mut rand);
        trickle.hear_consistent();

        let at = trickle.poll_at();
        assert!(!trickle.poll(at, &mut rand));
    }

    #[test]
    fn inconsistency_resets_interval() {
        let mut rand = Rand::new(5);
        let mut trickle = TrickleTimer::new(10, 2, 1);
        trickle.start(Instant::ZERO, &mut rand);
        trickle.poll(Instant::from_millis(1024), &mut rand);
        assert_eq!(trickle.interval(), Duration::from_millis(2048));

        trickle.hear_inconsistent(Instant::from_millis(1500), &mut rand);
        assert_eq!(trickle.interval(), Duration::from_millis(1024));
    }
}
