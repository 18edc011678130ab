//! Inter-page delay strategies.
//!
//! The driver pauses after every "next page" click. Production uses a
//! uniformly random pause to stay under the site's rate limits; tests
//! substitute `NoDelay` or a closure.

use std::time::Duration;

/// Blocks the calling thread between pages and reports how long it waited.
pub trait DelayStrategy {
    fn pause(&mut self) -> Duration;
}

/// Any `FnMut() -> Duration` is a delay strategy.
impl<F> DelayStrategy for F
where
    F: FnMut() -> Duration,
{
    fn pause(&mut self) -> Duration {
        self()
    }
}

/// Uniformly distributed sleep in `[min, max]`.
#[derive(Debug)]
pub struct RandomDelay {
    min: Duration,
    max: Duration,
    rng: fastrand::Rng,
}

impl RandomDelay {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            rng: fastrand::Rng::new(),
        }
    }

    /// Seeded variant for reproducible sampling.
    pub fn with_seed(min: Duration, max: Duration, seed: u64) -> Self {
        let mut delay = Self::new(min, max);
        delay.rng = fastrand::Rng::with_seed(seed);
        delay
    }

    /// Draw the next delay without sleeping.
    pub fn sample(&mut self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(self.rng.u64(min..=max))
    }
}

impl DelayStrategy for RandomDelay {
    fn pause(&mut self) -> Duration {
        let delay = self.sample();
        std::thread::sleep(delay);
        delay
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayStrategy for NoDelay {
    fn pause(&mut self) -> Duration {
        Duration::ZERO
    }
}
