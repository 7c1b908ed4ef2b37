//! The one place generation touches randomness.

use rand::rngs::ThreadRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Source of the random draws behind every generated value.
///
/// Generation code only ever draws through this trait so tests can supply a
/// scripted source.
pub trait DrawSource {
    /// Draw from a normal distribution. Degenerate parameters yield `mean`.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64;

    /// Draw uniformly from `[low, high]`. Returns `low` when the range is empty.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// [`DrawSource`] backed by any [`rand::Rng`].
#[derive(Debug, Clone)]
pub struct RngDraw<R> {
    rng: R,
}

impl<R: Rng> RngDraw<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DrawSource for RngDraw<R> {
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if !(low < high) {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Draw source over the calling thread's generator.
pub fn thread_draw() -> RngDraw<ThreadRng> {
    RngDraw::new(rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_uniform_stays_in_range() {
        let mut draw = RngDraw::new(StdRng::seed_from_u64(7));
        for _ in 0..1000 {
            let v = draw.uniform(0.1, 1.0);
            assert!((0.1..=1.0).contains(&v));
        }
        assert_eq!(draw.uniform(3.0, 3.0), 3.0);
    }

    #[test]
    fn test_degenerate_normal_returns_mean() {
        let mut draw = thread_draw();
        assert_eq!(draw.normal(5.0, -1.0), 5.0);
        assert_eq!(draw.normal(5.0, f64::NAN), 5.0);
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let mut a = RngDraw::new(StdRng::seed_from_u64(42));
        let mut b = RngDraw::new(StdRng::seed_from_u64(42));
        assert_eq!(a.normal(10.0, 2.0), b.normal(10.0, 2.0));
    }
}
