use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// Multiplicative variation applied to a computed amount.
pub trait MarketNoise: Send + Sync {
    fn factor(&self) -> Decimal;
}

/// Leaves amounts untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMarketNoise;

impl MarketNoise for NoMarketNoise {
    fn factor(&self) -> Decimal {
        Decimal::ONE
    }
}

/// Uniform variation in `[1 - spread, 1 + spread]` from a seedable generator.
pub struct SeededMarketNoise {
    spread: f64,
    rng: Mutex<StdRng>,
}

impl SeededMarketNoise {
    pub fn new(spread: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { spread: spread.abs(), rng: Mutex::new(rng) }
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }
}

impl MarketNoise for SeededMarketNoise {
    fn factor(&self) -> Decimal {
        let offset = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(-self.spread..=self.spread),
            Err(_) => 0.0,
        };
        Decimal::try_from(1.0 + offset).map(|factor| factor.round_dp(6)).unwrap_or(Decimal::ONE)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{MarketNoise, NoMarketNoise, SeededMarketNoise};

    #[test]
    fn no_noise_is_exactly_one() {
        assert_eq!(NoMarketNoise.factor(), Decimal::ONE);
    }

    #[test]
    fn seeded_noise_stays_within_spread() {
        let noise = SeededMarketNoise::new(0.03, Some(7));
        let low = Decimal::new(97, 2);
        let high = Decimal::new(103, 2);

        for _ in 0..500 {
            let factor = noise.factor();
            assert!(factor >= low && factor <= high, "factor {factor} outside ±3%");
        }
    }

    #[test]
    fn same_seed_replays_the_same_sequence() {
        let first = SeededMarketNoise::new(0.03, Some(42));
        let second = SeededMarketNoise::new(0.03, Some(42));

        let a: Vec<Decimal> = (0..10).map(|_| first.factor()).collect();
        let b: Vec<Decimal> = (0..10).map(|_| second.factor()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_spread_is_neutral() {
        let noise = SeededMarketNoise::new(0.0, Some(1));
        assert_eq!(noise.factor(), Decimal::ONE);
    }
}
