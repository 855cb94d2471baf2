//! Kelly Criterion Bet Sizing
//!
//! The Kelly criterion formula:
//!     f* = (b*p - q) / b
//!
//! Where:
//!     f* = fraction of bankroll to bet
//!     b = odds - 1 (net odds)
//!     p = probability of winning
//!     q = 1 - p (probability of losing)
//!     odds = decimal odds (e.g., 2.5 returns 2.5x the stake including it)
//!
//! A winning bet pays `stake * b` net of the stake; a losing bet costs `stake`.

use serde::{Deserialize, Serialize};

/// Bet sizing recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetSizing {
    pub probability: f64,
    pub odds: f64,
    pub expected_value: f64,
    pub edge: f64,                 // EV - 1
    pub kelly_fraction: f64,       // Full Kelly
    pub recommended_fraction: f64, // After applying Kelly multiplier
    pub stake: f64,
}

/// Calculate Kelly fraction for a single bet
///
/// Returns 0.0 when the net odds are not positive (even money or worse), so the
/// caller never divides by zero. The result can be negative when EV < 1.
///
/// # Examples
/// ```
/// use fixture_sim::core::kelly::calculate_kelly_fraction;
/// let kelly = calculate_kelly_fraction(0.6, 2.0); // b = 1, f = 0.6 - 0.4
/// assert!((kelly - 0.2).abs() < 1e-9);
/// ```
pub fn calculate_kelly_fraction(probability: f64, odds: f64) -> f64 {
    let b = odds - 1.0;
    if !b.is_finite() || b <= 0.0 || !probability.is_finite() {
        return 0.0;
    }

    let q = 1.0 - probability;
    (b * probability - q) / b
}

/// Net payout of a winning bet
pub fn kelly_payout(stake: f64, odds: f64) -> f64 {
    stake * (odds - 1.0)
}

/// Fractional Kelly sizer with an optional minimum stake
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KellySizer {
    /// Fraction of full Kelly (1.0 = full, 0.25 = quarter)
    pub multiplier: f64,
    /// Positive stakes below this are raised to it; 0.0 disables the floor
    pub min_stake: f64,
}

impl KellySizer {
    pub fn new(multiplier: f64, min_stake: f64) -> Self {
        Self {
            multiplier,
            min_stake,
        }
    }

    pub fn full() -> Self {
        Self::new(1.0, 0.0)
    }

    /// Size a bet against the given bankroll
    pub fn calculate_single(&self, probability: f64, odds: f64, bankroll: f64) -> BetSizing {
        let ev = probability * odds;
        let kelly = calculate_kelly_fraction(probability, odds);
        let recommended = (kelly * self.multiplier).max(0.0);

        let stake = if kelly > 0.0 && bankroll > 0.0 {
            let raw = bankroll * recommended;
            if raw > 0.0 && raw < self.min_stake {
                self.min_stake
            } else {
                raw
            }
        } else {
            0.0
        };

        BetSizing {
            probability,
            odds,
            expected_value: ev,
            edge: ev - 1.0,
            kelly_fraction: kelly,
            recommended_fraction: recommended,
            stake,
        }
    }
}

impl Default for KellySizer {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelly_fraction_positive_ev() {
        // b = 4, p = 0.25: (4*0.25 - 0.75) / 4 = 0.0625
        let kelly = calculate_kelly_fraction(0.25, 5.0);
        assert!((kelly - 0.0625).abs() < 0.0001);
    }

    #[test]
    fn test_kelly_fraction_negative_ev() {
        let kelly = calculate_kelly_fraction(0.10, 5.0);
        assert!(kelly < 0.0);
    }

    #[test]
    fn test_kelly_fraction_even_odds_guarded() {
        assert_eq!(calculate_kelly_fraction(0.9, 1.0), 0.0);
        assert_eq!(calculate_kelly_fraction(0.9, 0.5), 0.0);
        assert_eq!(calculate_kelly_fraction(0.9, 0.0), 0.0);
        assert_eq!(calculate_kelly_fraction(0.9, f64::NAN), 0.0);
    }

    #[test]
    fn test_kelly_payout_is_net() {
        assert!((kelly_payout(100.0, 2.5) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_sizer_full_kelly() {
        let sizer = KellySizer::full();
        let sizing = sizer.calculate_single(0.6, 2.0, 1000.0);
        assert!((sizing.kelly_fraction - 0.2).abs() < 1e-9);
        assert!((sizing.stake - 200.0).abs() < 1e-9);
        assert!((sizing.expected_value - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_sizer_fractional_with_floor() {
        let sizer = KellySizer::new(0.25, 20.0);
        // Full Kelly 0.2, quarter 0.05, 100 * 0.05 = 5 -> floored to 20
        let sizing = sizer.calculate_single(0.6, 2.0, 100.0);
        assert!((sizing.recommended_fraction - 0.05).abs() < 1e-9);
        assert!((sizing.stake - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_sizer_no_edge_no_stake() {
        let sizer = KellySizer::new(1.0, 20.0);
        let sizing = sizer.calculate_single(0.3, 2.0, 1000.0);
        assert!(sizing.kelly_fraction < 0.0);
        assert_eq!(sizing.stake, 0.0);
    }

    #[test]
    fn test_sizer_empty_bankroll() {
        let sizing = KellySizer::full().calculate_single(0.6, 2.0, 0.0);
        assert_eq!(sizing.stake, 0.0);
    }
}
