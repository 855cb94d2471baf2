//! Strategy Metrics
//!
//! Summary statistics over one stake-sizing run: hit rate, ROI, drawdown, etc.

use serde::{Deserialize, Serialize};

use crate::core::staking::SimulationResult;
use crate::models::Bet;

/// Evaluation metrics for one replayed strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    // Basic metrics
    pub bets_placed: usize,
    pub bets_won: usize,
    pub hit_rate: f64,
    pub roi: f64,

    // Win/Loss
    pub total_staked: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub net_profit: f64,

    // Risk metrics
    pub profit_factor: f64,
    pub max_drawdown: f64,
}

/// Calculate metrics from a simulation and the bets it replayed.
///
/// Positions where no stake was placed count towards nothing except the
/// drawdown walk, which follows the full bankroll trajectory.
pub fn calculate_metrics(result: &SimulationResult, bets: &[Bet]) -> StrategyMetrics {
    let placed: Vec<(f64, &Bet)> = result
        .profits
        .iter()
        .zip(result.stakes.iter())
        .zip(bets.iter())
        .filter(|&((_, &stake), _)| stake > 0.0)
        .map(|((&profit, _), bet)| (profit, bet))
        .collect();

    if placed.is_empty() {
        return StrategyMetrics::default();
    }

    let bets_placed = placed.len();
    let bets_won = placed.iter().filter(|(_, bet)| bet.won).count();
    let hit_rate = bets_won as f64 / bets_placed as f64;

    let gross_profit: f64 = placed.iter().map(|(p, _)| *p).filter(|&p| p > 0.0).sum();
    let gross_loss: f64 = placed
        .iter()
        .map(|(p, _)| *p)
        .filter(|&p| p < 0.0)
        .map(f64::abs)
        .sum();
    let net_profit = gross_profit - gross_loss;
    let total_staked = result.total_staked();

    // Profit Factor
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let roi = if total_staked > 0.0 {
        net_profit / total_staked
    } else {
        0.0
    };

    StrategyMetrics {
        bets_placed,
        bets_won,
        hit_rate,
        roi,
        total_staked,
        gross_profit,
        gross_loss,
        net_profit,
        profit_factor,
        max_drawdown: max_drawdown(&result.bankroll),
    }
}

/// Largest peak-to-trough fall along a bankroll trajectory
pub fn max_drawdown(trajectory: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0;
    for &value in trajectory {
        if value > peak {
            peak = value;
        }
        let drawdown = peak - value;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }
    max_drawdown
}
