//! Stake-sizing strategy simulator
//!
//! Replays a chronological list of resolved bets through one stake-sizing
//! algorithm and records the bankroll after every position.
//!
//! Bankroll tracking is enabled when a positive starting bankroll is given.
//! While tracking:
//! - a stake larger than the current bankroll is clamped to it
//! - once the bankroll reaches zero no further stake is placed, but every
//!   remaining position still appends an (unchanged) bankroll value
//!
//! A position without a usable market (odds <= 1.0), or one the algorithm
//! declines, places no stake and leaves the algorithm state untouched.

use serde::{Deserialize, Serialize};

use super::kelly::{kelly_payout, KellySizer};
use crate::models::Bet;

/// Built-in stake-sizing algorithms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingAlgorithm {
    Flat,
    Martingale,
    Fibonacci,
    ValueBetting,
    Kelly { multiplier: f64, min_stake: f64 },
}

impl StakingAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            StakingAlgorithm::Flat => "flat",
            StakingAlgorithm::Martingale => "martingale",
            StakingAlgorithm::Fibonacci => "fibonacci",
            StakingAlgorithm::ValueBetting => "value",
            StakingAlgorithm::Kelly { .. } => "kelly",
        }
    }

    /// Parse a CLI-style name. Kelly defaults to full Kelly without a floor.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "flat" => Some(StakingAlgorithm::Flat),
            "martingale" => Some(StakingAlgorithm::Martingale),
            "fibonacci" | "fib" => Some(StakingAlgorithm::Fibonacci),
            "value" | "value_betting" => Some(StakingAlgorithm::ValueBetting),
            "kelly" => Some(StakingAlgorithm::Kelly {
                multiplier: 1.0,
                min_stake: 0.0,
            }),
            _ => None,
        }
    }

    /// Fresh sizer for one run.
    ///
    /// `stake` is the flat stake, the base stake of a progression, or for Kelly
    /// the reference bankroll used when bankroll tracking is off.
    pub fn sizer(&self, stake: f64, tracking: bool) -> Box<dyn StakeSizer> {
        match *self {
            StakingAlgorithm::Flat => Box::new(FlatStake::new(stake)),
            StakingAlgorithm::Martingale => Box::new(Martingale::new(stake)),
            StakingAlgorithm::Fibonacci => Box::new(Fibonacci::new(stake)),
            StakingAlgorithm::ValueBetting => Box::new(ValueBetting::new(stake)),
            StakingAlgorithm::Kelly {
                multiplier,
                min_stake,
            } => Box::new(KellyStake {
                sizer: KellySizer::new(multiplier, min_stake),
                fixed_bankroll: if tracking { None } else { Some(stake) },
            }),
        }
    }
}

/// A stateful stake-sizing rule
pub trait StakeSizer {
    /// Stake the rule wants for this bet, before the bankroll guard is applied
    fn nominal_stake(&self, bet: &Bet, bankroll: f64) -> f64;

    /// Advance internal state after a placed bet settles
    fn settle(&mut self, _won: bool) {}
}

/// Constant stake
#[derive(Debug, Clone)]
pub struct FlatStake {
    stake: f64,
}

impl FlatStake {
    pub fn new(stake: f64) -> Self {
        Self { stake }
    }
}

impl StakeSizer for FlatStake {
    fn nominal_stake(&self, _bet: &Bet, _bankroll: f64) -> f64 {
        self.stake
    }
}

/// Double after every loss, reset to base after a win
#[derive(Debug, Clone)]
pub struct Martingale {
    base: f64,
    current: f64,
}

impl Martingale {
    pub fn new(base: f64) -> Self {
        Self {
            base,
            current: base,
        }
    }
}

impl StakeSizer for Martingale {
    fn nominal_stake(&self, _bet: &Bet, _bankroll: f64) -> f64 {
        self.current
    }

    fn settle(&mut self, won: bool) {
        if won {
            self.current = self.base;
        } else {
            self.current *= 2.0;
        }
    }
}

/// Base stake times the Fibonacci number at the current index.
/// Loss moves one step up, win moves two steps back (floored at the start).
#[derive(Debug, Clone)]
pub struct Fibonacci {
    base: f64,
    index: usize,
    sequence: Vec<u64>,
}

impl Fibonacci {
    pub fn new(base: f64) -> Self {
        Self {
            base,
            index: 0,
            sequence: vec![1, 1],
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn ensure_len(&mut self, len: usize) {
        while self.sequence.len() < len {
            let n = self.sequence.len();
            let next = self.sequence[n - 1].saturating_add(self.sequence[n - 2]);
            self.sequence.push(next);
        }
    }
}

impl StakeSizer for Fibonacci {
    fn nominal_stake(&self, _bet: &Bet, _bankroll: f64) -> f64 {
        // settle() keeps the sequence at least index + 1 long
        self.base * self.sequence[self.index] as f64
    }

    fn settle(&mut self, won: bool) {
        if won {
            self.index = self.index.saturating_sub(2);
        } else {
            self.index += 1;
            self.ensure_len(self.index + 1);
        }
    }
}

/// Flat stake, only when odds * probability > 1
#[derive(Debug, Clone)]
pub struct ValueBetting {
    stake: f64,
}

impl ValueBetting {
    pub fn new(stake: f64) -> Self {
        Self { stake }
    }
}

impl StakeSizer for ValueBetting {
    fn nominal_stake(&self, bet: &Bet, _bankroll: f64) -> f64 {
        if bet.odds * bet.model_probability > 1.0 {
            self.stake
        } else {
            0.0
        }
    }
}

/// Kelly stake against the running bankroll, or a fixed reference bankroll
/// when tracking is off
#[derive(Debug, Clone)]
pub struct KellyStake {
    sizer: KellySizer,
    fixed_bankroll: Option<f64>,
}

impl StakeSizer for KellyStake {
    fn nominal_stake(&self, bet: &Bet, bankroll: f64) -> f64 {
        let reference = self.fixed_bankroll.unwrap_or(bankroll);
        self.sizer
            .calculate_single(bet.model_probability, bet.odds, reference)
            .stake
    }
}

/// Bankroll trajectory (N + 1 values) and stakes used (N values)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub bankroll: Vec<f64>,
    pub stakes: Vec<f64>,
    /// Net result of each position (0.0 when no stake was placed)
    pub profits: Vec<f64>,
}

impl SimulationResult {
    pub fn initial_bankroll(&self) -> f64 {
        self.bankroll.first().copied().unwrap_or(0.0)
    }

    pub fn final_bankroll(&self) -> f64 {
        self.bankroll.last().copied().unwrap_or(0.0)
    }

    /// Terminal profit or loss relative to the starting value
    pub fn total_profit(&self) -> f64 {
        self.final_bankroll() - self.initial_bankroll()
    }

    pub fn total_staked(&self) -> f64 {
        self.stakes.iter().sum()
    }

    pub fn bets_placed(&self) -> usize {
        self.stakes.iter().filter(|&&s| s > 0.0).count()
    }
}

/// Replay `bets` in order with a fresh sizer for `algorithm`
pub fn simulate(
    bets: &[Bet],
    algorithm: StakingAlgorithm,
    stake: f64,
    bankroll_start: Option<f64>,
) -> SimulationResult {
    let tracking = is_tracking(bankroll_start);
    let mut sizer = algorithm.sizer(stake, tracking);
    simulate_with(bets, sizer.as_mut(), bankroll_start)
}

/// Replay `bets` through a caller-supplied sizer
pub fn simulate_with(
    bets: &[Bet],
    sizer: &mut dyn StakeSizer,
    bankroll_start: Option<f64>,
) -> SimulationResult {
    let tracking = is_tracking(bankroll_start);
    let mut current = bankroll_start.unwrap_or(0.0);

    let mut bankroll = Vec::with_capacity(bets.len() + 1);
    let mut stakes = Vec::with_capacity(bets.len());
    let mut profits = Vec::with_capacity(bets.len());
    bankroll.push(current);

    for bet in bets {
        let stake = if tracking && current <= 0.0 {
            // Bankrupt: sequence continues without wagering
            0.0
        } else if !bet.has_market() {
            0.0
        } else {
            let nominal = sizer.nominal_stake(bet, current);
            if !nominal.is_finite() || nominal <= 0.0 {
                0.0
            } else if tracking && nominal > current {
                current
            } else {
                nominal
            }
        };

        let profit = if stake > 0.0 {
            let profit = if bet.won {
                kelly_payout(stake, bet.odds)
            } else {
                -stake
            };
            sizer.settle(bet.won);
            profit
        } else {
            0.0
        };

        current += profit;
        stakes.push(stake);
        profits.push(profit);
        bankroll.push(current);
    }

    SimulationResult {
        bankroll,
        stakes,
        profits,
    }
}

/// Bankroll tracking is on only for a positive starting bankroll
pub fn is_tracking(bankroll_start: Option<f64>) -> bool {
    matches!(bankroll_start, Some(b) if b > 0.0)
}
