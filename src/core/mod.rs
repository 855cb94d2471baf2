//! Core betting logic: Kelly sizing and the stake-sizing simulator

pub mod kelly;
pub mod staking;

// Re-export commonly used types
pub use kelly::{calculate_kelly_fraction, BetSizing, KellySizer};
pub use staking::{simulate, simulate_with, SimulationResult, StakeSizer, StakingAlgorithm};
