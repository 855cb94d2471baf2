//! Backtesting: outcome resolution, profit aggregation and strategy metrics

pub mod evaluator;
pub mod metrics;

pub use evaluator::OutcomeEvaluator;
pub use metrics::{calculate_metrics, max_drawdown, StrategyMetrics};
