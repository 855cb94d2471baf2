//! Pre-simulation stages: data availability and prediction aggregation

pub mod aggregator;
pub mod availability;

pub use aggregator::PredictionAggregator;
pub use availability::{AvailabilityPipeline, Candidate, Rejection, Verdict};
