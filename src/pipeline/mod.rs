//! Cross-source query pipeline.
//!
//! - `aggregate`: fan-out search, leaderboard merge and stats lookup

pub mod aggregate;

pub use aggregate::Aggregator;
