//! Merge Engine
//!
//! Folds a weighted ensemble of realizations into one consensus realization:
//! detection fixes the rupture comparator, accumulation keeps sorted
//! per-cell running statistics, finalization averages them against the
//! total ensemble weight.

pub mod sum;
pub mod property;
pub mod association;
pub mod match_key;
pub mod detection;
pub mod accumulation;
pub mod merger;
pub mod shard;

pub use accumulation::Accumulation;
pub use association::AssociationAccumulator;
pub use detection::Detection;
pub use match_key::MatchKey;
pub use merger::{merge_ensemble, merge_ensemble_with_report, EnsembleMerger, MergePhase, MergeReport};
pub use property::PropertyAccumulator;
pub use shard::merge_sharded;
pub use sum::ExactSum;
