//! Gridded Forecast Ensemble Merging
//!
//! Merges a weighted logic-tree ensemble of gridded rupture forecasts into a
//! single consensus forecast:
//! - Exact rupture matching with a comparator chosen once per ensemble
//! - Weighted averages normalized by the whole ensemble weight
//! - Canonical "unset" hypocenter fields preserved through the merge
//! - Optional parallel merging of disjoint location ranges

pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod telemetry;

// Re-exports for convenience
pub use config::MergeConfig;
pub use error::{MergeError, Result};
pub use merge::{merge_ensemble, EnsembleMerger, MatchKey, MergeReport};
pub use model::{GridLocations, Location, RealizationSource, RuptureRecord, SectionAssociations, Strike, TectonicRegion};
