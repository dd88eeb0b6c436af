//! Merge Errors
//!
//! Every failure the engine can report is deterministic given the same inputs,
//! so nothing here is retryable.

use thiserror::Error;
use crate::model::TectonicRegion;

/// Errors surfaced by detection, accumulation and finalization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    #[error("grid mismatch: expected {expected} locations, realization has {found}")]
    GridSizeMismatch { expected: usize, found: usize },

    #[error("grid mismatch at location {index}: expected ({expected_lat}, {expected_lon}), found ({found_lat}, {found_lon})")]
    GridLocationMismatch {
        index: usize,
        expected_lat: f64,
        expected_lon: f64,
        found_lat: f64,
        found_lon: f64,
    },

    #[error("total ensemble weight must be positive, got {0}")]
    NonPositiveTotalWeight(f64),

    #[error("invalid realization weight {0}: weights must be finite and non-negative")]
    InvalidWeight(f64),

    #[error("malformed associations for {region} rupture {rupture} at location {location}: {reason}")]
    MalformedAssociations {
        region: TectonicRegion,
        location: usize,
        rupture: usize,
        reason: String,
    },

    #[error("invalid {region} rupture {rupture} at location {location}: {reason}")]
    InvalidRupture {
        region: TectonicRegion,
        location: usize,
        rupture: usize,
        reason: String,
    },

    #[error("location {location} is outside a grid of {size} locations")]
    CellOutOfRange { location: usize, size: usize },
}

pub type Result<T> = std::result::Result<T, MergeError>;
