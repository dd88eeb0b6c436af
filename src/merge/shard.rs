//! Sharded Merge
//!
//! Accumulation at one location never looks at another, so disjoint location
//! ranges can be merged on separate threads once a single detection pass has
//! fixed the comparator for the whole ensemble.

use rayon::prelude::*;
use std::ops::Range;
use tracing::info;

use super::accumulation::Accumulation;
use super::detection::Detection;
use super::merger::{assemble, MergeReport};
use crate::config::MergeConfig;
use crate::error::{MergeError, Result};
use crate::model::RealizationSource;

/// Splits `0..len` into at most `shards` contiguous, non-empty ranges.
pub fn shard_ranges(len: usize, shards: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return vec![0..0];
    }
    let shards = shards.clamp(1, len);
    let chunk = (len + shards - 1) / shards;
    (0..len)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(len))
        .collect()
}

/// Same result as the sequential merge, with `config.shards` location ranges
/// accumulated in parallel.
#[tracing::instrument(skip_all, fields(realizations = realizations.len(), shards = config.shards))]
pub fn merge_sharded(
    realizations: &[(RealizationSource, f64)],
    config: &MergeConfig,
) -> Result<(RealizationSource, MergeReport)> {
    let Some((first, _)) = realizations.first() else {
        return Err(MergeError::NonPositiveTotalWeight(0.0));
    };

    let mut detection = Detection::new(first.grid().clone());
    for (source, _) in realizations {
        detection.observe(source)?;
    }
    let match_key = detection.match_key();
    let grid = detection.grid().clone();
    let ranges = shard_ranges(grid.len(), config.shards);
    info!(shards = ranges.len(), "Detection complete, matching ruptures by {}", match_key);

    let outputs = ranges
        .into_par_iter()
        .map(|range| {
            let mut accumulation = Accumulation::for_range(match_key, grid.clone(), range, config.clone());
            for (source, weight) in realizations {
                accumulation.add(source, *weight)?;
            }
            accumulation.finalize()
        })
        .collect::<Result<Vec<_>>>()?;

    let (source, report) = assemble(grid, match_key, outputs)?;
    info!(
        realizations = report.realizations,
        input = report.input_ruptures,
        output = report.output_ruptures,
        "Merged ensemble with total weight {}",
        report.total_weight
    );
    Ok((source, report))
}
