//! Ensemble Merger
//!
//! Drives one merge job through `Empty -> Detecting -> Accumulating ->
//! Finalized`. Every realization must be shown to [`EnsembleMerger::detect`]
//! before the first call to [`EnsembleMerger::accumulate`]; the comparator is
//! frozen at that point. A merger is single-use.

use serde::{Deserialize, Serialize};
use std::mem;
use tracing::{debug, info};

use super::accumulation::{Accumulation, RangeOutput};
use super::detection::Detection;
use super::match_key::MatchKey;
use crate::config::MergeConfig;
use crate::error::{MergeError, Result};
use crate::model::{GridLocations, RealizationSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePhase {
    Empty,
    Detecting,
    Accumulating,
    Finalized,
}

/// Summary of a finished merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub realizations: usize,
    pub total_weight: f64,
    pub match_key: MatchKey,
    pub input_ruptures: usize,
    pub output_ruptures: usize,
    /// Merged ruptures absent from part of the ensemble weight
    pub partially_present: usize,
}

#[derive(Debug)]
enum MergeState {
    Empty,
    Detecting(Detection),
    Accumulating(Accumulation),
    Finalized,
}

#[derive(Debug)]
pub struct EnsembleMerger {
    config: MergeConfig,
    state: MergeState,
}

impl EnsembleMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config, state: MergeState::Empty }
    }

    /// Skips detection and accumulates with a comparator chosen elsewhere,
    /// e.g. by a detection pass shared between shards.
    pub fn with_match_key(grid: GridLocations, match_key: MatchKey, config: MergeConfig) -> Self {
        let accumulation = Accumulation::new(match_key, grid, config.clone());
        Self { config, state: MergeState::Accumulating(accumulation) }
    }

    pub fn phase(&self) -> MergePhase {
        match self.state {
            MergeState::Empty => MergePhase::Empty,
            MergeState::Detecting(_) => MergePhase::Detecting,
            MergeState::Accumulating(_) => MergePhase::Accumulating,
            MergeState::Finalized => MergePhase::Finalized,
        }
    }

    /// Comparator in effect, or the one detection currently points to.
    pub fn match_key(&self) -> Option<MatchKey> {
        match &self.state {
            MergeState::Detecting(detection) => Some(detection.match_key()),
            MergeState::Accumulating(accumulation) => Some(accumulation.match_key()),
            MergeState::Empty | MergeState::Finalized => None,
        }
    }

    /// Detection pass over one realization. The first realization fixes the
    /// reference grid.
    ///
    /// # Panics
    /// If accumulation has already started or the merger was finalized.
    pub fn detect(&mut self, source: &RealizationSource) -> Result<()> {
        if let MergeState::Empty = self.state {
            self.state = MergeState::Detecting(Detection::new(source.grid().clone()));
        }

        match &mut self.state {
            MergeState::Detecting(detection) => detection.observe(source),
            MergeState::Empty => unreachable!("empty state replaced above"),
            MergeState::Accumulating(_) => {
                panic!("detection must see every realization before accumulation starts")
            }
            MergeState::Finalized => panic!("merger reused after finalize"),
        }
    }

    /// Folds one weighted realization. The first call freezes the comparator.
    ///
    /// # Panics
    /// If no realization went through [`detect`](Self::detect) first, or the
    /// merger was finalized.
    pub fn accumulate(&mut self, source: &RealizationSource, weight: f64) -> Result<()> {
        if let MergeState::Detecting(detection) = &self.state {
            let match_key = detection.match_key();
            info!(
                realizations = detection.realizations(),
                locations = detection.grid().len(),
                "Detection complete, matching ruptures by {}",
                match_key
            );
            let accumulation = Accumulation::new(match_key, detection.grid().clone(), self.config.clone());
            self.state = MergeState::Accumulating(accumulation);
        }

        match &mut self.state {
            MergeState::Accumulating(accumulation) => {
                accumulation.add(source, weight)?;
                let seen = accumulation.realizations();
                debug!(realization = seen, weight, "Accumulated realization");
                if self.config.progress_every > 0 && seen % self.config.progress_every == 0 {
                    info!("Accumulated {} realizations", seen);
                }
                Ok(())
            }
            MergeState::Empty => panic!("accumulate called before any detection pass"),
            MergeState::Finalized => panic!("merger reused after finalize"),
            MergeState::Detecting(_) => unreachable!("detection state replaced above"),
        }
    }

    pub fn finalize(&mut self) -> Result<RealizationSource> {
        self.finalize_with_report().map(|(source, _)| source)
    }

    /// Averages every merged rupture against the total ensemble weight.
    ///
    /// # Panics
    /// If the merger was already finalized.
    pub fn finalize_with_report(&mut self) -> Result<(RealizationSource, MergeReport)> {
        match mem::replace(&mut self.state, MergeState::Finalized) {
            MergeState::Accumulating(accumulation) => {
                let match_key = accumulation.match_key();
                let grid = accumulation.grid().clone();
                let output = accumulation.finalize()?;
                let (source, report) = assemble(grid, match_key, vec![output])?;
                info!(
                    realizations = report.realizations,
                    input = report.input_ruptures,
                    output = report.output_ruptures,
                    partial = report.partially_present,
                    "Merged ensemble with total weight {}",
                    report.total_weight
                );
                Ok((source, report))
            }
            MergeState::Empty | MergeState::Detecting(_) => Err(MergeError::NonPositiveTotalWeight(0.0)),
            MergeState::Finalized => panic!("merger reused after finalize"),
        }
    }
}

/// Stitches range outputs (in any order) into one realization over `grid`.
pub(crate) fn assemble(
    grid: GridLocations,
    match_key: MatchKey,
    outputs: Vec<RangeOutput>,
) -> Result<(RealizationSource, MergeReport)> {
    let mut report = MergeReport {
        realizations: 0,
        total_weight: 0.0,
        match_key,
        input_ruptures: 0,
        output_ruptures: 0,
        partially_present: 0,
    };
    let mut regions = std::collections::BTreeMap::new();
    for output in outputs {
        report.realizations = output.realizations;
        report.total_weight = output.total_weight;
        report.input_ruptures += output.input_ruptures;
        report.output_ruptures += output.output_ruptures;
        report.partially_present += output.partially_present;

        for (region, cells) in output.regions {
            let full = regions
                .entry(region)
                .or_insert_with(|| vec![Vec::new(); grid.len()]);
            for (offset, cell) in cells.into_iter().enumerate() {
                full[output.range.start + offset] = cell;
            }
        }
    }
    let source = RealizationSource::from_cells(grid, regions)?;
    Ok((source, report))
}

/// Merges an in-memory ensemble: a detection pass over every realization,
/// then one accumulation pass. Uses [`merge_sharded`](super::shard::merge_sharded)
/// when `config.shards > 1`.
#[tracing::instrument(skip_all, fields(realizations = realizations.len()))]
pub fn merge_ensemble(realizations: &[(RealizationSource, f64)], config: &MergeConfig) -> Result<RealizationSource> {
    merge_ensemble_with_report(realizations, config).map(|(source, _)| source)
}

pub fn merge_ensemble_with_report(
    realizations: &[(RealizationSource, f64)],
    config: &MergeConfig,
) -> Result<(RealizationSource, MergeReport)> {
    if config.shards > 1 {
        return super::shard::merge_sharded(realizations, config);
    }

    let mut merger = EnsembleMerger::new(config.clone());
    for (source, _) in realizations {
        merger.detect(source)?;
    }
    for (source, weight) in realizations {
        merger.accumulate(source, *weight)?;
    }
    merger.finalize_with_report()
}
