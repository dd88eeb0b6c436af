//! Detection Phase
//!
//! Scans every realization once, before accumulation, to fix the reference
//! grid and decide which comparator the whole merge will use.

use tracing::debug;

use super::match_key::{has_extent_heterogeneity, MatchKey};
use crate::error::Result;
use crate::model::{GridLocations, RealizationSource, TectonicRegion};

#[derive(Debug, Clone)]
pub struct Detection {
    grid: GridLocations,
    realizations: usize,
    /// First (realization, region, location) holding core-equal ruptures with
    /// different extents
    first_heterogeneity: Option<(usize, TectonicRegion, usize)>,
}

impl Detection {
    /// Starts a scan whose reference grid is `grid`.
    pub fn new(grid: GridLocations) -> Self {
        Self { grid, realizations: 0, first_heterogeneity: None }
    }

    pub fn grid(&self) -> &GridLocations {
        &self.grid
    }

    pub fn realizations(&self) -> usize {
        self.realizations
    }

    pub fn is_heterogeneous(&self) -> bool {
        self.first_heterogeneity.is_some()
    }

    /// Checks the grid of `source` against the reference and, until
    /// heterogeneity has been found, scans its cells.
    pub fn observe(&mut self, source: &RealizationSource) -> Result<()> {
        self.grid.ensure_same_shape(source.grid())?;

        if self.first_heterogeneity.is_none() {
            let hit = source
                .iter()
                .find(|(_, _, cell)| has_extent_heterogeneity(cell))
                .map(|(region, location, _)| (self.realizations, region, location));
            if let Some((realization, region, location)) = hit {
                debug!(realization, %region, location, "core-identical ruptures differ in depth or extent");
                self.first_heterogeneity = hit;
            }
        }

        self.realizations += 1;
        Ok(())
    }

    pub fn match_key(&self) -> MatchKey {
        if self.is_heterogeneous() {
            MatchKey::Full
        } else {
            MatchKey::Core
        }
    }
}
