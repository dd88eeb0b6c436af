//! Realization Sources
//!
//! A full gridded rupture forecast: for every tectonic region, one cell of
//! ruptures per grid location. Used both as merge input and merge output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::location::GridLocations;
use super::rupture::{RuptureRecord, TectonicRegion};
use crate::error::{MergeError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizationSource {
    grid: GridLocations,
    regions: BTreeMap<TectonicRegion, Vec<Vec<RuptureRecord>>>,
}

impl RealizationSource {
    pub fn new(grid: GridLocations) -> Self {
        Self { grid, regions: BTreeMap::new() }
    }

    /// Builds a source from per-region cells. Every region must carry exactly
    /// one cell per grid location.
    pub fn from_cells(
        grid: GridLocations,
        regions: BTreeMap<TectonicRegion, Vec<Vec<RuptureRecord>>>,
    ) -> Result<Self> {
        for cells in regions.values() {
            if cells.len() != grid.len() {
                return Err(MergeError::GridSizeMismatch { expected: grid.len(), found: cells.len() });
            }
        }
        Ok(Self { grid, regions })
    }

    pub fn grid(&self) -> &GridLocations {
        &self.grid
    }

    pub fn num_locations(&self) -> usize {
        self.grid.len()
    }

    /// Appends `record` to the cell at `location` in `region`.
    pub fn push(&mut self, region: TectonicRegion, location: usize, record: RuptureRecord) -> Result<()> {
        let size = self.grid.len();
        if location >= size {
            return Err(MergeError::CellOutOfRange { location, size });
        }
        let cells = self.regions.entry(region).or_insert_with(|| vec![Vec::new(); size]);
        cells[location].push(record);
        Ok(())
    }

    pub fn cell(&self, region: TectonicRegion, location: usize) -> &[RuptureRecord] {
        self.regions
            .get(&region)
            .and_then(|cells| cells.get(location))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cells(&self, region: TectonicRegion) -> Option<&[Vec<RuptureRecord>]> {
        self.regions.get(&region).map(Vec::as_slice)
    }

    /// Regions present in this source, in a fixed order.
    pub fn regions(&self) -> impl Iterator<Item = TectonicRegion> + '_ {
        self.regions.keys().copied()
    }

    /// Every non-empty cell as `(region, location, ruptures)`.
    pub fn iter(&self) -> impl Iterator<Item = (TectonicRegion, usize, &[RuptureRecord])> + '_ {
        self.regions.iter().flat_map(|(region, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| !cell.is_empty())
                .map(move |(location, cell)| (*region, location, cell.as_slice()))
        })
    }

    pub fn rupture_count(&self) -> usize {
        self.regions.values().flatten().map(Vec::len).sum()
    }

    pub fn total_rate(&self) -> f64 {
        self.iter().flat_map(|(_, _, cell)| cell).map(|rup| rup.rate).sum()
    }

    pub fn total_rate_for(&self, region: TectonicRegion) -> f64 {
        self.regions
            .get(&region)
            .map(|cells| cells.iter().flatten().map(|rup| rup.rate).sum::<f64>())
            .unwrap_or(0.0)
    }

    /// Summed rate per grid location across all regions.
    pub fn location_rates(&self) -> Vec<f64> {
        let mut rates = vec![0.0; self.grid.len()];
        for (_, location, cell) in self.iter() {
            if let Some(rate) = rates.get_mut(location) {
                *rate += cell.iter().map(|rup| rup.rate).sum::<f64>();
            }
        }
        rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;

    fn two_cell_grid() -> GridLocations {
        GridLocations::new(vec![Location::new(34.0, -118.0), Location::new(34.1, -118.0)])
    }

    #[test]
    fn test_push_and_lookup() {
        let mut source = RealizationSource::new(two_cell_grid());
        source
            .push(TectonicRegion::ActiveShallow, 1, RuptureRecord::new(1, TectonicRegion::ActiveShallow, 6.0, 0.01))
            .unwrap();
        source
            .push(TectonicRegion::ActiveShallow, 1, RuptureRecord::new(1, TectonicRegion::ActiveShallow, 6.5, 0.005))
            .unwrap();

        assert_eq!(source.cell(TectonicRegion::ActiveShallow, 1).len(), 2);
        assert!(source.cell(TectonicRegion::ActiveShallow, 0).is_empty());
        assert!(source.cell(TectonicRegion::Volcanic, 1).is_empty());
        assert_eq!(source.rupture_count(), 2);
        assert!((source.total_rate() - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_push_out_of_range() {
        let mut source = RealizationSource::new(two_cell_grid());
        let err = source
            .push(TectonicRegion::StableShallow, 2, RuptureRecord::new(2, TectonicRegion::StableShallow, 5.0, 0.1))
            .unwrap_err();
        assert_eq!(err, MergeError::CellOutOfRange { location: 2, size: 2 });
    }

    #[test]
    fn test_location_rates_span_regions() {
        let mut source = RealizationSource::new(two_cell_grid());
        source.push(TectonicRegion::ActiveShallow, 0, RuptureRecord::new(0, TectonicRegion::ActiveShallow, 6.0, 0.25)).unwrap();
        source.push(TectonicRegion::SubductionSlab, 0, RuptureRecord::new(0, TectonicRegion::SubductionSlab, 7.0, 0.5)).unwrap();
        source.push(TectonicRegion::SubductionSlab, 1, RuptureRecord::new(1, TectonicRegion::SubductionSlab, 7.0, 1.0)).unwrap();

        assert_eq!(source.num_locations(), 2);
        assert_eq!(source.cells(TectonicRegion::SubductionSlab).map(|cells| cells.len()), Some(2));
        assert!(source.cells(TectonicRegion::Volcanic).is_none());
        assert_eq!(source.location_rates(), vec![0.75, 1.0]);
        assert_eq!(source.total_rate_for(TectonicRegion::SubductionSlab), 1.5);
        assert_eq!(source.regions().collect::<Vec<_>>(), vec![TectonicRegion::ActiveShallow, TectonicRegion::SubductionSlab]);
    }

    #[test]
    fn test_from_cells_checks_cell_count() {
        let mut regions = BTreeMap::new();
        regions.insert(TectonicRegion::Volcanic, vec![Vec::new()]);
        assert!(RealizationSource::from_cells(two_cell_grid(), regions).is_err());
    }
}
