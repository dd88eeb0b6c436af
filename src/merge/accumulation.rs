//! Accumulation Phase
//!
//! Folds weighted realizations into sorted per-cell lists of merged ruptures.
//! The comparator is fixed at construction and cannot change mid-merge.

use std::collections::BTreeMap;
use std::ops::Range;

use super::association::AssociationAccumulator;
use super::match_key::MatchKey;
use super::property::{weights_match, PropertyAccumulator};
use super::sum::ExactSum;
use crate::config::MergeConfig;
use crate::error::{MergeError, Result};
use crate::model::rupture::midpoint;
use crate::model::{GridLocations, RealizationSource, RuptureRecord, TectonicRegion};

/// One distinguishable rupture and the running statistics of every record
/// matched to it.
#[derive(Debug, Clone)]
pub(crate) struct MergedRupture {
    key: RuptureRecord,
    rate: PropertyAccumulator,
    upper_depth: PropertyAccumulator,
    lower_depth: PropertyAccumulator,
    length: PropertyAccumulator,
    hypocentral_depth: PropertyAccumulator,
    hypocentral_das: PropertyAccumulator,
    associations: AssociationAccumulator,
    explicit_depth_seen: bool,
    explicit_das_seen: bool,
}

impl MergedRupture {
    fn new(key: &RuptureRecord) -> Self {
        Self {
            key: key.clone(),
            rate: PropertyAccumulator::new(),
            upper_depth: PropertyAccumulator::new(),
            lower_depth: PropertyAccumulator::new(),
            length: PropertyAccumulator::new(),
            hypocentral_depth: PropertyAccumulator::new(),
            hypocentral_das: PropertyAccumulator::new(),
            associations: AssociationAccumulator::new(),
            explicit_depth_seen: false,
            explicit_das_seen: false,
        }
    }

    fn add(&mut self, record: &RuptureRecord, weight: f64) {
        self.rate.add(record.rate, weight);
        self.upper_depth.add(record.upper_depth, weight);
        self.lower_depth.add(record.lower_depth, weight);
        self.length.add(record.length, weight);
        self.hypocentral_depth.add(record.effective_hypocentral_depth(), weight);
        self.hypocentral_das.add(record.effective_hypocentral_das(), weight);
        self.associations.add(&record.associations, weight);
        self.explicit_depth_seen |= record.has_explicit_hypocentral_depth();
        self.explicit_das_seen |= record.has_explicit_hypocentral_das();
    }

    fn seen_under_full_weight(&self, total_weight: f64, tolerance: f64) -> bool {
        weights_match(self.rate.sum_weight(), total_weight, tolerance)
    }

    fn finalize(self, location: usize, total_weight: f64, tolerance: f64) -> RuptureRecord {
        let upper_depth = self.upper_depth.average(total_weight, tolerance);
        let lower_depth = self.lower_depth.average(total_weight, tolerance);
        let length = self.length.average(total_weight, tolerance);

        // constant geometry scales the hypocenter along the same path as the depths
        let depth_geometry_constant = self.upper_depth.is_constant()
            && self.lower_depth.is_constant()
            && self.upper_depth.first_value().zip(self.lower_depth.first_value()).map(|(u, l)| midpoint(u, l))
                == self.hypocentral_depth.first_value();
        let das_geometry_constant = self.length.is_constant()
            && self.length.first_value().map(|l| 0.5 * l) == self.hypocentral_das.first_value();

        let hypocentral_depth = resolve_default(
            &self.hypocentral_depth,
            self.explicit_depth_seen,
            depth_geometry_constant,
            midpoint(upper_depth, lower_depth),
            total_weight,
            tolerance,
        );
        let hypocentral_das = resolve_default(
            &self.hypocentral_das,
            self.explicit_das_seen,
            das_geometry_constant,
            0.5 * length,
            total_weight,
            tolerance,
        );

        RuptureRecord {
            grid_index: location,
            rate: self.rate.average(total_weight, tolerance),
            upper_depth,
            lower_depth,
            length,
            hypocentral_depth,
            hypocentral_das,
            associations: self.associations.finalize(total_weight),
            ..self.key
        }
    }
}

/// A field nobody set explicitly, whose averaged value is the default derived
/// from the averaged geometry, stays unset. `geometry_constant` means every
/// contributor shared one geometry whose default is the constant value.
fn resolve_default(
    acc: &PropertyAccumulator,
    explicit_seen: bool,
    geometry_constant: bool,
    derived_default: f64,
    total_weight: f64,
    tolerance: f64,
) -> Option<f64> {
    let value = acc.average(total_weight, tolerance);
    if acc.is_constant() && !explicit_seen && (geometry_constant || value == derived_default) {
        None
    } else {
        Some(value)
    }
}

/// Merged ruptures for one contiguous location range, ready to be stitched
/// into a realization.
#[derive(Debug)]
pub(crate) struct RangeOutput {
    pub range: Range<usize>,
    pub regions: BTreeMap<TectonicRegion, Vec<Vec<RuptureRecord>>>,
    pub total_weight: f64,
    pub realizations: usize,
    pub input_ruptures: usize,
    pub output_ruptures: usize,
    pub partially_present: usize,
}

#[derive(Debug)]
pub struct Accumulation {
    match_key: MatchKey,
    grid: GridLocations,
    range: Range<usize>,
    config: MergeConfig,
    cells: BTreeMap<TectonicRegion, Vec<Vec<MergedRupture>>>,
    total_weight: ExactSum,
    realizations: usize,
    input_ruptures: usize,
}

impl Accumulation {
    /// Accumulates every location of `grid`.
    pub fn new(match_key: MatchKey, grid: GridLocations, config: MergeConfig) -> Self {
        let range = 0..grid.len();
        Self::for_range(match_key, grid, range, config)
    }

    /// Accumulates only the locations in `range`; other cells are ignored.
    pub(crate) fn for_range(match_key: MatchKey, grid: GridLocations, range: Range<usize>, config: MergeConfig) -> Self {
        Self {
            match_key,
            grid,
            range,
            config,
            cells: BTreeMap::new(),
            total_weight: ExactSum::new(),
            realizations: 0,
            input_ruptures: 0,
        }
    }

    pub fn match_key(&self) -> MatchKey {
        self.match_key
    }

    pub fn grid(&self) -> &GridLocations {
        &self.grid
    }

    pub fn realizations(&self) -> usize {
        self.realizations
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight.value()
    }

    /// Folds one weighted realization. Nothing is accumulated if the
    /// realization is rejected.
    pub fn add(&mut self, source: &RealizationSource, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(MergeError::InvalidWeight(weight));
        }
        self.grid.ensure_same_shape(source.grid())?;
        self.check_records(source)?;

        let key = self.match_key;
        let range = self.range.clone();
        for region in source.regions() {
            let cells = self
                .cells
                .entry(region)
                .or_insert_with(|| (0..range.len()).map(|_| Vec::new()).collect());
            for location in range.clone() {
                let entries = &mut cells[location - range.start];
                for record in source.cell(region, location) {
                    let sorted = record.with_sorted_associations();
                    match entries.binary_search_by(|entry| key.compare(&entry.key, &sorted)) {
                        Ok(found) => entries[found].add(record, weight),
                        Err(slot) => {
                            let mut entry = MergedRupture::new(&sorted);
                            entry.add(record, weight);
                            entries.insert(slot, entry);
                        }
                    }
                    self.input_ruptures += 1;
                }
            }
        }

        self.total_weight.add(weight);
        self.realizations += 1;
        Ok(())
    }

    /// Associations are always checked; placement, rate and geometry only
    /// when `validate_records` is set.
    fn check_records(&self, source: &RealizationSource) -> Result<()> {
        for region in source.regions() {
            for location in self.range.clone() {
                for (rupture, record) in source.cell(region, location).iter().enumerate() {
                    if self.config.validate_records {
                        check_record(region, location, rupture, record)?;
                    }
                    record
                        .associations
                        .check()
                        .map_err(|reason| MergeError::MalformedAssociations { region, location, rupture, reason })?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn finalize(self) -> Result<RangeOutput> {
        let total_weight = self.total_weight.value();
        if !(total_weight > 0.0) {
            return Err(MergeError::NonPositiveTotalWeight(total_weight));
        }
        let tolerance = self.config.weight_tolerance;
        let start = self.range.start;

        let mut output_ruptures = 0;
        let mut partially_present = 0;
        let mut regions = BTreeMap::new();
        for (region, cells) in self.cells {
            let merged: Vec<Vec<RuptureRecord>> = cells
                .into_iter()
                .enumerate()
                .map(|(offset, entries)| {
                    output_ruptures += entries.len();
                    entries
                        .into_iter()
                        .map(|entry| {
                            if !entry.seen_under_full_weight(total_weight, tolerance) {
                                partially_present += 1;
                            }
                            entry.finalize(start + offset, total_weight, tolerance)
                        })
                        .collect()
                })
                .collect();
            regions.insert(region, merged);
        }

        Ok(RangeOutput {
            range: self.range,
            regions,
            total_weight,
            realizations: self.realizations,
            input_ruptures: self.input_ruptures,
            output_ruptures,
            partially_present,
        })
    }
}

fn check_record(region: TectonicRegion, location: usize, rupture: usize, record: &RuptureRecord) -> Result<()> {
    let invalid = |reason: String| MergeError::InvalidRupture { region, location, rupture, reason };
    if record.grid_index != location {
        return Err(invalid(format!("grid index {} stored in cell {}", record.grid_index, location)));
    }
    if record.tectonic_region != region {
        return Err(invalid(format!("tagged {} but stored under {}", record.tectonic_region, region)));
    }
    record.check().map_err(invalid)
}
