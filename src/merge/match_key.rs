//! Rupture Matching
//!
//! Two equivalence relations decide whether ruptures from different
//! realizations are the same rupture. Floating fields compare with IEEE total
//! ordering, so equality is exact.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::model::{RuptureRecord, Strike};

/// Comparator chosen once per merge, after the detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKey {
    /// Location, magnitude, mechanism, region and associated section ids.
    /// Depths, length and hypocenter are averaged.
    Core,
    /// Core identity plus depths, length and effective hypocenter.
    Full,
}

impl MatchKey {
    pub fn compare(self, a: &RuptureRecord, b: &RuptureRecord) -> Ordering {
        match self {
            MatchKey::Core => compare_core(a, b),
            MatchKey::Full => compare_core(a, b).then_with(|| compare_extent(a, b)),
        }
    }

    pub fn matches(self, a: &RuptureRecord, b: &RuptureRecord) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Core => f.write_str("core identity"),
            MatchKey::Full => f.write_str("full identity"),
        }
    }
}

fn compare_core(a: &RuptureRecord, b: &RuptureRecord) -> Ordering {
    a.grid_index
        .cmp(&b.grid_index)
        .then_with(|| a.tectonic_region.cmp(&b.tectonic_region))
        .then_with(|| a.magnitude.total_cmp(&b.magnitude))
        .then_with(|| a.rake.total_cmp(&b.rake))
        .then_with(|| a.dip.total_cmp(&b.dip))
        .then_with(|| compare_strike(&a.strike, &b.strike))
        .then_with(|| compare_section_ids(a, b))
}

fn compare_extent(a: &RuptureRecord, b: &RuptureRecord) -> Ordering {
    a.upper_depth
        .total_cmp(&b.upper_depth)
        .then_with(|| a.lower_depth.total_cmp(&b.lower_depth))
        .then_with(|| a.length.total_cmp(&b.length))
        .then_with(|| a.effective_hypocentral_depth().total_cmp(&b.effective_hypocentral_depth()))
        .then_with(|| a.effective_hypocentral_das().total_cmp(&b.effective_hypocentral_das()))
}

fn compare_strike(a: &Strike, b: &Strike) -> Ordering {
    match (a, b) {
        (Strike::Fixed(x), Strike::Fixed(y)) => x.total_cmp(y),
        (Strike::Fixed(_), Strike::Range { .. }) => Ordering::Less,
        (Strike::Range { .. }, Strike::Fixed(_)) => Ordering::Greater,
        (Strike::Range { min: a_min, max: a_max }, Strike::Range { min: b_min, max: b_max }) => {
            a_min.total_cmp(b_min).then_with(|| a_max.total_cmp(b_max))
        }
    }
}

/// Section ids compare as sets. Merged-rupture keys hold sorted ids, so the
/// common case borrows both sides.
fn compare_section_ids(a: &RuptureRecord, b: &RuptureRecord) -> Ordering {
    if a.associations.ids == b.associations.ids {
        return Ordering::Equal;
    }
    a.associations.sorted_ids().cmp(&b.associations.sorted_ids())
}

/// True when two ruptures of the same cell share core identity but differ in
/// depth, length or hypocenter.
pub fn has_extent_heterogeneity(cell: &[RuptureRecord]) -> bool {
    if cell.len() < 2 {
        return false;
    }
    let mut sorted: Vec<&RuptureRecord> = cell.iter().collect();
    sorted.sort_by(|a, b| compare_core(a, b));
    sorted.windows(2).any(|pair| {
        compare_core(pair[0], pair[1]) == Ordering::Equal
            && compare_extent(pair[0], pair[1]) != Ordering::Equal
    })
}
