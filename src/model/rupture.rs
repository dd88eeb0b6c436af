//! Rupture Records
//!
//! One candidate earthquake at one grid location. Records are built once by
//! whoever produces a realization and are only ever read by the merge engine.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Seismogenic setting partitioning the ruptures of a realization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TectonicRegion {
    ActiveShallow,
    StableShallow,
    SubductionInterface,
    SubductionSlab,
    Volcanic,
}

impl TectonicRegion {
    pub const ALL: [TectonicRegion; 5] = [
        TectonicRegion::ActiveShallow,
        TectonicRegion::StableShallow,
        TectonicRegion::SubductionInterface,
        TectonicRegion::SubductionSlab,
        TectonicRegion::Volcanic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TectonicRegion::ActiveShallow => "active shallow",
            TectonicRegion::StableShallow => "stable shallow",
            TectonicRegion::SubductionInterface => "subduction interface",
            TectonicRegion::SubductionSlab => "subduction slab",
            TectonicRegion::Volcanic => "volcanic",
        }
    }
}

impl fmt::Display for TectonicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strike of a focal mechanism: a single azimuth, or a range the rupture
/// may take (e.g. 0..360 for a point source of unknown orientation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strike {
    Fixed(f64),
    Range { min: f64, max: f64 },
}

impl Strike {
    pub fn fixed(azimuth: f64) -> Self {
        Strike::Fixed(azimuth)
    }

    pub fn range(min: f64, max: f64) -> Self {
        Strike::Range { min, max }
    }

    /// Unknown orientation.
    pub fn any() -> Self {
        Strike::Range { min: 0.0, max: 360.0 }
    }
}

/// Sparse fault-section associations, stored as parallel arrays the way host
/// archives encode them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionAssociations {
    pub ids: Vec<u32>,
    pub fractions: Vec<f64>,
}

impl SectionAssociations {
    pub fn new(ids: Vec<u32>, fractions: Vec<f64>) -> Self {
        Self { ids, fractions }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.ids.iter().copied().zip(self.fractions.iter().copied())
    }

    /// Fraction for `id`, if associated.
    pub fn fraction_of(&self, id: u32) -> Option<f64> {
        self.iter().find(|(i, _)| *i == id).map(|(_, f)| f)
    }

    pub fn is_sorted(&self) -> bool {
        self.ids.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Ids in ascending order, borrowed when already sorted.
    pub fn sorted_ids(&self) -> Cow<'_, [u32]> {
        if self.is_sorted() {
            return Cow::Borrowed(&self.ids);
        }
        let mut ids = self.ids.clone();
        ids.sort_unstable();
        Cow::Owned(ids)
    }

    /// Same pairs, ordered by section id.
    pub fn sorted(&self) -> Self {
        let mut pairs: Vec<(u32, f64)> = self.iter().collect();
        pairs.sort_by_key(|(id, _)| *id);
        let (ids, fractions) = pairs.into_iter().unzip();
        Self { ids, fractions }
    }

    /// Returns a description of the first problem found, if any.
    pub fn check(&self) -> Result<(), String> {
        if self.ids.len() != self.fractions.len() {
            return Err(format!(
                "{} section ids but {} fractions",
                self.ids.len(),
                self.fractions.len()
            ));
        }
        for (id, fraction) in self.iter() {
            if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
                return Err(format!("fraction {} for section {} is outside [0, 1]", fraction, id));
            }
        }
        Ok(())
    }
}

/// One candidate earthquake at one grid location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuptureRecord {
    pub grid_index: usize,
    pub magnitude: f64,
    /// Annual rate of occurrence
    pub rate: f64,
    pub rake: f64,
    pub dip: f64,
    pub strike: Strike,
    /// Depth to the top of rupture (km)
    pub upper_depth: f64,
    /// Depth to the bottom of rupture (km)
    pub lower_depth: f64,
    /// Rupture length along strike (km)
    pub length: f64,
    /// `None` means the midpoint of `[upper_depth, lower_depth]`
    pub hypocentral_depth: Option<f64>,
    /// Along-strike hypocenter position (DAS); `None` means `length / 2`
    pub hypocentral_das: Option<f64>,
    pub tectonic_region: TectonicRegion,
    #[serde(default)]
    pub associations: SectionAssociations,
}

impl RuptureRecord {
    /// Vertical strike-slip point rupture of unknown strike, at the surface.
    pub fn new(grid_index: usize, tectonic_region: TectonicRegion, magnitude: f64, rate: f64) -> Self {
        Self {
            grid_index,
            magnitude,
            rate,
            rake: 0.0,
            dip: 90.0,
            strike: Strike::any(),
            upper_depth: 0.0,
            lower_depth: 0.0,
            length: 0.0,
            hypocentral_depth: None,
            hypocentral_das: None,
            tectonic_region,
            associations: SectionAssociations::default(),
        }
    }

    pub fn with_mechanism(mut self, rake: f64, dip: f64, strike: Strike) -> Self {
        self.rake = rake;
        self.dip = dip;
        self.strike = strike;
        self
    }

    pub fn with_depths(mut self, upper_depth: f64, lower_depth: f64) -> Self {
        self.upper_depth = upper_depth;
        self.lower_depth = lower_depth;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn with_hypocenter(mut self, depth: Option<f64>, das: Option<f64>) -> Self {
        self.hypocentral_depth = depth;
        self.hypocentral_das = das;
        self
    }

    pub fn with_associations(mut self, associations: SectionAssociations) -> Self {
        self.associations = associations;
        self
    }

    /// This record with its section ids in ascending order, which is the form
    /// kept as the key of a merged rupture. Borrowed when already sorted.
    pub fn with_sorted_associations(&self) -> Cow<'_, RuptureRecord> {
        if self.associations.is_sorted() {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(RuptureRecord { associations: self.associations.sorted(), ..self.clone() })
        }
    }

    pub fn default_hypocentral_depth(&self) -> f64 {
        midpoint(self.upper_depth, self.lower_depth)
    }

    pub fn default_hypocentral_das(&self) -> f64 {
        0.5 * self.length
    }

    pub fn effective_hypocentral_depth(&self) -> f64 {
        self.hypocentral_depth.unwrap_or_else(|| self.default_hypocentral_depth())
    }

    pub fn effective_hypocentral_das(&self) -> f64 {
        self.hypocentral_das.unwrap_or_else(|| self.default_hypocentral_das())
    }

    /// True when the hypocentral depth was set to something other than this
    /// record's own midpoint.
    pub fn has_explicit_hypocentral_depth(&self) -> bool {
        self.hypocentral_depth
            .map_or(false, |depth| depth != self.default_hypocentral_depth())
    }

    pub fn has_explicit_hypocentral_das(&self) -> bool {
        self.hypocentral_das
            .map_or(false, |das| das != self.default_hypocentral_das())
    }

    /// Returns a description of the first geometry or rate problem, if any.
    /// Associations are checked separately by [`SectionAssociations::check`].
    pub fn check(&self) -> Result<(), String> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(format!("rate {} must be finite and non-negative", self.rate));
        }
        if !self.length.is_finite() || self.length < 0.0 {
            return Err(format!("length {} must be finite and non-negative", self.length));
        }
        let scalars = [
            ("magnitude", self.magnitude),
            ("rake", self.rake),
            ("dip", self.dip),
            ("upper depth", self.upper_depth),
            ("lower depth", self.lower_depth),
        ];
        if let Some((name, value)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{} {} is not finite", name, value));
        }
        if self.upper_depth > self.lower_depth {
            return Err(format!(
                "upper depth {} is below lower depth {}",
                self.upper_depth, self.lower_depth
            ));
        }
        if let Some(depth) = self.hypocentral_depth.filter(|d| !d.is_finite()) {
            return Err(format!("hypocentral depth {} is not finite", depth));
        }
        if let Some(das) = self.hypocentral_das.filter(|d| !d.is_finite()) {
            return Err(format!("hypocentral DAS {} is not finite", das));
        }
        Ok(())
    }
}

pub(crate) fn midpoint(upper: f64, lower: f64) -> f64 {
    0.5 * (upper + lower)
}
