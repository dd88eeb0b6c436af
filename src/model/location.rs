use serde::{Deserialize, Serialize};
use crate::error::{MergeError, Result};

/// A grid node in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    fn same_as(&self, other: &Location) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
    }
}

/// Ordered set of grid locations shared by every realization of an ensemble.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridLocations {
    locations: Vec<Location>,
}

impl GridLocations {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Location> {
        self.locations.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    /// Checks that `other` has the same count and the same coordinates, in order.
    ///
    /// Coordinates are compared bit for bit: both grids are expected to come
    /// from the same gridded region definition.
    pub fn ensure_same_shape(&self, other: &GridLocations) -> Result<()> {
        if self.len() != other.len() {
            return Err(MergeError::GridSizeMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        for (index, (expected, found)) in self.locations.iter().zip(&other.locations).enumerate() {
            if !expected.same_as(found) {
                return Err(MergeError::GridLocationMismatch {
                    index,
                    expected_lat: expected.latitude,
                    expected_lon: expected.longitude,
                    found_lat: found.latitude,
                    found_lon: found.longitude,
                });
            }
        }
        Ok(())
    }
}

impl From<Vec<Location>> for GridLocations {
    fn from(locations: Vec<Location>) -> Self {
        Self::new(locations)
    }
}
