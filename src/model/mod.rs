//! Forecast Model
//!
//! Value types shared by the merge engine and its host: grid locations,
//! rupture records and whole realizations.

pub mod location;
pub mod rupture;
pub mod source;

pub use location::{GridLocations, Location};
pub use rupture::{RuptureRecord, SectionAssociations, Strike, TectonicRegion};
pub use source::RealizationSource;
