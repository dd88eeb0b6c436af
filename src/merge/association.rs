//! Section Association Accumulation
//!
//! Union-by-id of the sparse fault-section association lists of matched
//! ruptures. Ids keep their first-seen order.

use super::sum::ExactSum;
use crate::model::SectionAssociations;

#[derive(Debug, Clone, Default)]
pub struct AssociationAccumulator {
    ids: Vec<u32>,
    weighted_sums: Vec<ExactSum>,
}

impl AssociationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, associations: &SectionAssociations, weight: f64) {
        for (id, fraction) in associations.iter() {
            let slot = match self.ids.iter().position(|&seen| seen == id) {
                Some(slot) => slot,
                None => {
                    self.ids.push(id);
                    self.weighted_sums.push(ExactSum::new());
                    self.ids.len() - 1
                }
            };
            self.weighted_sums[slot].add(fraction * weight);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn finalize(self, total_weight: f64) -> SectionAssociations {
        let fractions = self
            .weighted_sums
            .iter()
            .map(|sum| sum.value() / total_weight)
            .collect();
        SectionAssociations::new(self.ids, fractions)
    }
}
