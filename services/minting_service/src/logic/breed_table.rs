//! Weighted breed table and the cumulative-bucket resolver.
//!
//! Every collection declares an ordered list of breeds with integer
//! probability weights that must sum to exactly [`MAX_CHANCE`]. Resolution
//! maps an already-reduced random value ("modded rng") onto a breed index by
//! scanning cumulative thresholds in table order: bucket *i* covers
//! `[cum(i-1), cum(i))`, so the declared order determines bucket assignment.
//!
//! The resolver never reduces raw provider words itself. The caller performs
//! `word % MAX_CHANCE` so that the domain-reduction policy stays explicit and
//! testable in isolation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of the resolver's input domain: valid modded rng values are
/// `0..MAX_CHANCE`, regardless of how many breeds the table declares.
pub const MAX_CHANCE: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BreedTableError {
    /// The weight table itself is unusable. Fatal, detected at construction
    /// (or by the scan invariant check, which indicates a bug).
    #[error("invalid breed table: {0}")]
    Configuration(String),

    /// The resolver was called outside its declared `[0, MAX_CHANCE)` domain.
    #[error("modded rng {0} outside [0, {MAX_CHANCE})")]
    RangeOutOfBounds(u32),
}

/// A named category an asset can be minted into, with its probability weight
/// in percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breed {
    pub name: String,
    pub weight: u32,
}

impl Breed {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Validated, ordered weight table.
#[derive(Debug, Clone)]
pub struct BreedTable {
    breeds: Vec<Breed>,
}

impl BreedTable {
    /// Builds a table, rejecting empty input and weights that do not sum to
    /// exactly [`MAX_CHANCE`].
    pub fn new(breeds: Vec<Breed>) -> Result<Self, BreedTableError> {
        if breeds.is_empty() {
            return Err(BreedTableError::Configuration(
                "breed table is empty".into(),
            ));
        }

        let total: u32 = breeds.iter().map(|b| b.weight).sum();
        if total != MAX_CHANCE {
            return Err(BreedTableError::Configuration(format!(
                "breed weights sum to {total}, expected {MAX_CHANCE}"
            )));
        }

        Ok(Self { breeds })
    }

    /// Maps a modded rng in `[0, MAX_CHANCE)` to the index of the first breed
    /// whose cumulative weight strictly exceeds it.
    pub fn resolve(&self, modded_rng: u32) -> Result<usize, BreedTableError> {
        if modded_rng >= MAX_CHANCE {
            return Err(BreedTableError::RangeOutOfBounds(modded_rng));
        }

        let mut cumulative = 0u32;
        for (index, breed) in self.breeds.iter().enumerate() {
            cumulative += breed.weight;
            if modded_rng < cumulative {
                return Ok(index);
            }
        }

        // Unreachable for a table that passed construction validation.
        Err(BreedTableError::Configuration(format!(
            "no bucket covers modded rng {modded_rng}; weights are inconsistent"
        )))
    }

    pub fn get(&self, index: usize) -> Option<&Breed> {
        self.breeds.get(index)
    }

    pub fn breeds(&self) -> &[Breed] {
        &self.breeds
    }

    pub fn len(&self) -> usize {
        self.breeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(weights: &[u32]) -> BreedTable {
        BreedTable::new(
            weights
                .iter()
                .enumerate()
                .map(|(i, w)| Breed::new(format!("breed-{i}"), *w))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_table() {
        let err = BreedTable::new(vec![]).unwrap_err();
        assert!(matches!(err, BreedTableError::Configuration(_)));
    }

    #[test]
    fn rejects_weights_summing_below_and_above_hundred() {
        for weights in [[10u32, 30, 59], [10, 30, 61]] {
            let breeds = weights
                .iter()
                .map(|w| Breed::new("x", *w))
                .collect::<Vec<_>>();
            let err = BreedTable::new(breeds).unwrap_err();
            assert!(matches!(err, BreedTableError::Configuration(_)));
        }
    }

    #[test]
    fn buckets_are_contiguous_and_match_declared_weights() {
        // weights [10, 35, 30, 25] => 0..9 -> 0, 10..44 -> 1, 45..74 -> 2, 75..99 -> 3
        let t = table(&[10, 35, 30, 25]);

        let expected = |rng: u32| match rng {
            0..=9 => 0usize,
            10..=44 => 1,
            45..=74 => 2,
            _ => 3,
        };

        for rng in 0..MAX_CHANCE {
            assert_eq!(t.resolve(rng).unwrap(), expected(rng), "rng={rng}");
        }
    }

    #[test]
    fn bucket_boundaries_are_half_open() {
        let t = table(&[10, 20, 70]);
        assert_eq!(t.resolve(0).unwrap(), 0);
        assert_eq!(t.resolve(9).unwrap(), 0);
        assert_eq!(t.resolve(10).unwrap(), 1);
        assert_eq!(t.resolve(29).unwrap(), 1);
        assert_eq!(t.resolve(30).unwrap(), 2);
        assert_eq!(t.resolve(99).unwrap(), 2);
    }

    #[test]
    fn rejects_rng_at_and_above_domain_edge() {
        let t = table(&[25, 25, 25, 25]);
        assert_eq!(
            t.resolve(MAX_CHANCE).unwrap_err(),
            BreedTableError::RangeOutOfBounds(MAX_CHANCE)
        );
        assert_eq!(
            t.resolve(200).unwrap_err(),
            BreedTableError::RangeOutOfBounds(200)
        );
    }

    #[test]
    fn assignment_follows_declared_order() {
        let forward = BreedTable::new(vec![Breed::new("rare", 10), Breed::new("common", 90)]).unwrap();
        let reversed = BreedTable::new(vec![Breed::new("common", 90), Breed::new("rare", 10)]).unwrap();

        assert_eq!(forward.get(forward.resolve(5).unwrap()).unwrap().name, "rare");
        assert_eq!(
            reversed.get(reversed.resolve(5).unwrap()).unwrap().name,
            "common"
        );
    }
}
