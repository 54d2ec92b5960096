/*!
The per-patch initial state: stable ids in sorted order, carrying capacity,
and starting population. This is the boundary where upstream habitat data
(patch polygons, areas, impact layers) has already been reduced to numbers.
 */

use serde_derive::{Deserialize, Serialize};

use crate::{ConfigError, PatchId};

/// The largest patch starts with this many individuals; all others scale
/// proportionally by area.
pub const SEED_AT_LARGEST: f64 = 1.0e7;

/// Patches that would seed below this count get exactly this count, so that
/// small habitat fragments do not start effectively extinct.
pub const SEED_FLOOR: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patches {
    pub ids: Vec<PatchId>,
    pub capacity: Vec<f64>,
    pub population: Vec<f64>,
}

impl Patches {
    /**
    Build the table from `(id, capacity, population)` rows. Rows are sorted
    by id (this ordering is what matrix columns and population indices mean
    everywhere else) and duplicate ids or negative values are rejected.
     */
    pub fn new(mut rows: Vec<(PatchId, f64, f64)>) -> Result<Patches, ConfigError> {
        rows.sort_by_key(|row| row.0);
        for pair in rows.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(ConfigError::DuplicatePatch { id: pair[0].0 });
            }
        }
        for (index, &(_, capacity, population)) in rows.iter().enumerate() {
            if !capacity.is_finite() || capacity < 0.0 {
                return Err(ConfigError::InvalidCapacity {
                    index,
                    value: capacity,
                });
            }
            if !population.is_finite() || population < 0.0 {
                return Err(ConfigError::InvalidPopulation {
                    index,
                    value: population,
                });
            }
        }
        Ok(Patches {
            ids: rows.iter().map(|row| row.0).collect(),
            capacity: rows.iter().map(|row| row.1).collect(),
            population: rows.iter().map(|row| row.2).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/**
Area-proportional seeding: the largest patch receives [`SEED_AT_LARGEST`]
individuals, every other patch receives its area's share, anything below
[`SEED_FLOOR`] is raised to the floor, and counts are rounded to whole
individuals. The same numbers double as carrying capacities when none are
given explicitly.
 */
pub fn population_from_area(areas: &[f64]) -> Vec<f64> {
    let max_area = areas.iter().cloned().fold(0.0, f64::max);
    if max_area <= 0.0 {
        return vec![0.0; areas.len()];
    }
    areas
        .iter()
        .map(|&area| {
            let seeded = area * SEED_AT_LARGEST / max_area;
            if seeded < SEED_FLOOR {
                SEED_FLOOR
            } else {
                seeded.round()
            }
        })
        .collect()
}
