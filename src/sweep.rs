/*!
The parameter sweep: every combination of matrix variant, dispersal
proportion and mortality rate is one independent scenario. Scenarios share
nothing mutable (each gets a fresh copy of the population, its own augmented
matrix, and its own seeded generator), so they are fanned out across the
rayon pool and their outcomes collected in a shared map.
 */

use std::hash::Hasher;
use std::time::Instant;

use dashmap::DashMap;
use itertools::iproduct;
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};
use serde_derive::{Deserialize, Serialize};

use crate::matrix::DispersalMatrix;
use crate::patches::Patches;
use crate::{run, ConfigError, Parameters, PatchId, RunOutcome, State};

/**
One point of the parameter grid. The variant name identifies which rescaling
of the connectivity matrix the scenario runs on.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub variant: String,
    pub dispersal_proportion: f64,
    pub mortality: f64,
}

impl Scenario {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dispersal_proportion > 0.0 && self.dispersal_proportion <= 1.0) {
            return Err(ConfigError::DispersalProportion(self.dispersal_proportion));
        }
        if !(self.mortality >= 0.0 && self.mortality < 1.0) {
            return Err(ConfigError::Mortality(self.mortality));
        }
        Ok(())
    }

    /**
    Canonical result key, e.g. `probavg_BASE_prop025_m15` for proportion
    0.25 under mortality 0.15: the proportion keeps all its digits with the
    dot removed, the mortality keeps only its fractional digits.
     */
    pub fn label(&self) -> String {
        let prop = format!("{}", self.dispersal_proportion).replace('.', "");
        let mort = match format!("{}", self.mortality).split_once('.') {
            Some((_, fractional)) => fractional.to_string(),
            None => "0".to_string(),
        };
        format!("{}_prop{}_m{}", self.variant, prop, mort)
    }

    /**
    Per-scenario generator seed, derived from the base seed and the label
    with a deterministic hasher. Two sweeps with the same base seed give
    every scenario the same stream no matter in which order, or on how many
    threads, the scenarios execute.
     */
    pub fn seed(&self, base: u64) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_u64(base);
        hasher.write(self.label().as_bytes());
        hasher.finish()
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    pub patch_ids: Vec<PatchId>,
    pub outcomes: FxHashMap<String, RunOutcome>,
}

/**
Run the full grid. Structural problems in the shared inputs, such as a
matrix whose size disagrees with the patch table, abort the sweep before any
scenario starts. Problems scoped to a single scenario's inputs (an out-of-range rate,
a variant whose columns carry too much mass) skip just the affected
scenarios with a warning; the rest of the sweep proceeds.
 */
pub fn run_sweep(
    variants: &[(String, DispersalMatrix)],
    patches: &Patches,
    proportions: &[f64],
    mortalities: &[f64],
    p: &Parameters,
) -> Result<SweepResults, ConfigError> {
    for (_, matrix) in variants {
        if matrix.size() != patches.len() {
            return Err(ConfigError::PatchMismatch {
                matrix: matrix.size(),
                patches: patches.len(),
            });
        }
    }

    let outcomes: DashMap<String, RunOutcome> = DashMap::new();
    let grid: Vec<_> = iproduct!(
        variants.iter(),
        proportions.iter().copied(),
        mortalities.iter().copied()
    )
    .collect();

    grid.into_par_iter()
        .for_each(|((variant, matrix), dispersal_proportion, mortality)| {
            let scenario = Scenario {
                variant: variant.clone(),
                dispersal_proportion,
                mortality,
            };
            let label = scenario.label();
            if let Err(e) = scenario.validate() {
                warn!("skipping {}: {}", label, e);
                return;
            }
            let mut working = matrix.clone();
            if p.remove_retention {
                working.zero_diagonal();
            }
            let augmented = match working.augment() {
                Ok(augmented) => augmented,
                Err(e) => {
                    warn!("skipping {}: {}", label, e);
                    return;
                }
            };
            let mut state = match State::new(
                patches.population.clone(),
                patches.capacity.clone(),
                augmented,
            ) {
                Ok(state) => state,
                Err(e) => {
                    warn!("skipping {}: {}", label, e);
                    return;
                }
            };
            let mut rng = SmallRng::seed_from_u64(scenario.seed(p.seed));
            let begun = Instant::now();
            let outcome = run(&mut state, &scenario, p, &mut rng);
            info!(
                "{}: {} of {} patches persist after {} steps ({:.2?})",
                label,
                outcome.occupancy.count_ones(),
                patches.len(),
                p.timesteps,
                begun.elapsed()
            );
            outcomes.insert(label, outcome);
        });

    Ok(SweepResults {
        patch_ids: patches.ids.clone(),
        outcomes: outcomes.into_iter().collect(),
    })
}
