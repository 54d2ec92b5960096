/*!
Model Description
=================

# 1. Purpose

This crate simulates the persistence of a metapopulation on a network of
habitat patches connected by dispersal probabilities. Each patch holds a
population bounded by a fixed carrying capacity; every time step the
population suffers mortality, reproduces, and sends a stochastic number of
dispersers along the weighted edges of the connectivity matrix. A patch
persists if it is still occupied at the end of a run. The demographic core
follows the stochastic metacommunity formulation of Thompson et al. (2020),
reduced to a single species with hard density ceilings.

The interesting output is not a single run but a sweep: the same patch
network is simulated under a grid of scenario parameters, crossing several
"naturalness" variants of the connectivity matrix (the same topology under
different impact rescalings) with a list of dispersal proportions and a list
of mortality rates, and the per-patch persistence outcome is collected for
every combination.

# 2. Entities, state variables, and scales

The model state is a population vector indexed by patch, together with the
fixed capacity vector and the augmented dispersal matrix (see [`matrix`]).
Time is discrete; a run advances a fixed number of steps (1750 by default).
There are no agents below the patch level: individuals only exist as integer
counts realized by Poisson draws.

# 3. Process overview and scheduling

Within a scenario, steps are strictly sequential: each step consumes the
realized (stochastic) output of the previous one. Scenarios are independent,
nothing carries over between them, and they are therefore run in parallel,
each with its own seeded generator.

# 4. Stochasticity

Three sources, all drawn from an explicitly passed per-scenario generator:
Poisson demographic noise turning expected populations into whole
individuals, Poisson reproduction noise on the number of dispersers, and a
multinomial routing draw distributing each source's dispersers over the
possible destinations (including the synthetic loss destination for
dispersers that recruit nowhere).

# 5. Observation

Every few steps the binary occupancy pattern is compared against the
previous sample; the correlation between the two patterns and the proportion
of occupied patches form a diagnostic time series (see [`equilibrium`]). The
final occupancy vector is the scenario's persistence outcome.

 */

use bitvec::prelude::BitVec;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

pub mod argparse;
pub mod bit_serde;
pub mod equilibrium;
pub mod matrix;
pub mod parameters;
pub mod patches;
pub mod sweep;
mod debug;

#[cfg(test)]
mod tests;

pub use parameters::Parameters;

/// Time, in discrete steps since the start of a run.
pub type TimeStep = u32;

/// Stable external identifier of a habitat patch. Vector and matrix indices
/// follow the sorted order of these ids.
pub type PatchId = u32;

/**
Everything that can be wrong with the inputs of a run. All of these are
detected before any simulation work happens; none of them is ever corrected
silently.
 */
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("dispersal matrix is not square: row of length {cols} in a matrix of {rows}")]
    NonSquare { rows: usize, cols: usize },
    #[error("invalid weight {value} from patch {from} to patch {to}")]
    InvalidWeight { from: PatchId, to: PatchId, value: f64 },
    #[error("column {column} carries probability mass {sum}, more than 1")]
    ColumnMass { column: usize, sum: f64 },
    #[error("edge references patch {id}, which is not in the patch table")]
    UnknownPatch { id: PatchId },
    #[error("patch {id} appears more than once in the patch table")]
    DuplicatePatch { id: PatchId },
    #[error("invalid capacity {value} at patch index {index}")]
    InvalidCapacity { index: usize, value: f64 },
    #[error("invalid population {value} at patch index {index}")]
    InvalidPopulation { index: usize, value: f64 },
    #[error("no initial population or area given for patch {id}")]
    MissingInitialState { id: PatchId },
    #[error("matrix covers {matrix} patches but the patch table has {patches}")]
    PatchMismatch { matrix: usize, patches: usize },
    #[error("dispersal proportion {0} outside (0, 1]")]
    DispersalProportion(f64),
    #[error("mortality rate {0} outside [0, 1)")]
    Mortality(f64),
}

/**
The mutable state of one scenario run: the population vector, the fixed
capacity vector, and the augmented dispersal matrix. Constructing a `State`
is the moment the loss row is synthesized, so by the time the first step
executes every column of the matrix is a complete probability distribution.
 */
pub struct State {
    /// Current population per patch. Fractional between mortality and the
    /// demographic draw, whole otherwise.
    pub population: Vec<f64>,
    /// Carrying capacity per patch, fixed for the life of the run.
    pub capacity: Vec<f64>,
    /// Dispersal probabilities with the loss row appended.
    pub matrix: matrix::Augmented,
    /// Steps completed so far.
    pub t: TimeStep,
}

impl State {
    pub fn new(
        population: Vec<f64>,
        capacity: Vec<f64>,
        matrix: matrix::Augmented,
    ) -> Result<State, ConfigError> {
        if population.len() != matrix.size() || capacity.len() != matrix.size() {
            return Err(ConfigError::PatchMismatch {
                matrix: matrix.size(),
                patches: population.len(),
            });
        }
        for (index, &value) in capacity.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidCapacity { index, value });
            }
        }
        for (index, &value) in population.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidPopulation { index, value });
            }
        }
        Ok(State {
            population,
            capacity,
            matrix,
            t: 0,
        })
    }
}

/**
What a finished run leaves behind: the final occupancy pattern (the
persistence outcome proper) and the diagnostic equilibrium series sampled
along the way.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    #[serde(with = "crate::bit_serde")]
    pub occupancy: BitVec,
    pub series: Vec<equilibrium::Sample>,
}

/**
Advance the state by one time step. The step has two parts: the demographic
part realizes survival and reproduction per patch, the dispersal part routes
the resulting dispersers through the matrix and applies the capacity
ceiling.
 */
pub fn step<R: Rng>(s: &mut State, scenario: &sweep::Scenario, rng: &mut R) {
    let (adjusted, dispersers) = step_part_1(s, scenario, rng);
    step_part_2(s, &adjusted, &dispersers, rng);
}

/**
The demographic part. Mortality scales the population down, a Poisson draw
turns the continuous expectation into whole surviving individuals, and a
second Poisson draw around `adjusted * dispersal_proportion` realizes the
number of offspring that leave each patch. Dispersers are produced on top of
the settled population, not subtracted from it.
 */
fn step_part_1<R: Rng>(
    s: &mut State,
    scenario: &sweep::Scenario,
    rng: &mut R,
) -> (Vec<u64>, Vec<u64>) {
    for n in s.population.iter_mut() {
        *n *= 1.0 - scenario.mortality;
    }
    let adjusted: Vec<u64> = s
        .population
        .iter()
        .map(|&n| submodels::demography::poisson(n, rng))
        .collect();
    let dispersers: Vec<u64> = adjusted
        .iter()
        .map(|&a| submodels::demography::poisson(a as f64 * scenario.dispersal_proportion, rng))
        .collect();
    (adjusted, dispersers)
}

/**
The dispersal part. Every source column of the augmented matrix is a
complete distribution over `patches + 1` destinations, the last being the
loss destination for dispersers that fail to recruit anywhere. Arrivals at
real destinations are tallied, the loss tally is discarded, and the new
population is the settled individuals plus immigrants, floored at zero and
then capped at capacity. The floor cannot trigger with this arithmetic, but
it is part of the contract and stays ahead of the ceiling.
 */
fn step_part_2<R: Rng>(s: &mut State, adjusted: &[u64], dispersers: &[u64], rng: &mut R) {
    let n = s.matrix.size();
    let mut arrivals = vec![0u64; n];
    for (j, &trials) in dispersers.iter().enumerate() {
        if trials == 0 {
            continue;
        }
        let counts = submodels::dispersal::route(s.matrix.column(j), trials, rng);
        for (i, &c) in counts.iter().take(n).enumerate() {
            arrivals[i] += c;
        }
    }
    for i in 0..n {
        let mut net = adjusted[i] as f64 + arrivals[i] as f64;
        if net < 0.0 {
            net = 0.0;
        }
        s.population[i] = net.min(s.capacity[i]);
    }
}

/**
Run one scenario to completion: `p.timesteps` steps, with the equilibrium
tracker sampling the occupancy pattern every `p.sample_stride` steps
(starting from the initial pattern, so the first emitted sample compares
step 0 against step `sample_stride`).
 */
pub fn run<R: Rng>(
    s: &mut State,
    scenario: &sweep::Scenario,
    p: &Parameters,
    rng: &mut R,
) -> RunOutcome {
    let mut tracker = equilibrium::Tracker::new(p.sample_stride);
    tracker.observe(s.t, &s.population);
    while s.t < p.timesteps {
        step(s, scenario, rng);
        s.t += 1;
        if p.log_every > 0 && s.t % p.log_every == 0 {
            log::debug!(
                "t {:}: {:} of {:} patches occupied",
                s.t,
                s.population.iter().filter(|&&n| n > 0.0).count(),
                s.population.len()
            );
        }
        tracker.observe(s.t, &s.population);
    }
    RunOutcome {
        occupancy: equilibrium::occupancy(&s.population),
        series: tracker.into_samples(),
    }
}

/**
# 6. Submodels

 */
pub mod submodels {
    /**
    Demographic noise. Both the survival adjustment and the disperser count
    are Poisson realizations of a continuous expectation; a zero or empty
    expectation yields zero individuals, which is a well-defined draw and
    not an error.
     */
    pub mod demography {
        use rand::Rng;
        use rand_distr::{Distribution, Poisson};

        pub fn poisson<R: Rng>(lambda: f64, rng: &mut R) -> u64 {
            if lambda <= 0.0 {
                return 0;
            }
            match Poisson::new(lambda) {
                Ok(d) => {
                    let drawn: f64 = d.sample(rng);
                    drawn as u64
                }
                Err(_) => 0,
            }
        }
    }

    /**
    Stochastic routing of dispersers over a probability column.
     */
    pub mod dispersal {
        use rand::Rng;
        use rand_distr::{Binomial, Distribution};

        /**
        Distribute `trials` dispersers over the destinations of one source
        column. Equivalent to drawing one categorical sample per individual
        and tallying, but realized as a chain of conditional binomial draws,
        which costs one draw per destination instead of one per individual.
        The last destination absorbs whatever remains, so counts always sum
        to `trials`.
         */
        pub fn route<R: Rng>(column: &[f64], trials: u64, rng: &mut R) -> Vec<u64> {
            let mut counts = vec![0u64; column.len()];
            let mut remaining = trials;
            let mut mass_left: f64 = column.iter().sum();
            for (dest, &p) in column.iter().enumerate() {
                if remaining == 0 {
                    break;
                }
                if dest + 1 == column.len() {
                    counts[dest] = remaining;
                    break;
                }
                let q = if mass_left > 0.0 {
                    (p / mass_left).min(1.0)
                } else {
                    1.0
                };
                let drawn = if q >= 1.0 {
                    remaining
                } else {
                    match Binomial::new(remaining, q) {
                        Ok(d) => d.sample(rng),
                        Err(_) => 0,
                    }
                };
                counts[dest] = drawn;
                remaining -= drawn;
                mass_left -= p;
            }
            counts
        }
    }
}
