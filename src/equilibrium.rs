/*!
Equilibrium diagnostics. Persistence runs do not converge in the population
numbers (patches blink in and out of occupancy indefinitely) but the binary
occupancy *pattern* stabilizes. The tracker samples that pattern on a
fixed stride and reports how correlated each sample is with the previous
one, plus the proportion of patches occupied. Callers wanting adaptive
stopping can watch the series; the reference sweep just records it.
 */

use bitvec::prelude::{BitSlice, BitVec};
use serde_derive::{Deserialize, Serialize};

use crate::TimeStep;

/// The binary occupancy pattern: bit `i` is set iff patch `i` currently
/// holds at least one individual.
pub fn occupancy(population: &[f64]) -> BitVec {
    population.iter().map(|&n| n > 0.0).collect()
}

pub fn proportion_occupied(bits: &BitSlice) -> f64 {
    if bits.is_empty() {
        return 0.0;
    }
    bits.count_ones() as f64 / bits.len() as f64
}

/**
Pearson correlation between two binary vectors of equal length. When either
side has zero variance (all patches occupied, or none), the coefficient is
undefined; such a pattern cannot have changed in any direction, so it is
reported as perfectly stable rather than as a NaN.

```
use bitvec::prelude::*;
use model::equilibrium::correlation;

let a = bitvec![1, 1, 1, 0];
assert_eq!(correlation(&a, &a), 1.0);

let saturated = bitvec![1, 1, 1, 1];
assert_eq!(correlation(&saturated, &saturated), 1.0);
```
 */
pub fn correlation(a: &BitSlice, b: &BitSlice) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len() as f64;
    let ones_a = a.count_ones() as f64;
    let ones_b = b.count_ones() as f64;
    let var_a = ones_a * (n - ones_a);
    let var_b = ones_b * (n - ones_b);
    if var_a == 0.0 || var_b == 0.0 {
        return 1.0;
    }
    let both = a
        .iter()
        .by_vals()
        .zip(b.iter().by_vals())
        .filter(|&(x, y)| x && y)
        .count() as f64;
    (n * both - ones_a * ones_b) / (var_a * var_b).sqrt()
}

/// One record of the diagnostic series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub step: TimeStep,
    pub correlation: f64,
    pub proportion_occupied: f64,
}

/**
Samples the occupancy pattern every `stride` steps and appends one
[`Sample`] per comparison. The first observation only seeds the comparison
window; records are emitted from the second sampled step on, in time order,
and never revisited.
 */
pub struct Tracker {
    stride: TimeStep,
    previous: Option<BitVec>,
    samples: Vec<Sample>,
}

impl Tracker {
    pub fn new(stride: TimeStep) -> Tracker {
        Tracker {
            stride,
            previous: None,
            samples: Vec::new(),
        }
    }

    /// Feed the current population; does nothing between sampling steps.
    pub fn observe(&mut self, step: TimeStep, population: &[f64]) {
        if self.stride == 0 || step % self.stride != 0 {
            return;
        }
        let current = occupancy(population);
        if let Some(previous) = &self.previous {
            self.samples.push(Sample {
                step,
                correlation: correlation(previous, &current),
                proportion_occupied: proportion_occupied(&current),
            });
        }
        self.previous = Some(current);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}
