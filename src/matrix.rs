/*!
Dense connectivity matrices. `w[i][j]` is the probability that a disperser
leaving the patch at column `j` recruits at the patch at row `i`; whatever
probability mass a column does not assign to real destinations is the
column's loss. Storage is column-major so that the routing step reads one
contiguous slice per source patch.
 */

use crate::{ConfigError, PatchId};

/// Column sums are allowed to overshoot 1 by at most this much before the
/// overshoot is treated as a configuration error rather than float noise.
pub const COLUMN_TOLERANCE: f64 = 1e-9;

#[derive(Clone)]
pub struct DispersalMatrix {
    n: usize,
    w: Vec<f64>,
}

impl DispersalMatrix {
    /**
    Build from a dense row-major layout, as produced by pivoting an edge
    table. Every row must have the same length as the number of rows, and
    every entry must be a finite non-negative probability.
     */
    pub fn from_dense(rows: &[Vec<f64>]) -> Result<DispersalMatrix, ConfigError> {
        let n = rows.len();
        for row in rows {
            if row.len() != n {
                return Err(ConfigError::NonSquare {
                    rows: n,
                    cols: row.len(),
                });
            }
        }
        let mut w = vec![0.0; n * n];
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidWeight {
                        from: j as PatchId,
                        to: i as PatchId,
                        value,
                    });
                }
                w[j * n + i] = value;
            }
        }
        Ok(DispersalMatrix { n, w })
    }

    /**
    Build from an edge mapping `(source id, destination id) → probability`
    against a sorted patch-id ordering. Pairs not present in the mapping get
    probability zero; ids not present in the ordering are configuration
    errors.
     */
    pub fn from_edges<I>(ids: &[PatchId], edges: I) -> Result<DispersalMatrix, ConfigError>
    where
        I: IntoIterator<Item = (PatchId, PatchId, f64)>,
    {
        let n = ids.len();
        let mut w = vec![0.0; n * n];
        for (from, to, prob) in edges {
            let j = ids
                .binary_search(&from)
                .map_err(|_| ConfigError::UnknownPatch { id: from })?;
            let i = ids
                .binary_search(&to)
                .map_err(|_| ConfigError::UnknownPatch { id: to })?;
            if !prob.is_finite() || prob < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    from,
                    to,
                    value: prob,
                });
            }
            w[j * n + i] = prob;
        }
        Ok(DispersalMatrix { n, w })
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, to: usize, from: usize) -> f64 {
        self.w[from * self.n + to]
    }

    /// Remove self-recruitment, for runs that model zero retention.
    pub fn zero_diagonal(&mut self) {
        for j in 0..self.n {
            self.w[j * self.n + j] = 0.0;
        }
    }

    /**
    Append the synthetic loss row: `loss[j] = 1 − Σ_i w[i][j]`, making every
    column a complete discrete distribution over real destinations plus the
    loss destination. A column whose mass already exceeds 1 (beyond float
    tolerance) cannot be completed and is a configuration error.
     */
    pub fn augment(&self) -> Result<Augmented, ConfigError> {
        let n = self.n;
        let mut w = vec![0.0; (n + 1) * n];
        for j in 0..n {
            let column = &self.w[j * n..(j + 1) * n];
            let mass: f64 = column.iter().sum();
            if mass > 1.0 + COLUMN_TOLERANCE {
                return Err(ConfigError::ColumnMass {
                    column: j,
                    sum: mass,
                });
            }
            w[j * (n + 1)..j * (n + 1) + n].copy_from_slice(column);
            w[j * (n + 1) + n] = (1.0 - mass).max(0.0);
        }
        Ok(Augmented { n, w })
    }
}

/**
A dispersal matrix with the loss row in place, immutable for the rest of the
run. Shape is `(patches + 1) × patches`; `column(j)` is the full destination
distribution of source `j`, with the loss probability last.
 */
#[derive(Clone)]
pub struct Augmented {
    n: usize,
    w: Vec<f64>,
}

impl Augmented {
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn column(&self, j: usize) -> &[f64] {
        &self.w[j * (self.n + 1)..(j + 1) * (self.n + 1)]
    }
}
