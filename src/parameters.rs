use serde_derive::{Deserialize, Serialize};

use crate::TimeStep;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Parameters {
    /// Steps per scenario run.
    pub timesteps: TimeStep,
    /// Period of equilibrium sampling, in steps.
    pub sample_stride: TimeStep,
    /// Period of per-run progress logging, in steps. 0 disables.
    pub log_every: TimeStep,
    /// Base seed; every scenario derives its own generator from this.
    pub seed: u64,
    /// Zero the matrix diagonal before running, removing self-recruitment.
    pub remove_retention: bool,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            // Occupancy patterns kept drifting past 1000 steps on the larger
            // test matrices; 1750 left a comfortable margin on all of them.
            timesteps: 1750,
            sample_stride: 5,
            log_every: 50,
            seed: 42,
            remove_retention: false,
        }
    }
}
