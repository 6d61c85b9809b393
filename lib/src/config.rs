//! Engine tuning.

use color_eyre::eyre::{self, bail};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Convergence tolerance of the closest-point refinement (radians).
    pub tolerance: f64,
    /// Iteration cap of the closest-point refinement.
    pub max_iterations: u64,
    /// Added to both sides of the periapsis/apoapsis envelope test (`m`).
    pub envelope_margin: f64,
    /// How many segments of a trajectory are searched.
    pub patch_limit: usize,
    /// Resolution of the initial closest-point scan.
    pub scan_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.001,
            max_iterations: 10,
            envelope_margin: 0.0,
            patch_limit: 3,
            scan_samples: 120,
        }
    }
}

impl EngineConfig {
    pub fn validate(self) -> eyre::Result<Self> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            bail!("tolerance must be positive, got {}", self.tolerance);
        }
        if self.max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }
        if !(self.envelope_margin.is_finite() && self.envelope_margin >= 0.0) {
            bail!(
                "envelope_margin must be a non-negative distance, got {}",
                self.envelope_margin
            );
        }
        if self.patch_limit == 0 {
            bail!("patch_limit must be at least 1");
        }
        if self.scan_samples < 8 {
            bail!("scan_samples must be at least 8, got {}", self.scan_samples);
        }
        Ok(self)
    }
}
