use serde::{Deserialize, Serialize};

/// Gaussian belief about a player's long-run value per possession.
///
/// `variance` is strictly positive for every rating produced by a prior or by
/// [`Rating::fuse`] from valid inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mean: f64,
    pub variance: f64,
}

impl Rating {
    #[must_use]
    pub const fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Precision-weighted fusion of this belief with one noisy observation.
    ///
    /// This is a single Kalman update with no process noise: the posterior
    /// precision is the sum of the two precisions and the posterior mean is the
    /// variance-weighted average of the prior mean and the observation.
    ///
    /// ```
    /// use vpp_engine::Rating;
    ///
    /// let posterior = Rating::new(1.0, 0.5).fuse(0.5, 0.3);
    /// let s2 = 0.3 * 0.3;
    /// assert!((posterior.variance - 1.0 / (1.0 / 0.5 + 1.0 / s2)).abs() < 1e-12);
    /// assert!((posterior.mean - (1.0 * s2 + 0.5 * 0.5) / (s2 + 0.5)).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn fuse(self, observation: f64, noise_sd: f64) -> Self {
        let s2 = noise_sd * noise_sd;
        let variance = 1.0 / (1.0 / self.variance + 1.0 / s2);
        let mean = (self.mean * s2 + observation * self.variance) / (s2 + self.variance);
        Self { mean, variance }
    }
}
