//! League-wide belief parameters and the possessions → observation noise predictor.

use serde::{Deserialize, Serialize};

use crate::{AnnotatedRecord, ModelError, PerformanceRecord, Rating};

/// Number of evenly spaced points the predictor is checked at on construction.
const DOMAIN_CHECK_POINTS: u32 = 64;

/// Predicts the standard deviation of one game's value per possession from the
/// number of possessions it was measured over.
///
/// The model is a polynomial fitted to `std^(-inverse_power)` against possessions.
/// Inputs are clipped to the possession domain the polynomial was fitted on, so
/// the prediction is constant beyond either end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PossessionStdModelParams")]
pub struct PossessionStdModel {
    coefficients: Vec<f64>,
    inverse_power: u32,
    min_possessions: f64,
    max_possessions: f64,
}

#[derive(Debug, Deserialize)]
struct PossessionStdModelParams {
    coefficients: Vec<f64>,
    inverse_power: u32,
    min_possessions: f64,
    max_possessions: f64,
}

impl TryFrom<PossessionStdModelParams> for PossessionStdModel {
    type Error = ModelError;

    fn try_from(params: PossessionStdModelParams) -> Result<Self, Self::Error> {
        Self::new(
            params.coefficients,
            params.inverse_power,
            params.min_possessions,
            params.max_possessions,
        )
    }
}

impl PossessionStdModel {
    /// Builds a predictor from fitted coefficients (constant term first).
    ///
    /// Fails unless the transformed prediction is positive across the whole domain.
    pub fn new(
        coefficients: Vec<f64>,
        inverse_power: u32,
        min_possessions: f64,
        max_possessions: f64,
    ) -> Result<Self, ModelError> {
        if coefficients.is_empty() {
            return Err(ModelError::EmptyCoefficients);
        }
        if inverse_power == 0 {
            return Err(ModelError::ZeroInversePower);
        }
        if !(min_possessions.is_finite()
            && max_possessions.is_finite()
            && min_possessions <= max_possessions)
        {
            return Err(ModelError::InvalidDomain {
                min: min_possessions,
                max: max_possessions,
            });
        }

        let model = Self {
            coefficients,
            inverse_power,
            min_possessions,
            max_possessions,
        };
        let width = max_possessions - min_possessions;
        let mut checkpoints = (0..=DOMAIN_CHECK_POINTS)
            .map(|i| min_possessions + width * f64::from(i) / f64::from(DOMAIN_CHECK_POINTS))
            .collect::<Vec<_>>();
        // Lines peak at the ends; a parabola's turning point can fall between grid points.
        if let &[_, c1, c2] = model.coefficients.as_slice()
            && c2 != 0.0
        {
            let vertex = -c1 / (2.0 * c2);
            if (min_possessions..=max_possessions).contains(&vertex) {
                checkpoints.push(vertex);
            }
        }
        for x in checkpoints {
            let predicted = model.evaluate_transformed(x);
            if !(predicted.is_finite() && predicted > 0.0) {
                return Err(ModelError::NonPositivePrediction {
                    n_possessions: x,
                    predicted,
                });
            }
        }
        Ok(model)
    }

    /// A predictor returning `sd` regardless of sample size.
    ///
    /// # Panics
    ///
    /// Panics if `sd` is not positive and finite.
    #[must_use]
    pub fn constant(sd: f64) -> Self {
        assert!(sd.is_finite() && sd > 0.0, "sd must be positive and finite");
        Self {
            coefficients: vec![sd.recip()],
            inverse_power: 1,
            min_possessions: 0.0,
            max_possessions: 0.0,
        }
    }

    /// The forward transform applied to standard deviations before fitting.
    #[must_use]
    pub fn transform(std: f64, inverse_power: u32) -> f64 {
        std.powf(-f64::from(inverse_power))
    }

    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    #[must_use]
    pub fn inverse_power(&self) -> u32 {
        self.inverse_power
    }

    /// The `[min, max]` possession range predictions are clipped to.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        (self.min_possessions, self.max_possessions)
    }

    /// Predicted standard deviation of the per-possession value of one game.
    #[must_use]
    pub fn predict_std(&self, n_possessions: f64) -> f64 {
        let x = n_possessions.clamp(self.min_possessions, self.max_possessions);
        self.evaluate_transformed(x)
            .powf(-f64::from(self.inverse_power).recip())
    }

    fn evaluate_transformed(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc.mul_add(x, *c))
    }
}

/// Everything a rating pass needs to know about a league for one rating dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LeagueModelParams")]
pub struct LeagueModel {
    vpp_mean: f64,
    vpp_variance: f64,
    possessions_to_vpp_std: PossessionStdModel,
}

#[derive(Debug, Deserialize)]
struct LeagueModelParams {
    vpp_mean: f64,
    vpp_variance: f64,
    possessions_to_vpp_std: PossessionStdModel,
}

impl TryFrom<LeagueModelParams> for LeagueModel {
    type Error = ModelError;

    fn try_from(params: LeagueModelParams) -> Result<Self, Self::Error> {
        Self::new(
            params.vpp_mean,
            params.vpp_variance,
            params.possessions_to_vpp_std,
        )
    }
}

impl LeagueModel {
    pub fn new(
        vpp_mean: f64,
        vpp_variance: f64,
        possessions_to_vpp_std: PossessionStdModel,
    ) -> Result<Self, ModelError> {
        if !vpp_mean.is_finite() {
            return Err(ModelError::NonFiniteMean { mean: vpp_mean });
        }
        if !(vpp_variance.is_finite() && vpp_variance > 0.0) {
            return Err(ModelError::NonPositiveVariance {
                variance: vpp_variance,
            });
        }
        Ok(Self {
            vpp_mean,
            vpp_variance,
            possessions_to_vpp_std,
        })
    }

    #[must_use]
    pub fn vpp_mean(&self) -> f64 {
        self.vpp_mean
    }

    #[must_use]
    pub fn vpp_variance(&self) -> f64 {
        self.vpp_variance
    }

    #[must_use]
    pub fn possessions_to_vpp_std(&self) -> &PossessionStdModel {
        &self.possessions_to_vpp_std
    }

    /// The league-wide prior belief.
    #[must_use]
    pub fn prior(&self) -> Rating {
        Rating::new(self.vpp_mean, self.vpp_variance)
    }

    #[must_use]
    pub fn observation_sd(&self, n_possessions: f64) -> f64 {
        self.possessions_to_vpp_std.predict_std(n_possessions)
    }

    /// Attaches the predicted observation noise to every record.
    #[must_use]
    pub fn annotate<I>(&self, records: I) -> Vec<AnnotatedRecord>
    where
        I: IntoIterator<Item = PerformanceRecord>,
    {
        records
            .into_iter()
            .map(|record| {
                let sd = self.observation_sd(record.n_possessions);
                record.annotate(sd)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_model() -> PossessionStdModel {
        // std^-3 = 2 + 0.5 * possessions on [10, 90]
        PossessionStdModel::new(vec![2.0, 0.5], 3, 10.0, 90.0).unwrap()
    }

    #[test]
    fn test_prediction_inverts_the_transform() {
        let model = linear_model();
        let expected = (2.0_f64 + 0.5 * 40.0).powf(-1.0 / 3.0);
        assert!((model.predict_std(40.0) - expected).abs() < 1e-12);
        let roundtrip = PossessionStdModel::transform(model.predict_std(40.0), 3);
        assert!((roundtrip - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_is_constant_outside_domain() {
        let model = linear_model();
        assert_eq!(model.predict_std(0.5), model.predict_std(10.0));
        assert_eq!(model.predict_std(-3.0), model.predict_std(10.0));
        assert_eq!(model.predict_std(500.0), model.predict_std(90.0));
        assert!(model.predict_std(10.0) > model.predict_std(90.0));
    }

    #[test]
    fn test_rejects_non_positive_prediction() {
        let err = PossessionStdModel::new(vec![1.0, -0.1], 3, 0.0, 20.0).unwrap_err();
        assert!(matches!(err, ModelError::NonPositivePrediction { .. }));
        assert!(PossessionStdModel::new(vec![], 3, 0.0, 1.0).is_err());
        assert!(PossessionStdModel::new(vec![1.0], 0, 0.0, 1.0).is_err());
        assert!(PossessionStdModel::new(vec![1.0], 3, 2.0, 1.0).is_err());
    }

    #[test]
    fn test_rejects_quadratic_dip_between_grid_points() {
        // (x - 1)^2 - 1e-6 dips below zero only very close to x = 1.
        let err = PossessionStdModel::new(vec![1.0 - 1e-6, -2.0, 1.0], 2, 0.0, 2.1).unwrap_err();
        let ModelError::NonPositivePrediction { n_possessions, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(n_possessions, 1.0);
        assert!(PossessionStdModel::new(vec![1.0 + 1e-6, -2.0, 1.0], 2, 0.0, 2.1).is_ok());
    }

    #[test]
    fn test_constant_model() {
        let model = PossessionStdModel::constant(0.3);
        for n in [0.1, 1.0, 50.0, 1e6] {
            assert!((model.predict_std(n) - 0.3).abs() < 1e-12);
        }
    }

    #[test]
    fn test_league_model_validation() {
        let std_model = PossessionStdModel::constant(0.3);
        assert!(LeagueModel::new(1.0, 0.0, std_model.clone()).is_err());
        assert!(LeagueModel::new(f64::NAN, 0.1, std_model.clone()).is_err());
        let model = LeagueModel::new(1.0, 0.5, std_model).unwrap();
        assert_eq!(model.prior(), Rating::new(1.0, 0.5));
    }

    #[test]
    fn test_json_roundtrip_reproduces_predictions() {
        let model = LeagueModel::new(0.95, 0.04, linear_model()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let loaded: LeagueModel = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, model);
        for n in [1.0, 10.0, 33.3, 90.0, 200.0] {
            assert_eq!(loaded.observation_sd(n), model.observation_sd(n));
        }
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let json = r#"{
            "vpp_mean": 1.0,
            "vpp_variance": -1.0,
            "possessions_to_vpp_std": {
                "coefficients": [1.0], "inverse_power": 3,
                "min_possessions": 0.0, "max_possessions": 1.0
            }
        }"#;
        assert!(serde_json::from_str::<LeagueModel>(json).is_err());
    }

    #[test]
    fn test_annotate() {
        let model = LeagueModel::new(1.0, 0.5, linear_model()).unwrap();
        let records = vec![PerformanceRecord::new("a", "t1", "t2", "g", 5.0, 40.0)];
        let annotated = model.annotate(records);
        assert_eq!(annotated[0].observation_sd(), model.observation_sd(40.0));
    }
}
