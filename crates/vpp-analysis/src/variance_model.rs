//! Fitting the possessions → observation noise model
//!
//! # Algorithm
//!
//! 1. Restrict to players passing the [`CareerFilter`] and compute each game's
//!    leave-one-game-out deviation (see [`crate::sample`])
//! 2. Split games into equally populated percentile buckets of possessions
//! 3. Per bucket, take the sample standard deviation of the deviations and
//!    the median possessions
//! 4. Fit a polynomial of `std^(-inverse_power)` against median possessions
//! 5. Clip predictions to the `[min, max]` of bucket medians
//!
//! Buckets with fewer than two finite deviations have no standard deviation
//! and are left out of the regression. A bucket whose deviations are all
//! equal fails the fit, since its transformed value is infinite.

use vpp_engine::{LeagueModel, ModelError, PossessionStdModel};
use vpp_stats::{
    descriptive::{self, DescriptiveStats},
    percentiles,
    regression::{PolynomialFit, RegressionError},
};

use crate::sample::{
    CareerFilter, GameDeviation, Sample, leave_one_out_deviations, qualified_careers,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceModelConfig {
    /// Number of possession percentile buckets.
    pub buckets: usize,
    /// Power whose negative linearizes the bucket std against possessions.
    pub inverse_power: u32,
    /// Degree of the polynomial in possessions.
    pub degree: usize,
    pub career_filter: CareerFilter,
}

impl Default for VarianceModelConfig {
    fn default() -> Self {
        Self {
            buckets: 100,
            inverse_power: 3,
            degree: 1,
            career_filter: CareerFilter::default(),
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum FitError {
    #[display("number of buckets must be positive")]
    ZeroBuckets,
    #[display("need at least {required} qualified players, got {actual}")]
    TooFewPlayers { required: usize, actual: usize },
    #[display("need at least {required} buckets with a defined std, got {actual}")]
    TooFewUsableBuckets { required: usize, actual: usize },
    #[display("bucket {bucket} (median {median_possessions} possessions) has zero variance")]
    ZeroVarianceBucket {
        bucket: usize,
        median_possessions: f64,
    },
    #[display("regression failed: {_0}")]
    #[from]
    Regression(RegressionError),
    #[display("fitted model is invalid: {_0}")]
    #[from]
    Model(ModelError),
}

/// Summary of one possession bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketStats {
    pub bucket: usize,
    pub count: usize,
    pub median_possessions: f64,
    /// `None` when fewer than two finite deviations fell in the bucket.
    pub deviation_std: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct VarianceFit {
    pub buckets: Vec<BucketStats>,
    pub model: PossessionStdModel,
}

/// A fitted [`LeagueModel`] with the diagnostics it was built from.
#[derive(Debug, Clone)]
pub struct LeagueFit {
    pub model: LeagueModel,
    pub qualified_players: usize,
    pub variance: VarianceFit,
}

/// Groups deviations into `num_buckets` percentile buckets of possessions.
///
/// Only non-empty buckets are returned, in ascending order.
///
/// # Panics
///
/// Panics if `num_buckets` is zero.
#[must_use]
pub fn bucket_deviations(deviations: &[GameDeviation], num_buckets: usize) -> Vec<BucketStats> {
    let possessions = deviations.iter().map(|d| d.n_possessions).collect::<Vec<_>>();
    let assignment = percentiles::percentile_buckets(&possessions, num_buckets);

    let mut members = vec![Vec::new(); num_buckets];
    for (deviation, bucket) in deviations.iter().zip(assignment) {
        members[bucket].push(deviation);
    }

    members
        .into_iter()
        .enumerate()
        .filter_map(|(bucket, members)| {
            let stats = DescriptiveStats::new(members.iter().map(|d| d.n_possessions))?;
            let finite = members
                .iter()
                .map(|d| d.deviation)
                .filter(|d| d.is_finite())
                .collect::<Vec<_>>();
            Some(BucketStats {
                bucket,
                count: members.len(),
                median_possessions: stats.median,
                deviation_std: descriptive::sample_std_dev(&finite),
            })
        })
        .collect()
}

/// Fits the possession std model on leave-one-out deviations.
pub fn fit_possession_std_model(
    deviations: &[GameDeviation],
    config: &VarianceModelConfig,
) -> Result<VarianceFit, FitError> {
    if config.buckets == 0 {
        return Err(FitError::ZeroBuckets);
    }
    let buckets = bucket_deviations(deviations, config.buckets);

    let mut xs = Vec::with_capacity(buckets.len());
    let mut ys = Vec::with_capacity(buckets.len());
    for bucket in &buckets {
        let Some(std) = bucket.deviation_std else {
            continue;
        };
        if std <= 0.0 {
            return Err(FitError::ZeroVarianceBucket {
                bucket: bucket.bucket,
                median_possessions: bucket.median_possessions,
            });
        }
        xs.push(bucket.median_possessions);
        ys.push(PossessionStdModel::transform(std, config.inverse_power));
    }

    let required = config.degree + 2;
    if xs.len() < required {
        return Err(FitError::TooFewUsableBuckets {
            required,
            actual: xs.len(),
        });
    }

    let fit = PolynomialFit::fit(&xs, &ys, config.degree)?;
    let min = buckets
        .iter()
        .map(|b| b.median_possessions)
        .fold(f64::INFINITY, f64::min);
    let max = buckets
        .iter()
        .map(|b| b.median_possessions)
        .fold(f64::NEG_INFINITY, f64::max);
    let model =
        PossessionStdModel::new(fit.coefficients().to_vec(), config.inverse_power, min, max)?;

    tracing::debug!(
        buckets = buckets.len(),
        usable = xs.len(),
        min_possessions = min,
        max_possessions = max,
        coefficients = ?model.coefficients(),
        "fitted possession std model"
    );
    Ok(VarianceFit { buckets, model })
}

/// Fits a complete league model for one rating dimension.
///
/// The prior is the mean and sample variance of qualified players' career
/// rates, and the noise model comes from [`fit_possession_std_model`].
pub fn fit_league_model(
    samples: &[Sample],
    config: &VarianceModelConfig,
) -> Result<LeagueFit, FitError> {
    let careers = qualified_careers(samples, &config.career_filter);
    let career_stats = DescriptiveStats::new(careers.values().map(|c| c.vpp()));
    let Some((mean, Some(variance))) = career_stats.map(|s| (s.mean, s.variance)) else {
        return Err(FitError::TooFewPlayers {
            required: 2,
            actual: careers.len(),
        });
    };

    let deviations = leave_one_out_deviations(samples, &careers);
    let variance_fit = fit_possession_std_model(&deviations, config)?;
    let model = LeagueModel::new(mean, variance, variance_fit.model.clone())?;
    tracing::info!(
        qualified_players = careers.len(),
        games = deviations.len(),
        vpp_mean = mean,
        vpp_variance = variance,
        "fitted league model"
    );
    Ok(LeagueFit {
        model,
        qualified_players: careers.len(),
        variance: variance_fit,
    })
}
