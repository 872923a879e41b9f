//! Fitting and applying the three rating dimensions of a league
//!
//! ```text
//! records ─┬─> base fit ────────────────────────────> base
//!          ├─> base pass + DefensiveSampleCollector ─> defense fit ─> defense
//!          └─> base pass + DefenseAdjustment(defense) ─> adjusted fit ─> adjusted_offense
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vpp_engine::{
    LeagueModel, PerformanceRecord, PlayerId, PriorGetter, Rating, UpdateError, update_loop,
};

use crate::{
    defense::{AdjustmentSign, DefenseAdjustment, DefensiveSampleCollector},
    sample::Sample,
    variance_model::{FitError, LeagueFit, VarianceModelConfig, fit_league_model},
};

/// League models for base offense, defense, and defense-adjusted offense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueModels {
    pub base: LeagueModel,
    pub defense: LeagueModel,
    pub adjusted_offense: LeagueModel,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum LeagueFitError {
    #[display("failed to fit base model: {_0}")]
    Base(FitError),
    #[display("failed to fit defense model: {_0}")]
    Defense(FitError),
    #[display("failed to fit adjusted offense model: {_0}")]
    AdjustedOffense(FitError),
    #[display("rating pass failed: {_0}")]
    #[from]
    Update(UpdateError),
}

/// The fitted models with the per-dimension fit diagnostics.
#[derive(Debug, Clone)]
pub struct LeagueModelsFit {
    pub base: LeagueFit,
    pub defense: LeagueFit,
    pub adjusted_offense: LeagueFit,
}

impl LeagueModelsFit {
    #[must_use]
    pub fn models(&self) -> LeagueModels {
        LeagueModels {
            base: self.base.model.clone(),
            defense: self.defense.model.clone(),
            adjusted_offense: self.adjusted_offense.model.clone(),
        }
    }
}

/// Fits all three league models from a chronologically ordered history.
pub fn fit_league_models(
    records: &[PerformanceRecord],
    config: &VarianceModelConfig,
    sign: AdjustmentSign,
) -> Result<LeagueModelsFit, LeagueFitError> {
    let base_samples = records.iter().map(Sample::from).collect::<Vec<_>>();
    let base = fit_league_model(&base_samples, config).map_err(LeagueFitError::Base)?;

    let mut collector = DefensiveSampleCollector::new();
    update_loop(records, &base.model, None, &mut [&mut collector])?;
    let defense =
        fit_league_model(collector.samples(), config).map_err(LeagueFitError::Defense)?;

    let mut adjusting = DefenseAdjustment::collecting(defense.model.clone(), sign);
    update_loop(records, &base.model, None, &mut [&mut adjusting])?;
    let adjusted_offense = fit_league_model(adjusting.adjusted_samples(), config)
        .map_err(LeagueFitError::AdjustedOffense)?;

    Ok(LeagueModelsFit {
        base,
        defense,
        adjusted_offense,
    })
}

/// Final ratings of one pass in every dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueRatings {
    pub offense: BTreeMap<PlayerId, Rating>,
    pub defense: BTreeMap<PlayerId, Rating>,
    pub adjusted_offense: BTreeMap<PlayerId, Rating>,
}

/// Rates every player in all three dimensions in a single pass.
///
/// `offense_prior` replaces the uniform prior of the base dimension only.
pub fn rate_league(
    records: &[PerformanceRecord],
    models: &LeagueModels,
    offense_prior: Option<Box<dyn PriorGetter>>,
    sign: AdjustmentSign,
) -> Result<LeagueRatings, UpdateError> {
    let mut defense = DefenseAdjustment::new(
        models.defense.clone(),
        models.adjusted_offense.clone(),
        sign,
    );
    let offense = update_loop(records, &models.base, offense_prior, &mut [&mut defense])?;
    let output = defense.into_output();
    let ratings = LeagueRatings {
        offense: offense.into_ratings(),
        defense: output.defense_ratings.into_ratings(),
        adjusted_offense: output
            .adjusted_ratings
            .map(|ratings| ratings.into_ratings())
            .unwrap_or_default(),
    };
    tracing::info!(players = ratings.offense.len(), %sign, "rated league");
    Ok(ratings)
}
