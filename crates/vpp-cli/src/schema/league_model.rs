use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vpp_analysis::{defense::AdjustmentSign, league::LeagueModels};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeagueModelFile {
    pub fitted_at: DateTime<Utc>,
    pub adjustment_sign: AdjustmentSign,
    pub fit: FitSettings,
    pub models: LeagueModels,
}

/// Settings the models were fitted with, kept for reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FitSettings {
    pub buckets: usize,
    pub inverse_power: u32,
    pub degree: usize,
    pub min_games: usize,
    pub min_possessions: f64,
    pub num_records: usize,
}
