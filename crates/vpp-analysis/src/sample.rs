//! Per-game samples and the career aggregates the variance model is fitted on
//!
//! A [`Sample`] is one player-game reduced to a per-possession rate and the
//! possessions it was measured over. The same type carries base offense,
//! defensive differentials, and adjusted offense, so one fitter serves every
//! rating dimension.
//!
//! # Leave-one-game-out deviations
//!
//! ```text
//! career      = Σ value / Σ possessions            (qualified players only)
//! without_g   = (Σ value - value_g) / (Σ possessions - possessions_g)
//! deviation_g = vpp_g - without_g
//! ```
//!
//! Only players passing the [`CareerFilter`] contribute, so the leave-one-out
//! denominator never gets close to zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vpp_engine::{PerformanceRecord, PlayerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub player_id: PlayerId,
    pub n_possessions: f64,
    pub vpp: f64,
}

impl Sample {
    #[must_use]
    pub fn new(player_id: PlayerId, n_possessions: f64, vpp: f64) -> Self {
        Self {
            player_id,
            n_possessions,
            vpp,
        }
    }

    /// Total value the sample represents.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.vpp * self.n_possessions
    }
}

impl From<&PerformanceRecord> for Sample {
    fn from(record: &PerformanceRecord) -> Self {
        Self::new(record.player_id.clone(), record.n_possessions, record.vpp())
    }
}

/// Minimum career size for a player to take part in fitting.
///
/// Both bounds are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CareerFilter {
    pub min_games: usize,
    pub min_possessions: f64,
}

impl Default for CareerFilter {
    fn default() -> Self {
        Self {
            min_games: 15,
            min_possessions: 100.0,
        }
    }
}

impl CareerFilter {
    #[must_use]
    pub fn accepts(&self, career: &PlayerCareer) -> bool {
        career.n_games > self.min_games && career.total_possessions > self.min_possessions
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCareer {
    pub n_games: usize,
    pub total_value: f64,
    pub total_possessions: f64,
}

impl PlayerCareer {
    #[must_use]
    pub fn vpp(&self) -> f64 {
        self.total_value / self.total_possessions
    }

    /// Career rate with `sample` left out.
    #[must_use]
    pub fn vpp_without(&self, sample: &Sample) -> f64 {
        (self.total_value - sample.value()) / (self.total_possessions - sample.n_possessions)
    }
}

/// Career totals of the players accepted by `filter`.
#[must_use]
pub fn qualified_careers(
    samples: &[Sample],
    filter: &CareerFilter,
) -> BTreeMap<PlayerId, PlayerCareer> {
    let mut careers = BTreeMap::<PlayerId, PlayerCareer>::new();
    for sample in samples {
        let career = careers
            .entry(sample.player_id.clone())
            .or_insert(PlayerCareer {
                n_games: 0,
                total_value: 0.0,
                total_possessions: 0.0,
            });
        career.n_games += 1;
        career.total_value += sample.value();
        career.total_possessions += sample.n_possessions;
    }
    let total = careers.len();
    careers.retain(|_, career| filter.accepts(career));
    tracing::debug!(
        players = total,
        qualified = careers.len(),
        "aggregated careers"
    );
    careers
}

/// A single game's distance from the player's career rate over all other games.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameDeviation {
    pub n_possessions: f64,
    pub deviation: f64,
}

/// Deviations of every sample belonging to a player in `careers`.
#[must_use]
pub fn leave_one_out_deviations(
    samples: &[Sample],
    careers: &BTreeMap<PlayerId, PlayerCareer>,
) -> Vec<GameDeviation> {
    samples
        .iter()
        .filter_map(|sample| {
            let career = careers.get(&sample.player_id)?;
            Some(GameDeviation {
                n_possessions: sample.n_possessions,
                deviation: sample.vpp - career.vpp_without(sample),
            })
        })
        .collect()
}
