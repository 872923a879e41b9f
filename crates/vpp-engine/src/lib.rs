//! Sequential Bayesian player ratings from per-game value-per-possession observations.
//!
//! # Overview
//!
//! A rating pass walks a chronologically ordered performance history and fuses each
//! player-game into that player's Gaussian belief:
//!
//! 1. Annotate [`PerformanceRecord`]s with their observation noise using a
//!    [`LeagueModel`] (see [`LeagueModel::annotate`])
//! 2. Build a [`RatingStore`] backed by a [`PriorGetter`]
//! 3. Run [`run_update_loop`], optionally with [`RatingExtension`]s observing the pass
//! 4. Export the final ratings with [`RatingStore::into_ratings`]
//!
//! [`update_loop`] bundles the steps for the common case.
//!
//! # Example
//!
//! ```
//! use vpp_engine::{LeagueModel, PerformanceRecord, PossessionStdModel, update_loop};
//!
//! let std_model = PossessionStdModel::constant(0.3);
//! let model = LeagueModel::new(1.0, 0.5, std_model).unwrap();
//! let records = vec![
//!     PerformanceRecord::new("a", "home", "away", "g1", 10.0, 20.0),
//!     PerformanceRecord::new("b", "away", "home", "g1", 8.0, 20.0),
//! ];
//!
//! let ratings = update_loop(&records, &model, None, &mut []).unwrap();
//! let a = ratings.rating_of(&"a".into()).unwrap();
//! assert!(a.mean > 0.5 && a.mean < 1.0);
//! ```

pub use self::{
    id::*, league_model::*, prior::*, rating::*, record::*, schedule::*, store::*,
    update_loop::*,
};

pub mod id;
pub mod league_model;
pub mod prior;
pub mod rating;
pub mod record;
pub mod schedule;
pub mod store;
pub mod update_loop;

/// A performance history that violates the input contract.
///
/// Any of these aborts the pass before a single rating is updated.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InputError {
    #[display("player {player_id} has non-positive possessions in game {game_id}: {n_possessions}")]
    NonPositivePossessions {
        player_id: PlayerId,
        game_id: GameId,
        n_possessions: f64,
    },
    #[display("player {player_id} in game {game_id} has a non-finite value ({value})")]
    NonFiniteValue {
        player_id: PlayerId,
        game_id: GameId,
        value: f64,
    },
    #[display("player {player_id} has invalid observation sd {observation_sd} in game {game_id}")]
    InvalidObservationSd {
        player_id: PlayerId,
        game_id: GameId,
        observation_sd: f64,
    },
    #[display("game {game_id} has {count} distinct teams, expected 2")]
    TeamCount { game_id: GameId, count: usize },
    #[display("team {team_id} is listed against {opponent_id}, not its opponent in game {game_id}")]
    OpponentMismatch {
        game_id: GameId,
        team_id: TeamId,
        opponent_id: TeamId,
    },
    #[display("player {player_id} appears more than once in game {game_id}")]
    DuplicatePlayer { player_id: PlayerId, game_id: GameId },
    #[display("game {game_id} is dated {date}, before an earlier game dated {previous_date}")]
    Unsorted {
        game_id: GameId,
        date: chrono::NaiveDate,
        previous_date: chrono::NaiveDate,
    },
}

/// An extension looked up auxiliary state that was never recorded for the current game.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ExtensionError {
    #[display("no {kind} recorded for {key} in game {game_id}")]
    UnseenKey {
        kind: &'static str,
        key: String,
        game_id: GameId,
    },
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum UpdateError {
    #[display("invalid input: {_0}")]
    Input(InputError),
    #[display("extension failed: {_0}")]
    Extension(ExtensionError),
}

/// An invalid [`LeagueModel`] or [`PossessionStdModel`].
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ModelError {
    #[display("prior variance must be positive and finite, got {variance}")]
    NonPositiveVariance { variance: f64 },
    #[display("prior mean must be finite, got {mean}")]
    NonFiniteMean { mean: f64 },
    #[display("possession std model has no coefficients")]
    EmptyCoefficients,
    #[display("inverse power must be positive")]
    ZeroInversePower,
    #[display("invalid possession domain [{min}, {max}]")]
    InvalidDomain { min: f64, max: f64 },
    #[display("possession std model predicts {predicted} at {n_possessions} possessions")]
    NonPositivePrediction { n_possessions: f64, predicted: f64 },
}
