//! Defensive ratings and opponent-adjusted offense
//!
//! Both extensions in this module watch the primary offensive pass. For each
//! team of a game, the team hook computes
//!
//! - the *defensive differential*: actual team VPP minus the VPP expected from
//!   the players' pre-game offensive ratings, weighted by possessions
//! - the *defensive adjustment*: the possession-weighted mean of the same
//!   players' current defensive ratings
//!
//! and files both under the team's opponent for the current game. Player hooks
//! then read the values filed under their record's opponent for the same game.
//! A value filed for another game is stale and is reported as an unseen key
//! rather than reused.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vpp_engine::{
    AnnotatedRecord, ExtensionError, GameId, LeagueModel, PriorGetter, Rating, RatingExtension,
    RatingStore, TeamGame, TeamId,
};

use crate::sample::Sample;

/// Actual minus expected per-possession value of `team` in this game.
#[must_use]
pub fn defensive_differential(team: &TeamGame<'_>, ratings: &RatingStore) -> f64 {
    let expected =
        team.possession_weighted(|record| ratings.get_rating(record.record().into()).mean);
    team.vpp() - expected
}

/// How the defensive adjustment enters the adjusted-offense observation.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentSign {
    /// `observation = vpp - adjustment`
    #[default]
    Subtract,
    /// `observation = vpp + adjustment`
    Add,
}

impl AdjustmentSign {
    #[must_use]
    pub fn apply(self, vpp: f64, adjustment: f64) -> f64 {
        match self {
            Self::Subtract => vpp - adjustment,
            Self::Add => vpp + adjustment,
        }
    }
}

/// Values filed under an opponent team id for a single game.
#[derive(Debug)]
struct OpponentLedger<V> {
    kind: &'static str,
    entries: HashMap<TeamId, (GameId, V)>,
}

impl<V: Copy> OpponentLedger<V> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    fn file(&mut self, opponent_id: &TeamId, game_id: &GameId, value: V) {
        self.entries
            .insert(opponent_id.clone(), (game_id.clone(), value));
    }

    fn lookup(&self, opponent_id: &TeamId, game_id: &GameId) -> Result<V, ExtensionError> {
        match self.entries.get(opponent_id) {
            Some((filed_for, value)) if filed_for == game_id => Ok(*value),
            _ => Err(ExtensionError::UnseenKey {
                kind: self.kind,
                key: opponent_id.to_string(),
                game_id: game_id.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpponentValues {
    differential: f64,
    adjustment: f64,
}

/// Collects one defensive differential sample per player-game.
///
/// Running this alongside the base pass produces the data the defensive
/// [`LeagueModel`] is fitted on.
#[derive(Debug)]
pub struct DefensiveSampleCollector {
    differentials: OpponentLedger<f64>,
    samples: Vec<Sample>,
}

impl Default for DefensiveSampleCollector {
    fn default() -> Self {
        Self {
            differentials: OpponentLedger::new("defensive differential"),
            samples: Vec::new(),
        }
    }
}

impl DefensiveSampleCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

impl RatingExtension for DefensiveSampleCollector {
    fn on_team(
        &mut self,
        team: &TeamGame<'_>,
        ratings: &RatingStore,
    ) -> Result<(), ExtensionError> {
        let differential = defensive_differential(team, ratings);
        self.differentials
            .file(team.opponent_id(), team.game_id(), differential);
        Ok(())
    }

    fn on_player(
        &mut self,
        _team_id: &TeamId,
        record: &AnnotatedRecord,
    ) -> Result<(), ExtensionError> {
        let differential = self
            .differentials
            .lookup(record.opponent_id(), record.game_id())?;
        self.samples.push(Sample::new(
            record.player_id().clone(),
            record.n_possessions(),
            differential,
        ));
        Ok(())
    }
}

#[derive(Debug)]
struct AdjustedOffense {
    model: LeagueModel,
    ratings: RatingStore,
}

/// Maintains defensive ratings and opponent-adjusted offense during a pass.
///
/// Adjusted-offense observations are always collected as [`Sample`]s. Adjusted
/// ratings are only kept when an adjusted-offense model is supplied, which is
/// not yet the case while that model is being fitted.
#[derive(Debug)]
pub struct DefenseAdjustment {
    defense_model: LeagueModel,
    defense_ratings: RatingStore,
    adjusted: Option<AdjustedOffense>,
    sign: AdjustmentSign,
    ledger: OpponentLedger<OpponentValues>,
    adjusted_samples: Vec<Sample>,
}

/// Everything a [`DefenseAdjustment`] produced over a pass.
#[derive(Debug)]
pub struct DefenseOutput {
    pub defense_ratings: RatingStore,
    pub adjusted_ratings: Option<RatingStore>,
    pub adjusted_samples: Vec<Sample>,
}

impl DefenseAdjustment {
    /// Tracks defensive ratings and collects adjusted-offense samples.
    #[must_use]
    pub fn collecting(defense_model: LeagueModel, sign: AdjustmentSign) -> Self {
        Self {
            defense_ratings: RatingStore::from_model(&defense_model),
            defense_model,
            adjusted: None,
            sign,
            ledger: OpponentLedger::new("defensive values"),
            adjusted_samples: Vec::new(),
        }
    }

    /// Tracks defensive ratings and adjusted-offense ratings.
    #[must_use]
    pub fn new(
        defense_model: LeagueModel,
        adjusted_model: LeagueModel,
        sign: AdjustmentSign,
    ) -> Self {
        let adjusted = AdjustedOffense {
            ratings: RatingStore::from_model(&adjusted_model),
            model: adjusted_model,
        };
        Self {
            adjusted: Some(adjusted),
            ..Self::collecting(defense_model, sign)
        }
    }

    /// Replaces the uniform defensive prior.
    #[must_use]
    pub fn with_defense_prior(self, prior: Box<dyn PriorGetter>) -> Self {
        Self {
            defense_ratings: RatingStore::new(prior),
            ..self
        }
    }

    #[must_use]
    pub fn adjusted_samples(&self) -> &[Sample] {
        &self.adjusted_samples
    }

    #[must_use]
    pub fn into_output(self) -> DefenseOutput {
        DefenseOutput {
            defense_ratings: self.defense_ratings,
            adjusted_ratings: self.adjusted.map(|adjusted| adjusted.ratings),
            adjusted_samples: self.adjusted_samples,
        }
    }
}

impl RatingExtension for DefenseAdjustment {
    fn on_team(
        &mut self,
        team: &TeamGame<'_>,
        ratings: &RatingStore,
    ) -> Result<(), ExtensionError> {
        let differential = defensive_differential(team, ratings);
        let adjustment = team.possession_weighted(|record| {
            self.defense_ratings
                .get_rating(record.record().into())
                .mean
        });
        tracing::trace!(
            game_id = %team.game_id(),
            team_id = %team.team_id(),
            differential,
            adjustment,
            "filed defensive values"
        );
        self.ledger.file(
            team.opponent_id(),
            team.game_id(),
            OpponentValues {
                differential,
                adjustment,
            },
        );
        Ok(())
    }

    fn on_player(
        &mut self,
        _team_id: &TeamId,
        record: &AnnotatedRecord,
    ) -> Result<(), ExtensionError> {
        let values = self.ledger.lookup(record.opponent_id(), record.game_id())?;
        let n_possessions = record.n_possessions();

        let defense = self.defense_ratings.get_rating(record.record().into());
        let defense_sd = self.defense_model.observation_sd(n_possessions);
        self.defense_ratings.update_rating(
            record.player_id().clone(),
            defense.fuse(values.differential, defense_sd),
        );

        let observation = self.sign.apply(record.vpp(), values.adjustment);
        self.adjusted_samples.push(Sample::new(
            record.player_id().clone(),
            n_possessions,
            observation,
        ));
        if let Some(adjusted) = &mut self.adjusted {
            let current: Rating = adjusted.ratings.get_rating(record.record().into());
            let sd = adjusted.model.observation_sd(n_possessions);
            adjusted
                .ratings
                .update_rating(record.player_id().clone(), current.fuse(observation, sd));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vpp_engine::{
        PerformanceRecord, PlayerId, PossessionStdModel, PriorFn, UniformPrior, UpdateError,
        run_update_loop,
    };

    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn model(mean: f64, variance: f64, sd: f64) -> LeagueModel {
        LeagueModel::new(mean, variance, PossessionStdModel::constant(sd)).unwrap()
    }

    fn offense_store(means: &[(&'static str, f64)]) -> RatingStore {
        let means = means
            .iter()
            .map(|(id, mean)| (PlayerId::from(*id), *mean))
            .collect::<HashMap<_, _>>();
        RatingStore::new(Box::new(PriorFn(move |player: vpp_engine::Player<'_>| {
            Rating::new(means.get(player.player_id).copied().unwrap_or(1.0), 0.5)
        })))
    }

    fn matched_game() -> Vec<AnnotatedRecord> {
        vec![
            PerformanceRecord::new("a", "x", "y", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("b", "x", "y", "g1", 2.0, 8.0).annotate(0.3),
            PerformanceRecord::new("c", "y", "x", "g1", 6.0, 12.0).annotate(0.3),
        ]
    }

    #[test]
    fn test_differential_is_zero_when_team_meets_expectation() {
        let records = matched_game();
        let ratings = offense_store(&[("a", 0.5), ("b", 0.25), ("c", 0.5)]);
        let games = vpp_engine::schedule(&records).unwrap();
        for team in games[0].teams() {
            assert_eq!(defensive_differential(team, &ratings), 0.0);
        }
    }

    #[test]
    fn test_collector_files_differentials_per_game() {
        let records = matched_game();
        let ratings = offense_store(&[("a", 0.5), ("b", 0.25), ("c", 0.25)]);
        let mut collector = DefensiveSampleCollector::new();
        run_update_loop(&records, ratings, &mut [&mut collector]).unwrap();

        let samples = collector.samples();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].vpp, 0.0);
        assert_eq!(samples[1].vpp, 0.0);
        // Team y scored 0.5 per possession against an expected 0.25.
        assert!(approx_eq(samples[2].vpp, 0.25));
        assert!(approx_eq(samples[2].n_possessions, 12.0));
    }

    #[test]
    fn test_defense_and_adjusted_updates() {
        let records = matched_game();
        let ratings = offense_store(&[("a", 0.5), ("b", 0.25), ("c", 0.25)]);
        let defense_model = model(0.0, 0.04, 0.2);
        let adjusted_model = model(1.0, 0.5, 0.3);
        let defense_prior = Rating::new(0.1, 0.04);
        let mut defense = DefenseAdjustment::new(
            defense_model.clone(),
            adjusted_model.clone(),
            AdjustmentSign::Subtract,
        )
        .with_defense_prior(Box::new(UniformPrior::new(defense_prior)));
        run_update_loop(&records, ratings, &mut [&mut defense]).unwrap();

        let output = defense.into_output();
        let c_defense = output.defense_ratings.rating_of(&"c".into()).unwrap();
        let expected = defense_prior.fuse(0.25, defense_model.observation_sd(12.0));
        assert!(approx_eq(c_defense.mean, expected.mean));
        assert!(approx_eq(c_defense.variance, expected.variance));

        // c's adjustment is team y's mean defensive prior.
        assert!(approx_eq(output.adjusted_samples[2].vpp, 0.5 - 0.1));
        let adjusted = output.adjusted_ratings.unwrap();
        let c_adjusted = adjusted.rating_of(&"c".into()).unwrap();
        let expected = adjusted_model
            .prior()
            .fuse(0.5 - 0.1, adjusted_model.observation_sd(12.0));
        assert!(approx_eq(c_adjusted.mean, expected.mean));
        assert!(approx_eq(c_adjusted.variance, expected.variance));
    }

    #[test]
    fn test_adjustment_sign() {
        assert_eq!(AdjustmentSign::Subtract.apply(0.5, 0.1), 0.4);
        assert_eq!(AdjustmentSign::Add.apply(0.5, 0.25), 0.75);
        assert_eq!(AdjustmentSign::default(), AdjustmentSign::Subtract);
        assert_eq!("add".parse::<AdjustmentSign>().unwrap(), AdjustmentSign::Add);
    }

    #[test]
    fn test_stale_values_are_unseen() {
        let mut ledger = OpponentLedger::new("test value");
        ledger.file(&"x".into(), &"g1".into(), 1.0);
        assert_eq!(ledger.lookup(&"x".into(), &"g1".into()).unwrap(), 1.0);
        assert!(ledger.lookup(&"x".into(), &"g2".into()).is_err());
        assert!(ledger.lookup(&"y".into(), &"g1".into()).is_err());
    }

    fn two_games(first: (f64, f64), second: (f64, f64)) -> Vec<AnnotatedRecord> {
        vec![
            PerformanceRecord::new("a", "x", "y", "g1", first.0, 20.0).annotate(0.3),
            PerformanceRecord::new("c", "y", "x", "g1", first.1, 20.0).annotate(0.3),
            PerformanceRecord::new("a", "x", "y", "g2", second.0, 20.0).annotate(0.3),
            PerformanceRecord::new("c", "y", "x", "g2", second.1, 20.0).annotate(0.3),
        ]
    }

    fn uniform_store() -> RatingStore {
        RatingStore::new(Box::new(UniformPrior::new(Rating::new(1.0, 0.5))))
    }

    #[test]
    fn test_defense_ratings_depend_on_game_order() {
        let defense_model = model(0.0, 0.04, 0.2);
        let forward = two_games((10.0, 10.0), (30.0, 30.0));
        let backward = two_games((30.0, 30.0), (10.0, 10.0));

        let run = |records: &[AnnotatedRecord]| {
            let mut defense =
                DefenseAdjustment::collecting(defense_model.clone(), AdjustmentSign::Subtract);
            let offense = run_update_loop(records, uniform_store(), &mut [&mut defense]).unwrap();
            let a_offense = offense.rating_of(&"a".into()).unwrap();
            let a_defense = defense
                .into_output()
                .defense_ratings
                .rating_of(&"a".into())
                .unwrap();
            (a_offense, a_defense)
        };
        let (offense_forward, defense_forward) = run(&forward);
        let (offense_backward, defense_backward) = run(&backward);

        assert!((offense_forward.mean - offense_backward.mean).abs() < 1e-12);

        // Each differential is measured against the pre-game offensive mean,
        // which depends on the games already seen.
        let prior = defense_model.prior();
        let after_low = Rating::new(1.0, 0.5).fuse(0.5, 0.3);
        let after_high = Rating::new(1.0, 0.5).fuse(1.5, 0.3);
        let expected_forward = prior
            .fuse(0.5 - 1.0, 0.2)
            .fuse(1.5 - after_low.mean, 0.2);
        let expected_backward = prior
            .fuse(1.5 - 1.0, 0.2)
            .fuse(0.5 - after_high.mean, 0.2);
        assert!(approx_eq(defense_forward.mean, expected_forward.mean));
        assert!(approx_eq(defense_backward.mean, expected_backward.mean));
        assert!((defense_forward.mean - defense_backward.mean).abs() > 0.1);
    }

    /// Forwards every player hook but only the team hooks of `games`.
    struct TeamHooksOnlyFor<'a, E> {
        inner: &'a mut E,
        games: &'a [&'a str],
    }

    impl<E: RatingExtension> RatingExtension for TeamHooksOnlyFor<'_, E> {
        fn on_team(
            &mut self,
            team: &TeamGame<'_>,
            ratings: &RatingStore,
        ) -> Result<(), ExtensionError> {
            if self.games.iter().any(|game| *game == team.game_id().as_str()) {
                self.inner.on_team(team, ratings)
            } else {
                Ok(())
            }
        }

        fn on_player(
            &mut self,
            team_id: &TeamId,
            record: &AnnotatedRecord,
        ) -> Result<(), ExtensionError> {
            self.inner.on_player(team_id, record)
        }
    }

    #[test]
    fn test_unfiled_opponent_aborts_the_pass() {
        let records = two_games((10.0, 10.0), (30.0, 30.0));
        let mut defense = DefenseAdjustment::new(
            model(0.0, 0.04, 0.2),
            model(1.0, 0.5, 0.3),
            AdjustmentSign::Subtract,
        );
        let mut skipping = TeamHooksOnlyFor {
            inner: &mut defense,
            games: &[],
        };
        let err = run_update_loop(&records, uniform_store(), &mut [&mut skipping]).unwrap_err();
        let UpdateError::Extension(ExtensionError::UnseenKey { key, game_id, .. }) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(key, "y");
        assert_eq!(*game_id, GameId::from("g1"));
        assert!(defense.into_output().adjusted_samples.is_empty());
    }

    #[test]
    fn test_stale_differential_aborts_the_pass() {
        let records = two_games((10.0, 10.0), (30.0, 30.0));
        let mut collector = DefensiveSampleCollector::new();
        let mut skipping = TeamHooksOnlyFor {
            inner: &mut collector,
            games: &["g1"],
        };
        let err = run_update_loop(&records, uniform_store(), &mut [&mut skipping]).unwrap_err();
        let UpdateError::Extension(ExtensionError::UnseenKey { game_id, .. }) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(*game_id, GameId::from("g2"));
        assert_eq!(collector.samples().len(), 2);
    }
}
