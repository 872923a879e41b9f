//! The ordered rating pass.
//!
//! # Processing order
//!
//! ```text
//! for game in games (first appearance order)
//!     for team in game (first appearance order)
//!         every extension: on_team(team, ratings)      <- pre-update ratings
//!         for record in team (input order)
//!             every extension: on_player(team_id, record)
//!             fuse record into the player's rating
//! ```
//!
//! The whole history is validated before the first update, and the store is
//! only handed back when the pass completes, so a failing pass never leaves a
//! partially updated store behind.

use crate::{
    AnnotatedRecord, ExtensionError, LeagueModel, PerformanceRecord, PriorGetter, RatingStore,
    TeamId, TeamGame, UpdateError, schedule,
};

/// A derived computation that observes a rating pass.
///
/// Extensions see the primary ratings read-only and keep any state they need
/// inside themselves.
pub trait RatingExtension {
    /// Called for each team of a game before any of its players is updated.
    fn on_team(
        &mut self,
        team: &TeamGame<'_>,
        ratings: &RatingStore,
    ) -> Result<(), ExtensionError> {
        let _ = (team, ratings);
        Ok(())
    }

    /// Called for each record right before the player's own rating is updated.
    fn on_player(
        &mut self,
        team_id: &TeamId,
        record: &AnnotatedRecord,
    ) -> Result<(), ExtensionError> {
        let _ = (team_id, record);
        Ok(())
    }
}

/// Runs the rating pass over annotated records.
///
/// The records must already be in chronological game order; dated records are
/// checked and rejected if they are not.
pub fn run_update_loop(
    records: &[AnnotatedRecord],
    mut ratings: RatingStore,
    extensions: &mut [&mut dyn RatingExtension],
) -> Result<RatingStore, UpdateError> {
    let games = schedule(records)?;
    tracing::debug!(
        games = games.len(),
        records = records.len(),
        extensions = extensions.len(),
        "starting rating pass"
    );

    for game in &games {
        tracing::trace!(game_id = %game.game_id(), "processing game");
        for team in game.teams() {
            for extension in extensions.iter_mut() {
                extension.on_team(team, &ratings)?;
            }
            for record in team.records() {
                for extension in extensions.iter_mut() {
                    extension.on_player(team.team_id(), record)?;
                }
                let current = ratings.get_rating(record.record().into());
                let updated = current.fuse(record.vpp(), record.observation_sd());
                ratings.update_rating(record.player_id().clone(), updated);
            }
        }
    }

    tracing::debug!(players = ratings.len(), "rating pass complete");
    Ok(ratings)
}

/// Annotates `records` with `model`'s noise predictor and runs the rating pass.
///
/// `prior` defaults to the model's uniform league-wide prior.
pub fn update_loop(
    records: &[PerformanceRecord],
    model: &LeagueModel,
    prior: Option<Box<dyn PriorGetter>>,
    extensions: &mut [&mut dyn RatingExtension],
) -> Result<RatingStore, UpdateError> {
    let annotated = model.annotate(records.iter().cloned());
    let ratings = match prior {
        Some(prior) => RatingStore::new(prior),
        None => RatingStore::from_model(model),
    };
    run_update_loop(&annotated, ratings, extensions)
}

#[cfg(test)]
mod tests {
    use crate::{GameId, InputError, PossessionStdModel, Rating, UniformPrior};

    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn store(mean: f64, variance: f64) -> RatingStore {
        RatingStore::new(Box::new(UniformPrior::new(Rating::new(mean, variance))))
    }

    fn closed_form(m0: f64, v0: f64, y: f64, sd: f64) -> (f64, f64) {
        let s2 = sd * sd;
        ((m0 * s2 + y * v0) / (s2 + v0), 1.0 / (1.0 / v0 + 1.0 / s2))
    }

    #[test]
    fn test_single_game_scenario() {
        let records = vec![
            PerformanceRecord::new("A", "home", "away", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("B", "away", "home", "g1", 8.0, 20.0).annotate(0.3),
        ];
        let ratings = run_update_loop(&records, store(1.0, 0.5), &mut []).unwrap();

        let a = ratings.rating_of(&"A".into()).unwrap();
        let b = ratings.rating_of(&"B".into()).unwrap();
        let (a_mean, a_var) = closed_form(1.0, 0.5, 0.5, 0.3);
        let (b_mean, b_var) = closed_form(1.0, 0.5, 0.4, 0.3);
        assert!(approx_eq(a.mean, a_mean) && approx_eq(a.variance, a_var));
        assert!(approx_eq(b.mean, b_mean) && approx_eq(b.variance, b_var));

        assert!(a.mean > 0.5 && a.mean < 1.0);
        // B's observation is farther from the shared prior, so B moves further.
        assert!((1.0 - b.mean) > (1.0 - a.mean));
        assert!(b.mean < a.mean);
    }

    #[test]
    fn test_sequential_updates_compound() {
        let records = vec![
            PerformanceRecord::new("A", "x", "y", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("B", "y", "x", "g1", 8.0, 20.0).annotate(0.3),
            PerformanceRecord::new("A", "x", "y", "g2", 30.0, 20.0).annotate(0.5),
            PerformanceRecord::new("B", "y", "x", "g2", 8.0, 20.0).annotate(0.5),
        ];
        let ratings = run_update_loop(&records, store(1.0, 0.5), &mut []).unwrap();
        let (m1, v1) = closed_form(1.0, 0.5, 0.5, 0.3);
        let (m2, v2) = closed_form(m1, v1, 1.5, 0.5);
        let a = ratings.rating_of(&"A".into()).unwrap();
        assert!(approx_eq(a.mean, m2) && approx_eq(a.variance, v2));
    }

    #[test]
    fn test_base_ratings_ignore_game_order() {
        let g1 = [
            PerformanceRecord::new("A", "x", "y", "g1", 4.0, 20.0).annotate(0.2),
            PerformanceRecord::new("B", "y", "x", "g1", 8.0, 20.0).annotate(0.2),
        ];
        let g2 = [
            PerformanceRecord::new("A", "x", "y", "g2", 30.0, 20.0).annotate(0.6),
            PerformanceRecord::new("B", "y", "x", "g2", 20.0, 20.0).annotate(0.6),
        ];
        let forward = g1.iter().chain(&g2).cloned().collect::<Vec<_>>();
        let backward = g2.iter().chain(&g1).cloned().collect::<Vec<_>>();

        let forward = run_update_loop(&forward, store(1.0, 0.5), &mut []).unwrap();
        let backward = run_update_loop(&backward, store(1.0, 0.5), &mut []).unwrap();

        // Without process noise the posterior is the precision-weighted average
        // of the prior and every observation of the player, which commutes.
        // Order only shows up in extensions that read teammates' pre-game ratings.
        for id in ["A", "B"] {
            let f = forward.rating_of(&id.into()).unwrap();
            let b = backward.rating_of(&id.into()).unwrap();
            assert!((f.mean - b.mean).abs() < 1e-12);
            assert!((f.variance - b.variance).abs() < 1e-12);
        }
        let a = forward.rating_of(&"A".into()).unwrap();
        let (m1, v1) = closed_form(1.0, 0.5, 0.2, 0.2);
        let (m2, v2) = closed_form(m1, v1, 1.5, 0.6);
        assert!(approx_eq(a.mean, m2) && approx_eq(a.variance, v2));
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        pre_game_means: Vec<f64>,
    }

    impl RatingExtension for Recorder {
        fn on_team(
            &mut self,
            team: &TeamGame<'_>,
            ratings: &RatingStore,
        ) -> Result<(), ExtensionError> {
            self.events.push(format!("team {} {}", team.game_id(), team.team_id()));
            for record in team.records() {
                self.pre_game_means
                    .push(ratings.get_rating(record.record().into()).mean);
            }
            Ok(())
        }

        fn on_player(
            &mut self,
            team_id: &TeamId,
            record: &AnnotatedRecord,
        ) -> Result<(), ExtensionError> {
            self.events.push(format!("player {team_id} {}", record.player_id()));
            Ok(())
        }
    }

    #[test]
    fn test_extension_hook_order() {
        let records = vec![
            PerformanceRecord::new("a", "x", "y", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("c", "y", "x", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("b", "x", "y", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("a", "x", "y", "g2", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("c", "y", "x", "g2", 10.0, 20.0).annotate(0.3),
        ];
        let mut first = Recorder::default();
        let mut second = Recorder::default();
        run_update_loop(&records, store(1.0, 0.5), &mut [&mut first, &mut second]).unwrap();

        assert_eq!(
            first.events,
            [
                "team g1 x",
                "player x a",
                "player x b",
                "team g1 y",
                "player y c",
                "team g2 x",
                "player x a",
                "team g2 y",
                "player y c",
            ]
        );
        assert_eq!(first.events, second.events);
        // g1 sees priors, g2 sees the g1 posteriors.
        assert_eq!(&first.pre_game_means[..3], &[1.0, 1.0, 1.0]);
        assert!(first.pre_game_means[3] < 1.0);
    }

    struct Failing;

    impl RatingExtension for Failing {
        fn on_player(
            &mut self,
            _team_id: &TeamId,
            record: &AnnotatedRecord,
        ) -> Result<(), ExtensionError> {
            Err(ExtensionError::UnseenKey {
                kind: "test value",
                key: record.player_id().to_string(),
                game_id: GameId::from("g1"),
            })
        }
    }

    #[test]
    fn test_extension_errors_abort_the_pass() {
        let records = vec![
            PerformanceRecord::new("a", "x", "y", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("b", "y", "x", "g1", 10.0, 20.0).annotate(0.3),
        ];
        let err = run_update_loop(&records, store(1.0, 0.5), &mut [&mut Failing]).unwrap_err();
        assert!(matches!(err, UpdateError::Extension(_)));
    }

    #[test]
    fn test_invalid_input_is_rejected_before_updates() {
        let records = vec![
            PerformanceRecord::new("a", "x", "y", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("b", "y", "x", "g1", 10.0, 20.0).annotate(0.3),
            PerformanceRecord::new("a", "x", "y", "g2", 10.0, -1.0).annotate(0.3),
            PerformanceRecord::new("b", "y", "x", "g2", 10.0, 20.0).annotate(0.3),
        ];
        let mut recorder = Recorder::default();
        let err = run_update_loop(&records, store(1.0, 0.5), &mut [&mut recorder]).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Input(InputError::NonPositivePossessions { .. })
        ));
        assert!(recorder.events.is_empty());
    }

    #[test]
    fn test_update_loop_uses_model_noise() {
        let std_model = PossessionStdModel::new(vec![1.0, 0.5], 2, 10.0, 40.0).unwrap();
        let model = LeagueModel::new(1.0, 0.5, std_model).unwrap();
        let records = vec![
            PerformanceRecord::new("A", "x", "y", "g1", 10.0, 20.0),
            PerformanceRecord::new("B", "y", "x", "g1", 8.0, 20.0),
        ];
        let ratings = update_loop(&records, &model, None, &mut []).unwrap();
        let (mean, variance) = closed_form(1.0, 0.5, 0.5, model.observation_sd(20.0));
        let a = ratings.rating_of(&"A".into()).unwrap();
        assert!(approx_eq(a.mean, mean) && approx_eq(a.variance, variance));
    }
}
