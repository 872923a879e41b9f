//! Default beliefs for players that have not been observed yet.

use std::collections::HashMap;

use crate::{LeagueModel, PerformanceRecord, PlayerId, Rating, TeamId};

/// The identity a prior is looked up for.
#[derive(Debug, Clone, Copy)]
pub struct Player<'a> {
    pub player_id: &'a PlayerId,
    pub team_id: &'a TeamId,
}

impl<'a> From<&'a PerformanceRecord> for Player<'a> {
    fn from(record: &'a PerformanceRecord) -> Self {
        Self {
            player_id: &record.player_id,
            team_id: &record.team_id,
        }
    }
}

/// Supplies the belief to use for a player before any observation exists.
pub trait PriorGetter {
    fn prior(&self, player: Player<'_>) -> Rating;
}

/// The same league-wide prior for everybody.
#[derive(Debug, Clone, Copy)]
pub struct UniformPrior(Rating);

impl UniformPrior {
    #[must_use]
    pub const fn new(rating: Rating) -> Self {
        Self(rating)
    }

    #[must_use]
    pub fn from_model(model: &LeagueModel) -> Self {
        Self(model.prior())
    }
}

impl PriorGetter for UniformPrior {
    fn prior(&self, _player: Player<'_>) -> Rating {
        self.0
    }
}

/// Adapts a closure into a [`PriorGetter`].
#[derive(Debug, Clone, Copy)]
pub struct PriorFn<F>(pub F);

impl<F> PriorGetter for PriorFn<F>
where
    F: Fn(Player<'_>) -> Rating,
{
    fn prior(&self, player: Player<'_>) -> Rating {
        (self.0)(player)
    }
}

/// A team prior table that cannot back a rating pass.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TeamPriorError {
    #[display("team history prior needs at least one team")]
    Empty,
    #[display("team {team_id} has an invalid prior (mean {mean}, variance {variance})")]
    InvalidRating {
        team_id: TeamId,
        mean: f64,
        variance: f64,
    },
}

/// Prior taken from the player's team history.
///
/// Teams missing from the table fall back to the median of the team means with
/// the largest team variance.
#[derive(Debug, Clone)]
pub struct TeamHistoryPrior {
    teams: HashMap<TeamId, Rating>,
    fallback: Rating,
}

impl TeamHistoryPrior {
    /// Builds the prior from per-team ratings.
    ///
    /// Every mean must be finite and every variance positive and finite.
    pub fn new<I>(teams: I) -> Result<Self, TeamPriorError>
    where
        I: IntoIterator<Item = (TeamId, Rating)>,
    {
        let teams = teams.into_iter().collect::<HashMap<_, _>>();
        if let Some((team_id, rating)) = teams.iter().find(|(_, rating)| {
            !(rating.mean.is_finite() && rating.variance.is_finite() && rating.variance > 0.0)
        }) {
            return Err(TeamPriorError::InvalidRating {
                team_id: team_id.clone(),
                mean: rating.mean,
                variance: rating.variance,
            });
        }
        let mut means = teams.values().map(|r| r.mean).collect::<Vec<_>>();
        if means.is_empty() {
            return Err(TeamPriorError::Empty);
        }
        means.sort_by(f64::total_cmp);
        let mid = means.len() / 2;
        let median = if means.len() % 2 == 0 {
            f64::midpoint(means[mid - 1], means[mid])
        } else {
            means[mid]
        };
        let max_variance = teams
            .values()
            .map(|r| r.variance)
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            teams,
            fallback: Rating::new(median, max_variance),
        })
    }
}

impl PriorGetter for TeamHistoryPrior {
    fn prior(&self, player: Player<'_>) -> Rating {
        self.teams
            .get(player.team_id)
            .copied()
            .unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_history_prior() {
        let prior = TeamHistoryPrior::new([
            (TeamId::from("a"), Rating::new(0.9, 0.02)),
            (TeamId::from("b"), Rating::new(1.1, 0.05)),
            (TeamId::from("c"), Rating::new(1.0, 0.03)),
        ])
        .unwrap();
        let player_id = PlayerId::from("p");

        let team_b = TeamId::from("b");
        let known = prior.prior(Player {
            player_id: &player_id,
            team_id: &team_b,
        });
        assert_eq!(known, Rating::new(1.1, 0.05));

        let expansion = TeamId::from("expansion");
        let unknown = prior.prior(Player {
            player_id: &player_id,
            team_id: &expansion,
        });
        assert_eq!(unknown, Rating::new(1.0, 0.05));
    }

    #[test]
    fn test_empty_team_history_is_rejected() {
        assert!(matches!(TeamHistoryPrior::new([]), Err(TeamPriorError::Empty)));
    }

    #[test]
    fn test_invalid_team_ratings_are_rejected() {
        for bad in [
            Rating::new(1.0, -0.09),
            Rating::new(1.0, 0.0),
            Rating::new(1.0, f64::INFINITY),
            Rating::new(f64::NAN, 0.1),
        ] {
            let err = TeamHistoryPrior::new([
                (TeamId::from("ok"), Rating::new(1.0, 0.05)),
                (TeamId::from("bad"), bad),
            ])
            .unwrap_err();
            let TeamPriorError::InvalidRating { team_id, .. } = &err else {
                panic!("unexpected error: {err}");
            };
            assert_eq!(team_id.as_str(), "bad");
        }
    }

    #[test]
    fn test_prior_fn() {
        let prior = PriorFn(|player: Player<'_>| {
            if player.team_id.as_str() == "strong" {
                Rating::new(1.2, 0.1)
            } else {
                Rating::new(0.8, 0.1)
            }
        });
        let record = PerformanceRecord::new("p", "strong", "weak", "g", 1.0, 1.0);
        assert_eq!(prior.prior((&record).into()).mean, 1.2);
    }
}
