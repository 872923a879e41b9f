//! Learning how teams split possessions by within-team rating rank
//!
//! [`PossessionAllocation`] watches a rating pass. Before a team's players are
//! updated it ranks them by their pre-game rating mean (1 = best, ties keep
//! record order), and for every player it records the share of the team's
//! possessions that player used at that rank.
//!
//! [`PossessionAllocator`] averages the shares per rank and takes a running
//! minimum down the ranks, so a lower-ranked player is never expected to get
//! more possessions than a higher-ranked teammate:
//!
//! ```text
//! rank:          1     2     3     4
//! mean share:  0.30  0.22  0.24  0.10
//! curve:       0.30  0.22  0.22  0.10
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use vpp_engine::{
    AnnotatedRecord, ExtensionError, GameId, LeagueModel, PerformanceRecord, PlayerId, Rating,
    RatingExtension, RatingStore, TeamGame, TeamId, UpdateError, update_loop,
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum AllocationError {
    #[display("no possession shares were observed")]
    NoObservations,
    #[display("share {share} at rank {rank} is not positive and finite")]
    InvalidShare { rank: usize, share: f64 },
    #[display("share at rank {rank} is larger than the share at the rank above")]
    Increasing { rank: usize },
    #[display("rating pass failed: {_0}")]
    #[from]
    Update(UpdateError),
}

/// One player-game: the player's rank on the team and share of its possessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareObservation {
    pub rank: usize,
    pub share: f64,
}

#[derive(Debug)]
struct TeamRanks {
    game_id: GameId,
    total_possessions: f64,
    ranks: HashMap<PlayerId, usize>,
}

/// Rating extension recording possession shares by rank.
#[derive(Debug, Default)]
pub struct PossessionAllocation {
    teams: HashMap<TeamId, TeamRanks>,
    observations: Vec<ShareObservation>,
}

impl PossessionAllocation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn observations(&self) -> &[ShareObservation] {
        &self.observations
    }

    pub fn allocator(&self) -> Result<PossessionAllocator, AllocationError> {
        PossessionAllocator::from_observations(&self.observations)
    }
}

impl RatingExtension for PossessionAllocation {
    fn on_team(
        &mut self,
        team: &TeamGame<'_>,
        ratings: &RatingStore,
    ) -> Result<(), ExtensionError> {
        let mut pregame = team
            .records()
            .iter()
            .map(|record| {
                let mean = ratings.get_rating(record.record().into()).mean;
                (record.player_id(), mean)
            })
            .collect::<Vec<_>>();
        pregame.sort_by(|(_, a), (_, b)| b.total_cmp(a));

        let ranks = pregame
            .into_iter()
            .enumerate()
            .map(|(i, (player_id, _))| (player_id.clone(), i + 1))
            .collect();
        self.teams.insert(
            team.team_id().clone(),
            TeamRanks {
                game_id: team.game_id().clone(),
                total_possessions: team.total_possessions(),
                ranks,
            },
        );
        Ok(())
    }

    fn on_player(
        &mut self,
        team_id: &TeamId,
        record: &AnnotatedRecord,
    ) -> Result<(), ExtensionError> {
        let unseen = |kind, key: &dyn ToString| ExtensionError::UnseenKey {
            kind,
            key: key.to_string(),
            game_id: record.game_id().clone(),
        };
        let team = self
            .teams
            .get(team_id)
            .filter(|team| team.game_id == *record.game_id())
            .ok_or_else(|| unseen("team ranks", team_id))?;
        let rank = *team
            .ranks
            .get(record.player_id())
            .ok_or_else(|| unseen("player rank", record.player_id()))?;
        self.observations.push(ShareObservation {
            rank,
            share: record.n_possessions() / team.total_possessions,
        });
        Ok(())
    }
}

/// Expected possession share by within-team rank, non-increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PossessionAllocatorParams")]
pub struct PossessionAllocator {
    shares: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct PossessionAllocatorParams {
    shares: Vec<f64>,
}

impl TryFrom<PossessionAllocatorParams> for PossessionAllocator {
    type Error = AllocationError;

    fn try_from(params: PossessionAllocatorParams) -> Result<Self, Self::Error> {
        Self::new(params.shares)
    }
}

impl PossessionAllocator {
    /// Builds an allocator from a share curve indexed by rank (rank 1 first).
    pub fn new(shares: Vec<f64>) -> Result<Self, AllocationError> {
        if shares.is_empty() {
            return Err(AllocationError::NoObservations);
        }
        for (i, &share) in shares.iter().enumerate() {
            if !(share.is_finite() && share > 0.0) {
                return Err(AllocationError::InvalidShare { rank: i + 1, share });
            }
            if i > 0 && share > shares[i - 1] {
                return Err(AllocationError::Increasing { rank: i + 1 });
            }
        }
        Ok(Self { shares })
    }

    /// Averages shares per rank and forces the curve to be non-increasing.
    #[expect(clippy::cast_precision_loss)]
    pub fn from_observations(
        observations: &[ShareObservation],
    ) -> Result<Self, AllocationError> {
        let mut by_rank = BTreeMap::<usize, (f64, usize)>::new();
        for observation in observations {
            let (sum, count) = by_rank.entry(observation.rank).or_default();
            *sum += observation.share;
            *count += 1;
        }

        let mut shares = Vec::with_capacity(by_rank.len());
        let mut running_min = f64::INFINITY;
        for (sum, count) in by_rank.into_values() {
            running_min = running_min.min(sum / count as f64);
            shares.push(running_min);
        }
        tracing::debug!(
            ranks = shares.len(),
            observations = observations.len(),
            "built allocation curve"
        );
        Self::new(shares)
    }

    /// The share curve, rank 1 first.
    #[must_use]
    pub fn shares(&self) -> &[f64] {
        &self.shares
    }

    /// Splits possessions among `ratings`, best rated first.
    ///
    /// Players are ranked by descending rating mean, ties by player id. Ranks
    /// beyond the end of the curve reuse its last share. The returned shares
    /// sum to 1 unless the roster is empty.
    #[must_use]
    pub fn allocate(&self, ratings: &BTreeMap<PlayerId, Rating>) -> Vec<(PlayerId, f64)> {
        let mut ranked = ratings.iter().collect::<Vec<_>>();
        ranked.sort_by(|(_, a), (_, b)| b.mean.total_cmp(&a.mean));

        let last = self.shares.last().copied().unwrap_or(1.0);
        let raw = (0..ranked.len())
            .map(|i| self.shares.get(i).copied().unwrap_or(last))
            .collect::<Vec<_>>();
        let total = raw.iter().sum::<f64>();
        ranked
            .into_iter()
            .zip(raw)
            .map(|((player_id, _), share)| (player_id.clone(), share / total))
            .collect()
    }
}

/// Runs a base-rating pass over `records` and fits an allocator from it.
pub fn fit_allocator(
    records: &[PerformanceRecord],
    model: &LeagueModel,
) -> Result<PossessionAllocator, AllocationError> {
    let mut allocation = PossessionAllocation::new();
    update_loop(records, model, None, &mut [&mut allocation])?;
    let allocator = allocation.allocator()?;
    tracing::info!(ranks = allocator.shares().len(), "fitted possession allocator");
    Ok(allocator)
}

/// Players of each team's most recent game, in record order.
///
/// Games are ordered by their first appearance in `records`, which are expected
/// to be chronological already.
#[must_use]
pub fn latest_rosters(records: &[PerformanceRecord]) -> BTreeMap<TeamId, Vec<PlayerId>> {
    let mut game_order = HashMap::<&GameId, usize>::new();
    for record in records {
        let next = game_order.len();
        game_order.entry(&record.game_id).or_insert(next);
    }

    let mut latest_game = HashMap::<&TeamId, usize>::new();
    for record in records {
        let order = game_order[&record.game_id];
        latest_game
            .entry(&record.team_id)
            .and_modify(|latest| *latest = (*latest).max(order))
            .or_insert(order);
    }

    let mut rosters = BTreeMap::<TeamId, Vec<PlayerId>>::new();
    for record in records {
        if game_order[&record.game_id] == latest_game[&record.team_id] {
            rosters
                .entry(record.team_id.clone())
                .or_default()
                .push(record.player_id.clone());
        }
    }
    rosters
}
