//! Grouping and validation of a performance history into games and teams.
//!
//! Games are kept in order of first appearance, teams within a game likewise,
//! and records within a team keep their input order.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::{AnnotatedRecord, GameId, InputError, PlayerId, TeamId};

/// One team's records for one game.
#[derive(Debug, Clone)]
pub struct TeamGame<'a> {
    game_id: &'a GameId,
    team_id: &'a TeamId,
    opponent_id: &'a TeamId,
    records: Vec<&'a AnnotatedRecord>,
}

impl<'a> TeamGame<'a> {
    #[must_use]
    pub fn game_id(&self) -> &'a GameId {
        self.game_id
    }

    #[must_use]
    pub fn team_id(&self) -> &'a TeamId {
        self.team_id
    }

    #[must_use]
    pub fn opponent_id(&self) -> &'a TeamId {
        self.opponent_id
    }

    #[must_use]
    pub fn records(&self) -> &[&'a AnnotatedRecord] {
        &self.records
    }

    #[must_use]
    pub fn total_possessions(&self) -> f64 {
        self.records.iter().map(|r| r.n_possessions()).sum()
    }

    #[must_use]
    pub fn total_value(&self) -> f64 {
        self.records.iter().map(|r| r.record().value).sum()
    }

    /// The team's value per possession for this game.
    #[must_use]
    pub fn vpp(&self) -> f64 {
        self.total_value() / self.total_possessions()
    }

    /// Possession-weighted mean of `f` over the team's records.
    pub fn possession_weighted<F>(&self, mut f: F) -> f64
    where
        F: FnMut(&AnnotatedRecord) -> f64,
    {
        let weighted = self
            .records
            .iter()
            .map(|r| f(r) * r.n_possessions())
            .sum::<f64>();
        weighted / self.total_possessions()
    }
}

/// Both teams' records for one game.
#[derive(Debug, Clone)]
pub struct GameGroup<'a> {
    game_id: &'a GameId,
    teams: Vec<TeamGame<'a>>,
}

impl<'a> GameGroup<'a> {
    #[must_use]
    pub fn game_id(&self) -> &'a GameId {
        self.game_id
    }

    /// The two teams, in order of first appearance.
    #[must_use]
    pub fn teams(&self) -> &[TeamGame<'a>] {
        &self.teams
    }

    fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self
            .teams
            .iter()
            .flat_map(|t| t.records.iter())
            .filter_map(|r| r.record().date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

/// Groups records by game, then by team, validating the input contract.
///
/// Fails on the first record or game that violates it: non-positive or
/// non-finite possessions, non-finite values, invalid observation noise, a game
/// without exactly two teams, an opponent id that does not match the other
/// team, a player listed twice in one game, or dated games out of order.
pub fn schedule(records: &[AnnotatedRecord]) -> Result<Vec<GameGroup<'_>>, InputError> {
    let mut games: Vec<GameGroup<'_>> = Vec::new();
    let mut game_index: HashMap<&GameId, usize> = HashMap::new();

    for record in records {
        validate_record(record)?;
        let idx = *game_index.entry(record.game_id()).or_insert_with(|| {
            games.push(GameGroup {
                game_id: record.game_id(),
                teams: Vec::with_capacity(2),
            });
            games.len() - 1
        });
        let game = &mut games[idx];
        match game.teams.iter_mut().find(|t| t.team_id == record.team_id()) {
            Some(team) => team.records.push(record),
            None => game.teams.push(TeamGame {
                game_id: record.game_id(),
                team_id: record.team_id(),
                opponent_id: record.opponent_id(),
                records: vec![record],
            }),
        }
    }

    let mut latest: Option<NaiveDate> = None;
    for game in &games {
        validate_game(game)?;
        if let Some((first, last)) = game.date_range() {
            if let Some(previous_date) = latest
                && first < previous_date
            {
                return Err(InputError::Unsorted {
                    game_id: game.game_id.clone(),
                    date: first,
                    previous_date,
                });
            }
            latest = Some(latest.map_or(last, |l| l.max(last)));
        }
    }

    Ok(games)
}

fn validate_record(record: &AnnotatedRecord) -> Result<(), InputError> {
    let r = record.record();
    if !(r.n_possessions.is_finite() && r.n_possessions > 0.0) {
        return Err(InputError::NonPositivePossessions {
            player_id: r.player_id.clone(),
            game_id: r.game_id.clone(),
            n_possessions: r.n_possessions,
        });
    }
    if !r.value.is_finite() {
        return Err(InputError::NonFiniteValue {
            player_id: r.player_id.clone(),
            game_id: r.game_id.clone(),
            value: r.value,
        });
    }
    let sd = record.observation_sd();
    if !(sd.is_finite() && sd > 0.0) {
        return Err(InputError::InvalidObservationSd {
            player_id: r.player_id.clone(),
            game_id: r.game_id.clone(),
            observation_sd: sd,
        });
    }
    Ok(())
}

fn validate_game(game: &GameGroup<'_>) -> Result<(), InputError> {
    let [home, away] = game.teams.as_slice() else {
        return Err(InputError::TeamCount {
            game_id: game.game_id.clone(),
            count: game.teams.len(),
        });
    };

    for (team, other) in [(home, away), (away, home)] {
        if let Some(bad) = team
            .records
            .iter()
            .find(|r| r.opponent_id() != other.team_id)
        {
            return Err(InputError::OpponentMismatch {
                game_id: game.game_id.clone(),
                team_id: team.team_id.clone(),
                opponent_id: bad.opponent_id().clone(),
            });
        }
    }

    let mut seen: HashSet<&PlayerId> = HashSet::new();
    for record in home.records.iter().chain(&away.records) {
        if !seen.insert(record.player_id()) {
            return Err(InputError::DuplicatePlayer {
                player_id: record.player_id().clone(),
                game_id: game.game_id.clone(),
            });
        }
    }
    Ok(())
}
