//! Raw box-score rows and the cleaning that turns them into performance records
//!
//! Upstream ingestion produces one [`RawPerformance`] per player-game without
//! the opponent. [`clean_performances`] applies the following steps in order,
//! logging how many rows each one removes:
//!
//! 1. Drop exact duplicate rows
//! 2. Drop rows with non-positive or non-finite possessions, and rows with a
//!    non-finite value
//! 3. Drop every game in which some player has more than one row
//! 4. Assign each row's opponent from the other team of its game
//!
//! A game that does not have exactly two teams after cleaning is an error,
//! not something to be dropped silently.

use std::collections::{HashMap, HashSet, hash_map::Entry};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vpp_engine::{GameId, PerformanceRecord, PlayerId, TeamId};

/// A player's line in one game, before opponents are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPerformance {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub game_id: GameId,
    pub value: f64,
    pub n_possessions: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl RawPerformance {
    fn dedup_key(&self) -> (&PlayerId, &TeamId, &GameId, u64, u64, Option<NaiveDate>) {
        (
            &self.player_id,
            &self.team_id,
            &self.game_id,
            self.value.to_bits(),
            self.n_possessions.to_bits(),
            self.date,
        )
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CleanError {
    #[display("game {game_id} has {count} distinct teams after cleaning, expected 2")]
    TeamCount { game_id: GameId, count: usize },
}

/// How many rows each cleaning step removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub input_rows: usize,
    pub duplicate_rows: usize,
    pub invalid_rows: usize,
    pub multi_row_games: usize,
    pub multi_row_game_rows: usize,
    pub output_rows: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedPerformances {
    pub records: Vec<PerformanceRecord>,
    pub report: CleanReport,
}

/// Cleans raw rows into performance records, keeping the input order.
pub fn clean_performances(rows: Vec<RawPerformance>) -> Result<CleanedPerformances, CleanError> {
    let mut report = CleanReport {
        input_rows: rows.len(),
        ..CleanReport::default()
    };

    let rows = drop_duplicates(rows);
    report.duplicate_rows = report.input_rows - rows.len();
    if report.duplicate_rows > 0 {
        tracing::warn!(rows = report.duplicate_rows, "dropped duplicate rows");
    }

    let before = rows.len();
    let rows = rows
        .into_iter()
        .filter(|row| {
            row.n_possessions.is_finite() && row.n_possessions > 0.0 && row.value.is_finite()
        })
        .collect::<Vec<_>>();
    report.invalid_rows = before - rows.len();
    if report.invalid_rows > 0 {
        tracing::warn!(
            rows = report.invalid_rows,
            "dropped rows with non-positive possessions or non-finite values"
        );
    }

    let bad_games = multi_row_games(&rows);
    let before = rows.len();
    let rows = rows
        .into_iter()
        .filter(|row| !bad_games.contains(&row.game_id))
        .collect::<Vec<_>>();
    report.multi_row_games = bad_games.len();
    report.multi_row_game_rows = before - rows.len();
    if !bad_games.is_empty() {
        tracing::warn!(
            games = bad_games.len(),
            rows = report.multi_row_game_rows,
            "dropped games where a player had multiple rows"
        );
    }

    let records = assign_opponents(rows)?;
    report.output_rows = records.len();
    tracing::info!(
        input = report.input_rows,
        output = report.output_rows,
        "cleaned performances"
    );
    Ok(CleanedPerformances { records, report })
}

fn drop_duplicates(rows: Vec<RawPerformance>) -> Vec<RawPerformance> {
    let keep = {
        let mut seen = HashSet::new();
        rows.iter()
            .map(|row| seen.insert(row.dedup_key()))
            .collect::<Vec<_>>()
    };
    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect()
}

fn multi_row_games(rows: &[RawPerformance]) -> HashSet<GameId> {
    let mut lines = HashMap::<(&PlayerId, &GameId), usize>::new();
    for row in rows {
        *lines.entry((&row.player_id, &row.game_id)).or_default() += 1;
    }
    lines
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((_, game_id), _)| game_id.clone())
        .collect()
}

fn assign_opponents(rows: Vec<RawPerformance>) -> Result<Vec<PerformanceRecord>, CleanError> {
    let mut game_order = Vec::new();
    let mut game_teams = HashMap::<GameId, Vec<TeamId>>::new();
    for row in &rows {
        match game_teams.entry(row.game_id.clone()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().contains(&row.team_id) {
                    entry.get_mut().push(row.team_id.clone());
                }
            }
            Entry::Vacant(entry) => {
                game_order.push(row.game_id.clone());
                entry.insert(vec![row.team_id.clone()]);
            }
        }
    }
    for game_id in &game_order {
        let count = game_teams.get(game_id).map_or(0, Vec::len);
        if count != 2 {
            return Err(CleanError::TeamCount {
                game_id: game_id.clone(),
                count,
            });
        }
    }

    let records = rows
        .into_iter()
        .map(|row| {
            let opponent_id = game_teams[&row.game_id]
                .iter()
                .find(|team_id| **team_id != row.team_id)
                .cloned()
                .unwrap_or_else(|| row.team_id.clone());
            let record = PerformanceRecord::new(
                row.player_id,
                row.team_id,
                opponent_id,
                row.game_id,
                row.value,
                row.n_possessions,
            );
            match row.date {
                Some(date) => record.with_date(date),
                None => record,
            }
        })
        .collect();
    Ok(records)
}
