use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{GameId, PlayerId, TeamId};

/// One player's contribution to one game.
///
/// `value` is an upstream productivity measure for the whole game and
/// `n_possessions` the estimated exposure it was produced over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub opponent_id: TeamId,
    pub game_id: GameId,
    pub value: f64,
    pub n_possessions: f64,
    /// Date the game was played, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl PerformanceRecord {
    #[must_use]
    pub fn new(
        player_id: impl Into<PlayerId>,
        team_id: impl Into<TeamId>,
        opponent_id: impl Into<TeamId>,
        game_id: impl Into<GameId>,
        value: f64,
        n_possessions: f64,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            team_id: team_id.into(),
            opponent_id: opponent_id.into(),
            game_id: game_id.into(),
            value,
            n_possessions,
            date: None,
        }
    }

    #[must_use]
    pub fn with_date(self, date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..self
        }
    }

    /// Value per possession for this game.
    #[must_use]
    pub fn vpp(&self) -> f64 {
        self.value / self.n_possessions
    }

    /// Attaches the expected noise of this record's per-possession observation.
    #[must_use]
    pub fn annotate(self, observation_sd: f64) -> AnnotatedRecord {
        AnnotatedRecord {
            record: self,
            observation_sd,
        }
    }
}

/// A [`PerformanceRecord`] paired with the standard deviation of its observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    #[serde(flatten)]
    record: PerformanceRecord,
    observation_sd: f64,
}

impl AnnotatedRecord {
    #[must_use]
    pub fn record(&self) -> &PerformanceRecord {
        &self.record
    }

    #[must_use]
    pub fn observation_sd(&self) -> f64 {
        self.observation_sd
    }

    #[must_use]
    pub fn player_id(&self) -> &PlayerId {
        &self.record.player_id
    }

    #[must_use]
    pub fn team_id(&self) -> &TeamId {
        &self.record.team_id
    }

    #[must_use]
    pub fn opponent_id(&self) -> &TeamId {
        &self.record.opponent_id
    }

    #[must_use]
    pub fn game_id(&self) -> &GameId {
        &self.record.game_id
    }

    #[must_use]
    pub fn n_possessions(&self) -> f64 {
        self.record.n_possessions
    }

    #[must_use]
    pub fn vpp(&self) -> f64 {
        self.record.vpp()
    }
}

/// Stably sorts records by date.
///
/// Records sharing a date keep their relative order, so games stay grouped as
/// they were. Undated records sort before dated ones.
pub fn sort_chronologically(records: &mut [PerformanceRecord]) {
    records.sort_by_key(|r| r.date);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_vpp() {
        let record = PerformanceRecord::new("a", "t1", "t2", "g", 10.0, 20.0);
        assert_eq!(record.vpp(), 0.5);
        let annotated = record.annotate(0.3);
        assert_eq!(annotated.vpp(), 0.5);
        assert_eq!(annotated.observation_sd(), 0.3);
        assert_eq!(annotated.player_id().as_str(), "a");
    }

    #[test]
    fn test_sort_is_stable_within_a_date() {
        let mut records = vec![
            PerformanceRecord::new("a", "t1", "t2", "g2", 1.0, 1.0).with_date(date(2)),
            PerformanceRecord::new("b", "t2", "t1", "g2", 1.0, 1.0).with_date(date(2)),
            PerformanceRecord::new("c", "t1", "t2", "g1", 1.0, 1.0).with_date(date(1)),
            PerformanceRecord::new("d", "t2", "t1", "g1", 1.0, 1.0).with_date(date(1)),
        ];
        sort_chronologically(&mut records);
        let order = records
            .iter()
            .map(|r| r.player_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, ["c", "d", "a", "b"]);
    }

    #[test]
    fn test_date_is_optional_in_json() {
        let json = r#"{
            "player_id": "a", "team_id": "t1", "opponent_id": "t2",
            "game_id": "g", "value": 3.0, "n_possessions": 6.0
        }"#;
        let record: PerformanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.date, None);
        assert!(!serde_json::to_string(&record).unwrap().contains("date"));
    }
}
