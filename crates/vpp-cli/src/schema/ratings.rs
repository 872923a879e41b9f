use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vpp_analysis::{defense::AdjustmentSign, league::LeagueRatings};
use vpp_engine::{PlayerId, Rating, TeamId};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatingsFile {
    pub rated_at: DateTime<Utc>,
    pub adjustment_sign: AdjustmentSign,
    /// Players of each team's most recent game.
    pub rosters: BTreeMap<TeamId, Vec<PlayerId>>,
    pub ratings: LeagueRatings,
}

/// Per-team prior ratings, keyed by team id.
pub type TeamPriorsFile = BTreeMap<TeamId, Rating>;
