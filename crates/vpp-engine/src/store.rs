use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use crate::{LeagueModel, Player, PlayerId, PriorGetter, Rating, UniformPrior};

/// Current belief for every player observed during one pass.
///
/// Lookups for players without a stored rating fall back to the prior getter
/// without storing anything, so reads never change the store.
pub struct RatingStore {
    ratings: HashMap<PlayerId, Rating>,
    prior: Box<dyn PriorGetter>,
}

impl fmt::Debug for RatingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatingStore")
            .field("ratings", &self.ratings)
            .finish_non_exhaustive()
    }
}

impl RatingStore {
    #[must_use]
    pub fn new(prior: Box<dyn PriorGetter>) -> Self {
        Self {
            ratings: HashMap::new(),
            prior,
        }
    }

    /// A store whose prior is the league-wide uniform prior of `model`.
    #[must_use]
    pub fn from_model(model: &LeagueModel) -> Self {
        Self::new(Box::new(UniformPrior::from_model(model)))
    }

    /// The stored belief for `player`, or its prior if it has not been updated yet.
    #[must_use]
    pub fn get_rating(&self, player: Player<'_>) -> Rating {
        self.ratings
            .get(player.player_id)
            .copied()
            .unwrap_or_else(|| self.prior.prior(player))
    }

    /// The stored belief for `player_id`, without falling back to the prior.
    #[must_use]
    pub fn rating_of(&self, player_id: &PlayerId) -> Option<Rating> {
        self.ratings.get(player_id).copied()
    }

    /// Overwrites the stored belief. The caller guarantees a positive variance.
    pub fn update_rating(&mut self, player_id: PlayerId, rating: Rating) {
        self.ratings.insert(player_id, rating);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Stored ratings ordered by player id.
    #[must_use]
    pub fn into_ratings(self) -> BTreeMap<PlayerId, Rating> {
        self.ratings.into_iter().collect()
    }
}
