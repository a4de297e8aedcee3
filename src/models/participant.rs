//! Tournament-scoped score entry for a player.

use crate::models::player::PlayerId;
use serde::{Deserialize, Serialize};

/// Position of a participant in `Tournament::participants`. Matches refer to
/// participants only through this index, so there is a single owner of scores.
pub type ParticipantIdx = usize;

/// A player enrolled in one tournament, with the points gathered so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub player: PlayerId,
    pub score: f64,
}

impl Participant {
    pub fn new(player: PlayerId) -> Self {
        Self { player, score: 0.0 }
    }

    pub(crate) fn add_score(&mut self, points: f64) {
        self.score += points;
    }
}
