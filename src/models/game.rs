//! Match (game) between two participants, its outcome, and unordered pairs.

use crate::models::participant::ParticipantIdx;
use crate::models::tournament::TournamentError;
use serde::{Deserialize, Serialize};

/// Result of a game from one side's point of view.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Points {
    Win,
    Lose,
    Draw,
}

impl Points {
    /// Points added to the cumulative score.
    pub fn value(self) -> f64 {
        match self {
            Points::Win => 1.0,
            Points::Lose => 0.0,
            Points::Draw => 0.5,
        }
    }

    /// Result of the other side of the same game.
    pub fn opposite(self) -> Self {
        match self {
            Points::Win => Points::Lose,
            Points::Lose => Points::Win,
            Points::Draw => Points::Draw,
        }
    }
}

/// Unordered pair of distinct participants, stored lowest index first.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Pair(ParticipantIdx, ParticipantIdx);

impl Pair {
    /// Returns `None` when both sides are the same participant.
    pub fn new(a: ParticipantIdx, b: ParticipantIdx) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Pair(a, b)),
            std::cmp::Ordering::Greater => Some(Pair(b, a)),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(self) -> ParticipantIdx {
        self.0
    }

    pub fn high(self) -> ParticipantIdx {
        self.1
    }
}

/// A single game of a round. `participants_pair` keeps the order in which the
/// pairing was produced; the first side is the one results are entered for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameMatch {
    pub participants_pair: [ParticipantIdx; 2],
    /// `[]` on the wire while unplayed.
    #[serde(with = "outcome_format")]
    pub participants_scores: Option<[Points; 2]>,
}

impl GameMatch {
    /// Unplayed match; `first` is the side results are entered for.
    pub fn new(first: ParticipantIdx, second: ParticipantIdx) -> Self {
        Self {
            participants_pair: [first, second],
            participants_scores: None,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.participants_scores.is_some()
    }

    /// Unordered view of the two participants.
    pub fn pair(&self) -> Option<Pair> {
        Pair::new(self.participants_pair[0], self.participants_pair[1])
    }

    /// Set the outcome from the first participant's result. One-time only.
    pub(crate) fn record(&mut self, first: Points) -> Result<[Points; 2], TournamentError> {
        if self.is_scored() {
            return Err(TournamentError::AlreadyScoredMatch);
        }
        let scores = [first, first.opposite()];
        self.participants_scores = Some(scores);
        Ok(scores)
    }
}

mod outcome_format {
    use super::Points;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<[Points; 2]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let scores: &[Points] = match value {
            Some(scores) => scores,
            None => &[],
        };
        scores.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[Points; 2]>, D::Error> {
        let scores = Vec::<Points>::deserialize(deserializer)?;
        match scores.as_slice() {
            [] => Ok(None),
            [first, second] if first.opposite() == *second => Ok(Some([*first, *second])),
            _ => Err(D::Error::custom(format!(
                "invalid match outcome {:?}: expected [] or two complementary results",
                scores
            ))),
        }
    }
}
