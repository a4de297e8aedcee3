//! Round: the matches played simultaneously, plus lifecycle timestamps.

use crate::models::game::GameMatch;
use crate::models::tournament::TournamentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a round. Transitions only go forward, one step at a time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Matches assigned, not started.
    Pending,
    /// Started; results are being entered.
    Active,
    /// Every match has a result.
    Complete,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub name: String,
    pub matches: Vec<GameMatch>,
    pub status: RoundStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Round {
    pub fn new(name: impl Into<String>, matches: Vec<GameMatch>) -> Self {
        Self {
            name: name.into(),
            matches,
            status: RoundStatus::Pending,
            start_time: None,
            end_time: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.status != RoundStatus::Pending
    }

    pub fn is_finished(&self) -> bool {
        self.status == RoundStatus::Complete
    }

    pub fn finished_matches(&self) -> usize {
        self.matches.iter().filter(|m| m.is_scored()).count()
    }

    /// Pending -> Active.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TournamentError> {
        if self.status != RoundStatus::Pending {
            return Err(TournamentError::RoundAlreadyStarted);
        }
        self.status = RoundStatus::Active;
        self.start_time = Some(now);
        Ok(())
    }

    /// Active -> Complete once the last match is scored. Returns whether the
    /// round completed on this call.
    pub(crate) fn complete_if_all_scored(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != RoundStatus::Active || self.matches.iter().any(|m| !m.is_scored()) {
            return false;
        }
        self.status = RoundStatus::Complete;
        self.end_time = Some(now);
        true
    }

    /// Whether status, timestamps and results agree with each other.
    pub(crate) fn is_consistent(&self) -> bool {
        let all_scored = self.matches.iter().all(|m| m.is_scored());
        match self.status {
            RoundStatus::Pending => {
                self.start_time.is_none() && self.end_time.is_none() && self.finished_matches() == 0
            }
            RoundStatus::Active => self.start_time.is_some() && self.end_time.is_none() && !all_scored,
            RoundStatus::Complete => self.start_time.is_some() && self.end_time.is_some() && all_scored,
        }
    }
}
