//! Player identity records (owned by the store, referenced by tournaments).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player (used by participants and lookups).
pub type PlayerId = Uuid;

/// A registered chess player.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Federation identifier, e.g. `AB12345`.
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
}

impl Player {
    /// Create a new player with a fresh id.
    pub fn new(
        national_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            national_id: national_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date,
        }
    }

    /// "Last First" form, used for alphabetical reports.
    pub fn sort_key(&self) -> (String, String) {
        (self.last_name.to_lowercase(), self.first_name.to_lowercase())
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.first_name, self.last_name, self.national_id)
    }
}
