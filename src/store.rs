//! Players and tournaments collections, saved to and loaded from JSON files.
//!
//! Each collection is written as a whole (`players.json`, `tournaments.json`),
//! through a temporary file renamed into place.

use crate::models::{Player, PlayerId, Tournament, TournamentError};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

pub const PLAYERS_FILE: &str = "players.json";
pub const TOURNAMENTS_FILE: &str = "tournaments.json";

/// Errors from saving, loading or exporting data.
#[derive(Debug)]
pub enum StoreError {
    /// The change itself was refused; nothing was applied or written.
    Rejected(TournamentError),
    /// Reading or writing the data files failed.
    PersistenceIo(io::Error),
    /// A data file is not valid JSON for its collection.
    Encoding(serde_json::Error),
    /// Writing a CSV export failed.
    Export(csv::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Rejected(e) => write!(f, "{}", e),
            StoreError::PersistenceIo(e) => write!(f, "Storage error: {}", e),
            StoreError::Encoding(e) => write!(f, "Invalid data file: {}", e),
            StoreError::Export(e) => write!(f, "Export failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Rejected(e) => Some(e),
            StoreError::PersistenceIo(e) => Some(e),
            StoreError::Encoding(e) => Some(e),
            StoreError::Export(e) => Some(e),
        }
    }
}

impl From<TournamentError> for StoreError {
    fn from(e: TournamentError) -> Self {
        StoreError::Rejected(e)
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::PersistenceIo(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Encoding(e)
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Export(e)
    }
}

/// Everything the application persists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Store {
    pub players: Vec<Player>,
    pub tournaments: Vec<Tournament>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load both collections from `dir`. Missing files count as empty
    /// collections (first run); any other failure is returned as is.
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let players: Vec<Player> = read_collection(&dir.join(PLAYERS_FILE))?;
        let tournaments: Vec<Tournament> = read_collection(&dir.join(TOURNAMENTS_FILE))?;
        log::info!(
            "Loaded {} player(s) and {} tournament(s) from {}",
            players.len(),
            tournaments.len(),
            dir.display()
        );
        let store = Self { players, tournaments };
        for t in &store.tournaments {
            for p in t.participants() {
                if store.player(p.player).is_none() {
                    log::warn!("Tournament {} references unknown player {}", t, p.player);
                }
            }
        }
        Ok(store)
    }

    /// Write both collections to `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dir)?;
        write_collection(&dir.join(PLAYERS_FILE), &self.players)?;
        write_collection(&dir.join(TOURNAMENTS_FILE), &self.tournaments)?;
        log::debug!("Saved store to {}", dir.display());
        Ok(())
    }

    /// Apply `change` and write the result to `dir`. If the change is refused
    /// or the save fails, the store is restored to its previous state.
    pub fn commit<T>(
        &mut self,
        dir: &Path,
        change: impl FnOnce(&mut Store) -> Result<T, TournamentError>,
    ) -> Result<T, StoreError> {
        let snapshot = self.clone();
        let outcome = change(self)
            .map_err(StoreError::from)
            .and_then(|value| self.save(dir).map(|()| value));
        if outcome.is_err() {
            *self = snapshot;
        }
        outcome
    }

    /// Register a player. National ids are stored trimmed and are unique
    /// (case-insensitive).
    pub fn add_player(&mut self, mut player: Player) -> Result<PlayerId, TournamentError> {
        let national_id = player.national_id.trim().to_string();
        if self
            .players
            .iter()
            .any(|p| p.national_id.trim().eq_ignore_ascii_case(&national_id))
        {
            return Err(TournamentError::DuplicateNationalId(national_id));
        }
        player.national_id = national_id;
        let id = player.id;
        self.players.push(player);
        Ok(id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Add a tournament, returning its index.
    pub fn add_tournament(&mut self, tournament: Tournament) -> Result<usize, TournamentError> {
        if tournament.total_rounds == 0 {
            return Err(TournamentError::InvalidRoundCount);
        }
        self.tournaments.push(tournament);
        Ok(self.tournaments.len() - 1)
    }

    pub fn tournament(&self, index: usize) -> Result<&Tournament, TournamentError> {
        self.tournaments
            .get(index)
            .ok_or(TournamentError::UnknownTournament(index))
    }

    pub fn tournament_mut(&mut self, index: usize) -> Result<&mut Tournament, TournamentError> {
        self.tournaments
            .get_mut(index)
            .ok_or(TournamentError::UnknownTournament(index))
    }

    /// Enroll a registered player in a tournament.
    pub fn enroll(&mut self, tournament: usize, player: PlayerId) -> Result<(), TournamentError> {
        if self.player(player).is_none() {
            return Err(TournamentError::UnknownPlayer(player));
        }
        self.tournament_mut(tournament)?.add_participant(player)?;
        Ok(())
    }
}

fn read_collection<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn player(national_id: &str) -> Player {
        Player::new(
            national_id,
            "Ada",
            "Lovelace",
            NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
        )
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn national_ids_are_unique() {
        let mut store = Store::new();
        store.add_player(player("AB12345")).unwrap();
        assert!(matches!(
            store.add_player(player("ab12345")),
            Err(TournamentError::DuplicateNationalId(_))
        ));
        assert_eq!(store.players.len(), 1);
    }

    #[test]
    fn padded_national_id_is_trimmed_and_still_unique() {
        let mut store = Store::new();
        let id = store.add_player(player(" AB12345 ")).unwrap();
        assert_eq!(store.player(id).unwrap().national_id, "AB12345");
        assert!(matches!(
            store.add_player(player("AB12345")),
            Err(TournamentError::DuplicateNationalId(_))
        ));
        assert!(store.add_player(player("  ab12345")).is_err());
        assert_eq!(store.players.len(), 1);
    }

    #[test]
    fn tournament_needs_at_least_one_round() {
        let mut store = Store::new();
        assert_eq!(
            store.add_tournament(Tournament::new("Open", "Lyon", day(), day(), 0)),
            Err(TournamentError::InvalidRoundCount)
        );
        assert!(store.tournaments.is_empty());
    }

    #[test]
    fn enroll_requires_known_player_and_tournament() {
        let mut store = Store::new();
        let id = store.add_player(player("AB12345")).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let t = store.add_tournament(Tournament::new("Open", "Lyon", day, day, 4)).unwrap();

        assert!(matches!(
            store.enroll(t, PlayerId::new_v4()),
            Err(TournamentError::UnknownPlayer(_))
        ));
        assert!(matches!(store.enroll(t + 1, id), Err(TournamentError::UnknownTournament(1))));
        store.enroll(t, id).unwrap();
        assert_eq!(store.tournament(t).unwrap().participants().len(), 1);
    }

    #[test]
    fn commit_saves_applied_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::new();
        let id = store
            .commit(dir.path(), |s| s.add_player(player("AB12345")))
            .unwrap();
        assert!(store.player(id).is_some());
        assert_eq!(Store::load(dir.path()).unwrap(), store);
    }

    #[test]
    fn commit_rolls_back_refused_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::new();
        store.add_player(player("AB12345")).unwrap();
        let before = store.clone();
        let result = store.commit(dir.path(), |s| {
            s.add_tournament(Tournament::new("Open", "Lyon", day(), day(), 4))?;
            s.add_player(player("ab12345"))
        });
        assert!(matches!(
            result,
            Err(StoreError::Rejected(TournamentError::DuplicateNationalId(_)))
        ));
        assert_eq!(store, before);
        assert!(!dir.path().join(PLAYERS_FILE).exists());
    }

    #[test]
    fn commit_rolls_back_when_save_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "").unwrap();
        let mut store = Store::new();
        let t = store.add_tournament(Tournament::new("Open", "Lyon", day(), day(), 4)).unwrap();
        let before = store.clone();

        let result = store.commit(&file, |s| {
            let id = s.add_player(player("AB12345"))?;
            s.enroll(t, id)
        });
        assert!(matches!(result, Err(StoreError::PersistenceIo(_))));
        assert_eq!(store, before);
        assert!(store.tournament(t).unwrap().participants().is_empty());
    }

    #[test]
    fn load_from_empty_directory_gives_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Store::load(dir.path()).unwrap(), Store::new());
    }

    #[test]
    fn corrupt_file_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PLAYERS_FILE), "{not json").unwrap();
        assert!(matches!(Store::load(dir.path()), Err(StoreError::Encoding(_))));
    }

    #[test]
    fn unreadable_location_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "").unwrap();
        // A regular file cannot act as the data directory.
        assert!(matches!(Store::new().save(&file), Err(StoreError::PersistenceIo(_))));
    }
}
