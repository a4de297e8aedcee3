//! Runtime settings read from the environment.
//!
//! `HOST`, `PORT`, `DATA_DIR`, `PAIRING_TIMEOUT_MS`, `DEFAULT_TOTAL_ROUNDS`.
//! Missing or unparsable values fall back to the defaults.

use crate::logic::{PairingSettings, DEFAULT_PAIRING_TIMEOUT};
use crate::models::DEFAULT_TOTAL_ROUNDS;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory holding `players.json` and `tournaments.json`.
    pub data_dir: PathBuf,
    pub pairing: PairingSettings,
    /// Rounds for tournaments created without an explicit count.
    pub default_total_rounds: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_dir: PathBuf::from("data"),
            pairing: PairingSettings::default(),
            default_total_rounds: DEFAULT_TOTAL_ROUNDS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment, or a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            pairing: PairingSettings {
                timeout: parsed("PAIRING_TIMEOUT_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_PAIRING_TIMEOUT),
            },
            default_total_rounds: parsed("DEFAULT_TOTAL_ROUNDS")
                .filter(|&n| n > 0)
                .map(|n| n as usize)
                .unwrap_or(defaults.default_total_rounds),
        }
    }
}
