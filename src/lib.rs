//! Swiss-system chess tournament organizer: library with models and business logic.

pub mod config;
pub mod logic;
pub mod models;
pub mod report;
pub mod store;

pub use config::Config;
pub use logic::{
    generate_next_round, generate_next_round_with, generate_pairing, register_outcome,
    register_outcome_at, start_current_round, start_current_round_at, PairingSettings,
    PossibilityPool,
};
pub use models::{
    GameMatch, Pair, Participant, ParticipantIdx, Player, PlayerId, Points, Round, RoundStatus,
    Tournament, TournamentError, DEFAULT_TOTAL_ROUNDS,
};
pub use store::{Store, StoreError};
