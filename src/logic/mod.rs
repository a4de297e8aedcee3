//! Tournament business logic: possibility pool, matching solver, pairing, round flow.

pub mod matching;
mod pairing;
mod pool;
mod rounds;

pub use pairing::{generate_pairing, score_gap_weight, PairingSettings, DEFAULT_PAIRING_TIMEOUT};
pub use pool::PossibilityPool;
pub use rounds::{
    generate_next_round, generate_next_round_with, register_outcome, register_outcome_at,
    start_current_round, start_current_round_at,
};
