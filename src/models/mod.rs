//! Data structures for a Swiss tournament: players, participants, matches, rounds.

mod game;
mod participant;
mod player;
mod round;
mod tournament;

pub use game::{GameMatch, Pair, Points};
pub use participant::{Participant, ParticipantIdx};
pub use player::{Player, PlayerId};
pub use round::{Round, RoundStatus};
pub use tournament::{Tournament, TournamentError, DEFAULT_TOTAL_ROUNDS};
