//! Tournament and TournamentError.

use crate::logic::PossibilityPool;
use crate::models::game::{GameMatch, Pair};
use crate::models::participant::{Participant, ParticipantIdx};
use crate::models::player::PlayerId;
use crate::models::round::{Round, RoundStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of rounds used when none is configured.
pub const DEFAULT_TOTAL_ROUNDS: usize = 4;

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TournamentError {
    /// Pairing needs an even number of participants (at least 2).
    InvalidPairingRequest,
    /// The remaining pairs admit no perfect matching, or the solver timed out.
    NoFeasibleMatching,
    /// The match already has a result.
    AlreadyScoredMatch,
    /// The round was started before.
    RoundAlreadyStarted,
    /// Results can only be entered once the round is started.
    RoundNotStarted,
    /// The latest round is not waiting to be started.
    NoPendingRound,
    /// The latest round still has unplayed matches.
    PreviousRoundUnfinished,
    /// Every configured round has been generated.
    RoundLimitReached,
    /// A tournament needs at least one round.
    InvalidRoundCount,
    RoundIndexOutOfRange(usize),
    MatchIndexOutOfRange(usize),
    /// Participants cannot change once a round exists.
    TournamentAlreadyStarted,
    /// The player is already enrolled.
    DuplicateParticipant(PlayerId),
    /// Attempt to consume a pair that is not in the possibility pool.
    InvalidConsumption,
    /// No player registered with this id.
    UnknownPlayer(PlayerId),
    /// A player with this national id already exists.
    DuplicateNationalId(String),
    /// No tournament at this position.
    UnknownTournament(usize),
    /// A decoded record breaks a tournament invariant.
    InvalidRecord(String),
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::InvalidPairingRequest => {
                write!(f, "Need an even number of participants (at least 2) to pair a round")
            }
            TournamentError::NoFeasibleMatching => {
                write!(f, "No pairing exists without repeating a previous match")
            }
            TournamentError::AlreadyScoredMatch => write!(f, "This match already has a result"),
            TournamentError::RoundAlreadyStarted => write!(f, "This round is already started"),
            TournamentError::RoundNotStarted => write!(f, "Start the round before entering results"),
            TournamentError::NoPendingRound => write!(f, "There is no round waiting to be started"),
            TournamentError::PreviousRoundUnfinished => {
                write!(f, "All matches of the current round need a result first")
            }
            TournamentError::RoundLimitReached => write!(f, "All rounds have already been generated"),
            TournamentError::InvalidRoundCount => write!(f, "A tournament needs at least one round"),
            TournamentError::RoundIndexOutOfRange(i) => write!(f, "Round {} does not exist", i),
            TournamentError::MatchIndexOutOfRange(i) => write!(f, "Match {} does not exist", i),
            TournamentError::TournamentAlreadyStarted => {
                write!(f, "Participants cannot change once the tournament has started")
            }
            TournamentError::DuplicateParticipant(_) => {
                write!(f, "This player already takes part in the tournament")
            }
            TournamentError::InvalidConsumption => {
                write!(f, "Pair is not available in the possibility pool")
            }
            TournamentError::UnknownPlayer(id) => write!(f, "Player {} not found", id),
            TournamentError::DuplicateNationalId(id) => {
                write!(f, "A player with national id {} already exists", id)
            }
            TournamentError::UnknownTournament(i) => write!(f, "Tournament {} not found", i),
            TournamentError::InvalidRecord(reason) => write!(f, "Invalid tournament record: {}", reason),
        }
    }
}

impl std::error::Error for TournamentError {}

/// A Swiss-system tournament: participants, rounds played so far, and the
/// pairs still allowed to meet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TournamentRecord")]
pub struct Tournament {
    pub name: String,
    pub location: String,
    pub begin_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_rounds: usize,
    pub(crate) participants: Vec<Participant>,
    pub(crate) rounds: Vec<Round>,
    /// Built when the first round is requested; derived from history on load.
    #[serde(skip)]
    pub(crate) pool: Option<PossibilityPool>,
}

impl Tournament {
    /// Create a tournament with no participants and no rounds.
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        begin_date: NaiveDate,
        end_date: NaiveDate,
        total_rounds: usize,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            begin_date,
            end_date,
            total_rounds,
            participants: Vec::new(),
            rounds: Vec::new(),
            pool: None,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// `None` until the first round has been generated.
    pub fn pool(&self) -> Option<&PossibilityPool> {
        self.pool.as_ref()
    }

    /// Enroll a player. Only valid before the first round is generated.
    pub fn add_participant(&mut self, player: PlayerId) -> Result<ParticipantIdx, TournamentError> {
        if self.is_started() {
            return Err(TournamentError::TournamentAlreadyStarted);
        }
        if self.participant_for(player).is_some() {
            return Err(TournamentError::DuplicateParticipant(player));
        }
        self.participants.push(Participant::new(player));
        Ok(self.participants.len() - 1)
    }

    pub fn participant_for(&self, player: PlayerId) -> Option<(ParticipantIdx, &Participant)> {
        self.participants
            .iter()
            .enumerate()
            .find(|(_, p)| p.player == player)
    }

    /// Latest generated round.
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn get_round_matches(&self, index: usize) -> Result<&[GameMatch], TournamentError> {
        self.rounds
            .get(index)
            .map(|r| r.matches.as_slice())
            .ok_or(TournamentError::RoundIndexOutOfRange(index))
    }

    pub fn is_started(&self) -> bool {
        !self.rounds.is_empty()
    }

    pub fn is_ended(&self) -> bool {
        self.total_finished_rounds() == self.total_rounds
    }

    pub fn total_started_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn total_finished_rounds(&self) -> usize {
        self.rounds.iter().filter(|r| r.is_finished()).count()
    }

    /// Matches of the current round.
    pub fn total_matches(&self) -> usize {
        self.current_round().map_or(0, |r| r.matches.len())
    }

    /// Scored matches of the current round.
    pub fn total_finished_matches(&self) -> usize {
        self.current_round().map_or(0, Round::finished_matches)
    }

    pub(crate) fn scores_snapshot(&self) -> Vec<f64> {
        self.participants.iter().map(|p| p.score).collect()
    }

    /// Every pair that already met, in play order.
    pub(crate) fn played_pairs(&self) -> impl Iterator<Item = Pair> + '_ {
        self.rounds
            .iter()
            .flat_map(|r| r.matches.iter())
            .filter_map(GameMatch::pair)
    }
}

impl std::fmt::Display for Tournament {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" in {} ({} > {})",
            self.name, self.location, self.begin_date, self.end_date
        )
    }
}

/// Wire shape of a tournament, checked before it becomes a `Tournament`.
#[derive(Deserialize)]
struct TournamentRecord {
    name: String,
    location: String,
    begin_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default = "default_total_rounds")]
    total_rounds: usize,
    #[serde(default)]
    participants: Vec<Participant>,
    #[serde(default)]
    rounds: Vec<Round>,
}

fn default_total_rounds() -> usize {
    DEFAULT_TOTAL_ROUNDS
}

impl TryFrom<TournamentRecord> for Tournament {
    type Error = TournamentError;

    fn try_from(record: TournamentRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: String| TournamentError::InvalidRecord(reason);
        let n = record.participants.len();

        if record.total_rounds == 0 {
            return Err(invalid("no rounds configured".to_string()));
        }
        if record.rounds.len() > record.total_rounds {
            return Err(invalid(format!(
                "{} rounds for a {}-round tournament",
                record.rounds.len(),
                record.total_rounds
            )));
        }
        for (i, p) in record.participants.iter().enumerate() {
            if record.participants[..i].iter().any(|q| q.player == p.player) {
                return Err(invalid(format!("player {} enrolled twice", p.player)));
            }
        }

        let mut earned = vec![0.0; n];
        let last = record.rounds.len().saturating_sub(1);
        for (r, round) in record.rounds.iter().enumerate() {
            if !round.is_consistent() {
                return Err(invalid(format!("{} has an inconsistent status", round.name)));
            }
            if r < last && round.status != RoundStatus::Complete {
                return Err(invalid(format!("{} is followed by another round", round.name)));
            }
            if round.matches.len() * 2 != n {
                return Err(invalid(format!("{} does not pair every participant", round.name)));
            }
            let mut seen = vec![false; n];
            for game in &round.matches {
                for (side, &idx) in game.participants_pair.iter().enumerate() {
                    if idx >= n || seen[idx] {
                        return Err(invalid(format!("{} pairs participant {} badly", round.name, idx)));
                    }
                    seen[idx] = true;
                    if let Some(scores) = game.participants_scores {
                        earned[idx] += scores[side].value();
                    }
                }
            }
        }
        for (p, expected) in record.participants.iter().zip(&earned) {
            if p.score != *expected {
                return Err(invalid(format!(
                    "player {} has {} points but results give {}",
                    p.player, p.score, expected
                )));
            }
        }

        let mut tournament = Tournament {
            name: record.name,
            location: record.location,
            begin_date: record.begin_date,
            end_date: record.end_date,
            total_rounds: record.total_rounds,
            participants: record.participants,
            rounds: record.rounds,
            pool: None,
        };
        if tournament.is_started() {
            let pool = PossibilityPool::from_history(n, tournament.played_pairs())
                .map_err(|_| invalid("a pair of participants met twice".to_string()))?;
            tournament.pool = Some(pool);
        }
        Ok(tournament)
    }
}
