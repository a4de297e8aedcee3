//! Round flow: generate the next round, start it, enter match results.

use crate::logic::pairing::{generate_pairing, PairingSettings};
use crate::logic::pool::PossibilityPool;
use crate::models::{GameMatch, Pair, Points, Round, RoundStatus, Tournament, TournamentError};
use chrono::{DateTime, Utc};
use rand::Rng;

/// Generate the next round with default settings and a thread-local RNG.
pub fn generate_next_round(tournament: &mut Tournament) -> Result<(), TournamentError> {
    generate_next_round_with(tournament, &PairingSettings::default(), &mut rand::thread_rng())
}

/// Generate and append the next round (status `Pending`).
///
/// 1. Refuse past `total_rounds`, or while the latest round is unfinished.
/// 2. Round 1: build the possibility pool and pair at random.
/// 3. Later rounds: minimum score-gap perfect matching over the pool.
/// 4. Consume the chosen pairs from the pool.
///
/// On error nothing changes: rounds, pool and scores are left as they were.
pub fn generate_next_round_with<R: Rng + ?Sized>(
    tournament: &mut Tournament,
    settings: &PairingSettings,
    rng: &mut R,
) -> Result<(), TournamentError> {
    if tournament.rounds.len() >= tournament.total_rounds {
        return Err(TournamentError::RoundLimitReached);
    }
    if tournament.rounds.last().is_some_and(|r| !r.is_finished()) {
        return Err(TournamentError::PreviousRoundUnfinished);
    }

    let is_first_round = tournament.rounds.is_empty();
    let mut pool = match (&tournament.pool, is_first_round) {
        (Some(pool), false) => pool.clone(),
        (None, false) => {
            PossibilityPool::from_history(tournament.participants.len(), tournament.played_pairs())?
        }
        (_, true) => PossibilityPool::initialize(tournament.participants.len()),
    };

    let scores = tournament.scores_snapshot();
    let sides = generate_pairing(&scores, &pool, is_first_round, settings, rng)?;
    let pairs: Vec<Pair> = sides.iter().filter_map(|&[a, b]| Pair::new(a, b)).collect();
    if pairs.len() != sides.len() {
        return Err(TournamentError::InvalidConsumption);
    }
    pool.consume(&pairs)?;

    let name = format!("Round {}", tournament.rounds.len() + 1);
    log::debug!("Generated matches list for {}:", name);
    for &[first, second] in &sides {
        let (a, b) = (&tournament.participants[first], &tournament.participants[second]);
        log::debug!("{} ({}) vs {} ({})", a.player, a.score, b.player, b.score);
    }
    let matches: Vec<GameMatch> = sides
        .into_iter()
        .map(|[first, second]| GameMatch::new(first, second))
        .collect();

    tournament.pool = Some(pool);
    tournament.rounds.push(Round::new(name, matches));
    Ok(())
}

/// Start the latest round, stamped with the current time.
pub fn start_current_round(tournament: &mut Tournament) -> Result<(), TournamentError> {
    start_current_round_at(tournament, Utc::now())
}

pub fn start_current_round_at(
    tournament: &mut Tournament,
    now: DateTime<Utc>,
) -> Result<(), TournamentError> {
    match tournament.rounds.last_mut() {
        Some(round) if round.status == RoundStatus::Pending => {
            round.start(now)?;
            log::info!("{} started", round.name);
            Ok(())
        }
        _ => Err(TournamentError::NoPendingRound),
    }
}

/// Record a match result, given from the first participant's side.
pub fn register_outcome(
    tournament: &mut Tournament,
    round_index: usize,
    match_index: usize,
    first_result: Points,
) -> Result<(), TournamentError> {
    register_outcome_at(tournament, round_index, match_index, first_result, Utc::now())
}

/// Record a match result at `now`.
///
/// Adds the points of both sides to their participants and, when this was
/// the last unplayed match, completes the round with `now` as its end time.
pub fn register_outcome_at(
    tournament: &mut Tournament,
    round_index: usize,
    match_index: usize,
    first_result: Points,
    now: DateTime<Utc>,
) -> Result<(), TournamentError> {
    let round = tournament
        .rounds
        .get_mut(round_index)
        .ok_or(TournamentError::RoundIndexOutOfRange(round_index))?;
    let game = round
        .matches
        .get_mut(match_index)
        .ok_or(TournamentError::MatchIndexOutOfRange(match_index))?;
    if game.is_scored() {
        return Err(TournamentError::AlreadyScoredMatch);
    }
    if round.status == RoundStatus::Pending {
        return Err(TournamentError::RoundNotStarted);
    }

    let sides = game.participants_pair;
    let results = game.record(first_result)?;
    for (idx, result) in sides.into_iter().zip(results) {
        tournament.participants[idx].add_score(result.value());
    }

    if round.complete_if_all_scored(now) {
        log::info!("{} complete", round.name);
        if tournament.rounds.len() == tournament.total_rounds {
            log::info!("Tournament {} ended", tournament.name);
        }
    }
    Ok(())
}
