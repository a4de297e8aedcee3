//! Pairing properties over whole simulated tournaments.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use swiss_tournament::logic::score_gap_weight;
use swiss_tournament::{
    generate_next_round_with, register_outcome, start_current_round, Pair, PairingSettings,
    PlayerId, Points, PossibilityPool, Tournament, TournamentError,
};

fn tournament_with_participants(n: usize, total_rounds: usize) -> Tournament {
    let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let mut t = Tournament::new("Summer Swiss", "Nantes", day, day, total_rounds);
    for _ in 0..n {
        t.add_participant(PlayerId::new_v4()).unwrap();
    }
    t
}

fn random_result(rng: &mut StdRng) -> Points {
    match rng.gen_range(0..3) {
        0 => Points::Win,
        1 => Points::Lose,
        _ => Points::Draw,
    }
}

/// Cheapest perfect matching of `0..n` using only pool pairs, by enumeration.
fn brute_force_min(n: usize, scores: &[f64], pool: &PossibilityPool) -> Option<i64> {
    fn go(free: &mut Vec<bool>, scores: &[f64], pool: &PossibilityPool) -> Option<i64> {
        let Some(first) = free.iter().position(|&f| f) else {
            return Some(0);
        };
        free[first] = false;
        let mut best: Option<i64> = None;
        for other in (first + 1)..free.len() {
            let pair = Pair::new(first, other).unwrap();
            if !free[other] || !pool.contains(pair) {
                continue;
            }
            free[other] = false;
            if let Some(rest) = go(free, scores, pool) {
                let total = rest + score_gap_weight(scores[first], scores[other]);
                best = Some(best.map_or(total, |b| b.min(total)));
            }
            free[other] = true;
        }
        free[first] = true;
        best
    }
    go(&mut vec![true; n], scores, pool)
}

/// Play `t` to the end with random results, checking every round as it is generated.
/// Returns how many rounds were generated.
fn simulate(t: &mut Tournament, rng: &mut StdRng, check_optimum: bool) -> usize {
    let n = t.participants().len();
    let mut played: HashSet<Pair> = HashSet::new();
    loop {
        let scores: Vec<f64> = t.participants().iter().map(|p| p.score).collect();
        let pool_before = t.pool().cloned();
        let rounds_before = t.rounds().len();

        match generate_next_round_with(t, &PairingSettings::default(), rng) {
            Ok(()) => {}
            Err(TournamentError::RoundLimitReached) => return rounds_before,
            Err(TournamentError::NoFeasibleMatching) => {
                let pool = pool_before.expect("first round is always feasible");
                assert_eq!(brute_force_min(n, &scores, &pool), None);
                assert_eq!(t.rounds().len(), rounds_before);
                assert_eq!(t.pool(), Some(&pool));
                return rounds_before;
            }
            Err(e) => panic!("unexpected error {e:?}"),
        }

        let round = t.rounds().last().unwrap();
        assert_eq!(round.matches.len(), n / 2);
        let mut seen = vec![false; n];
        let mut weight = 0;
        for m in &round.matches {
            let pair = m.pair().unwrap();
            assert!(!seen[pair.low()] && !seen[pair.high()]);
            seen[pair.low()] = true;
            seen[pair.high()] = true;
            assert!(played.insert(pair), "pair {pair:?} met twice");
            weight += score_gap_weight(scores[pair.low()], scores[pair.high()]);
        }
        if check_optimum {
            if let Some(pool) = &pool_before {
                assert_eq!(Some(weight), brute_force_min(n, &scores, pool));
            }
        }

        start_current_round(t).unwrap();
        let r = t.rounds().len() - 1;
        for m in 0..n / 2 {
            register_outcome(t, r, m, random_result(rng)).unwrap();
        }
        let scored = t.rounds().iter().map(|r| r.finished_matches()).sum::<usize>();
        let total: f64 = t.participants().iter().map(|p| p.score).sum();
        assert_eq!(total, scored as f64);
    }
}

#[test]
fn first_round_is_perfect_for_small_even_fields() {
    let mut rng = StdRng::seed_from_u64(21);
    for n in [2, 4, 6, 8] {
        for _ in 0..25 {
            let mut t = tournament_with_participants(n, 1);
            assert_eq!(simulate(&mut t, &mut rng, false), 1);
        }
    }
}

#[test]
fn later_rounds_are_optimal_for_four_and_six() {
    let mut rng = StdRng::seed_from_u64(22);
    for n in [4, 6] {
        for _ in 0..40 {
            let mut t = tournament_with_participants(n, n - 1);
            simulate(&mut t, &mut rng, true);
        }
    }
}

#[test]
fn no_rematch_over_long_events() {
    let mut rng = StdRng::seed_from_u64(23);
    for n in [8, 10, 12] {
        for _ in 0..10 {
            let mut t = tournament_with_participants(n, n / 2);
            // Minimum degree stays >= n/2 for these round counts, so a pairing always exists.
            assert_eq!(simulate(&mut t, &mut rng, false), n / 2);
            assert!(t.is_ended());
        }
    }
}

#[test]
fn round_robin_exhausts_the_pool() {
    let mut rng = StdRng::seed_from_u64(24);
    let mut t = tournament_with_participants(4, 3);
    assert_eq!(simulate(&mut t, &mut rng, true), 3);
    assert!(t.pool().unwrap().is_empty());
}
