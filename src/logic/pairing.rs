//! Pairing engine: random pairs for the first round, then score-gap minimizing
//! perfect matchings over the pairs that have not met yet.

use crate::logic::matching::{min_weight_perfect_matching, DeadlineExceeded};
use crate::logic::pool::PossibilityPool;
use crate::models::{ParticipantIdx, TournamentError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, Instant};

/// Default time budget for one subsequent-round pairing.
pub const DEFAULT_PAIRING_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for round generation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PairingSettings {
    /// Solver budget; running out counts as no feasible matching.
    pub timeout: Duration,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PAIRING_TIMEOUT,
        }
    }
}

/// Edge weight of a pair: squared score gap, scaled by 4 so half points stay integral.
pub fn score_gap_weight(a: f64, b: f64) -> i64 {
    let half_points = ((a - b) * 2.0).round() as i64;
    half_points * half_points
}

/// Produce the pairs of the next round, as `[first, second]` sides. `scores`
/// is a snapshot of every participant's score, indexed like
/// `Tournament::participants`.
///
/// The caller is responsible for consuming the returned pairs from `pool`.
pub fn generate_pairing<R: Rng + ?Sized>(
    scores: &[f64],
    pool: &PossibilityPool,
    is_first_round: bool,
    settings: &PairingSettings,
    rng: &mut R,
) -> Result<Vec<[ParticipantIdx; 2]>, TournamentError> {
    let n = scores.len();
    if n < 2 || n % 2 == 1 {
        return Err(TournamentError::InvalidPairingRequest);
    }
    if is_first_round {
        return Ok(random_pairs(n, rng));
    }
    score_pairs(scores, pool, settings)
}

/// Shuffle, then pair neighbours: 0-1, 2-3, ... in shuffled order.
fn random_pairs<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<[ParticipantIdx; 2]> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
        .chunks_exact(2)
        .map(|chunk| [chunk[0], chunk[1]])
        .collect()
}

fn score_pairs(
    scores: &[f64],
    pool: &PossibilityPool,
    settings: &PairingSettings,
) -> Result<Vec<[ParticipantIdx; 2]>, TournamentError> {
    let edges: Vec<(usize, usize, i64)> = pool
        .remaining()
        .map(|p| (p.low(), p.high(), score_gap_weight(scores[p.low()], scores[p.high()])))
        .collect();
    let deadline = Instant::now() + settings.timeout;
    let matched = match min_weight_perfect_matching(scores.len(), &edges, Some(deadline)) {
        Ok(Some(matched)) => matched,
        Ok(None) => {
            log::warn!(
                "No perfect matching among {} remaining pairs for {} participants",
                edges.len(),
                scores.len()
            );
            return Err(TournamentError::NoFeasibleMatching);
        }
        Err(DeadlineExceeded) => {
            log::warn!("Pairing solver exceeded its {:?} budget", settings.timeout);
            return Err(TournamentError::NoFeasibleMatching);
        }
    };

    let mut pairs: Vec<[ParticipantIdx; 2]> = matched
        .into_iter()
        .map(|(a, b)| [a.min(b), a.max(b)])
        .collect();
    // Leaders play on the first boards.
    pairs.sort_by(|x, y| {
        let sx = scores[x[0]] + scores[x[1]];
        let sy = scores[y[0]] + scores[y[1]];
        sy.total_cmp(&sx).then(x.cmp(y))
    });
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn weight_is_exact_for_half_points() {
        assert_eq!(score_gap_weight(0.0, 0.0), 0);
        assert_eq!(score_gap_weight(1.5, 1.0), 1);
        assert_eq!(score_gap_weight(0.0, 2.0), 16);
    }

    #[test]
    fn first_round_rejects_odd_or_empty_fields() {
        let pool = PossibilityPool::initialize(3);
        let mut rng = StdRng::seed_from_u64(1);
        let settings = PairingSettings::default();
        for scores in [vec![0.0; 3], vec![0.0; 1], vec![]] {
            assert!(matches!(
                generate_pairing(&scores, &pool, true, &settings, &mut rng),
                Err(TournamentError::InvalidPairingRequest)
            ));
        }
    }

    #[test]
    fn first_round_is_a_perfect_matching() {
        let mut rng = StdRng::seed_from_u64(3);
        for n in [2, 4, 6, 8] {
            let pool = PossibilityPool::initialize(n);
            let pairs =
                generate_pairing(&vec![0.0; n], &pool, true, &PairingSettings::default(), &mut rng)
                    .unwrap();
            assert_eq!(pairs.len(), n / 2);
            let mut seen = vec![false; n];
            for [a, b] in pairs {
                assert!(a != b && !seen[a] && !seen[b]);
                seen[a] = true;
                seen[b] = true;
            }
        }
    }

    #[test]
    fn first_round_keeps_shuffled_sides() {
        let mut rng = StdRng::seed_from_u64(11);
        let pool = PossibilityPool::initialize(8);
        let mut reversed = 0;
        for _ in 0..20 {
            let pairs =
                generate_pairing(&[0.0; 8], &pool, true, &PairingSettings::default(), &mut rng)
                    .unwrap();
            reversed += pairs.iter().filter(|[a, b]| a > b).count();
        }
        // Sides follow the shuffle, not enrollment order.
        assert!(reversed > 0);
    }

    #[test]
    fn later_rounds_only_use_pool_pairs() {
        let mut pool = PossibilityPool::initialize(4);
        pool.consume(&[Pair::new(0, 1).unwrap(), Pair::new(2, 3).unwrap()])
            .unwrap();
        let scores = [1.0, 0.0, 1.0, 0.0];
        let pairs = generate_pairing(
            &scores,
            &pool,
            false,
            &PairingSettings::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        // Winners meet, losers meet.
        assert_eq!(pairs, vec![[0, 2], [1, 3]]);
    }

    #[test]
    fn exhausted_pool_is_infeasible() {
        let mut pool = PossibilityPool::initialize(4);
        pool.consume(&[Pair::new(0, 1).unwrap(), Pair::new(0, 2).unwrap(), Pair::new(0, 3).unwrap()])
            .unwrap();
        let result = generate_pairing(
            &[0.0; 4],
            &pool,
            false,
            &PairingSettings::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(TournamentError::NoFeasibleMatching)));
    }

    #[test]
    fn zero_timeout_counts_as_infeasible() {
        let pool = PossibilityPool::initialize(4);
        let settings = PairingSettings {
            timeout: Duration::ZERO,
        };
        let result = generate_pairing(&[0.0; 4], &pool, false, &settings, &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(TournamentError::NoFeasibleMatching)));
    }
}
