//! Possibility pool: participant pairs that have not met yet in a tournament.

use crate::models::{Pair, TournamentError};
use std::collections::BTreeSet;

/// Pairs still available for pairing. Only ever shrinks.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PossibilityPool {
    pairs: BTreeSet<Pair>,
}

impl PossibilityPool {
    /// All C(n, 2) pairs of `participant_count` participants.
    pub fn initialize(participant_count: usize) -> Self {
        let pairs = (0..participant_count)
            .flat_map(|a| ((a + 1)..participant_count).filter_map(move |b| Pair::new(a, b)))
            .collect();
        Self { pairs }
    }

    /// Full pool minus every pair already played. Used when reloading a
    /// tournament, since the pool itself is not persisted.
    pub fn from_history(
        participant_count: usize,
        played: impl IntoIterator<Item = Pair>,
    ) -> Result<Self, TournamentError> {
        let mut pool = Self::initialize(participant_count);
        for pair in played {
            if !pool.pairs.remove(&pair) {
                return Err(TournamentError::InvalidConsumption);
            }
        }
        Ok(pool)
    }

    /// Unconsumed pairs in ascending order.
    pub fn remaining(&self) -> impl Iterator<Item = Pair> + '_ {
        self.pairs.iter().copied()
    }

    pub fn contains(&self, pair: Pair) -> bool {
        self.pairs.contains(&pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Remove `pairs`. All-or-nothing: fails without touching the pool if any
    /// pair is absent or listed twice.
    pub fn consume(&mut self, pairs: &[Pair]) -> Result<(), TournamentError> {
        let unique: BTreeSet<Pair> = pairs.iter().copied().collect();
        if unique.len() != pairs.len() || !unique.iter().all(|p| self.pairs.contains(p)) {
            return Err(TournamentError::InvalidConsumption);
        }
        for pair in &unique {
            self.pairs.remove(pair);
        }
        Ok(())
    }
}
