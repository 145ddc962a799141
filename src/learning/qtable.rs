//! Sparse Q-table with temporal-difference updates.
//!
//! # Overview
//!
//! The value store is a hash map from discretized [`StateKey`]s to one
//! 3-element value array per state, one slot per action. Entries are created
//! lazily on first lookup with small nonzero random values so that ties
//! break randomly instead of by index order.
//!
//! # Update rule
//!
//! `q += lr * (reward + 0.99 * max(q[next]) - q)`
//!
//! The online learning rate is dynamic: the base rate 0.3 is divided by the
//! square root of an activity measure for the state (summed absolute value
//! of its entry, scaled by 10, floored at 1) and floored at 0.05. States
//! whose entry has accumulated more magnitude receive smaller steps, which
//! approximates visit-count annealing without storing counts. Replay
//! updates use a fixed half-rate instead (see [`ReplayBuffer`]).
//!
//! [`ReplayBuffer`]: crate::learning::replay::ReplayBuffer

use std::collections::HashMap;

use rand::Rng;

use crate::grid::{Action, NUM_ACTIONS};
use crate::learning::encoder::StateKey;
use crate::learning::replay::Experience;

/// Discount factor for future value estimates.
pub const DISCOUNT_FACTOR: f32 = 0.99;

/// Base online learning rate.
pub const BASE_LEARNING_RATE: f32 = 0.3;

/// Floor for the dynamic online learning rate.
pub const MIN_LEARNING_RATE: f32 = 0.05;

/// Fixed learning rate for replay updates (half the base rate).
pub const REPLAY_LEARNING_RATE: f32 = BASE_LEARNING_RATE * 0.5;

/// Half-width of the lazy-init range: fresh entries are drawn uniformly
/// from `(-INIT_SPAN, INIT_SPAN)`.
pub const INIT_SPAN: f32 = 0.05;

/// Per-state action values.
pub type QEntry = [f32; NUM_ACTIONS];

/// Sparse, lazily-populated state-action value store.
#[derive(Debug, Default)]
pub struct QTable {
    entries: HashMap<StateKey, QEntry>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct states seen so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Action values for `key`, creating the entry on first access.
    ///
    /// Fresh entries are initialized to small nonzero pseudo-random values
    /// (magnitude below [`INIT_SPAN`]), never all zeros.
    pub fn values<R: Rng>(&mut self, key: StateKey, rng: &mut R) -> QEntry {
        *self.entry_mut(key, rng)
    }

    fn entry_mut<R: Rng>(&mut self, key: StateKey, rng: &mut R) -> &mut QEntry {
        self.entries.entry(key).or_insert_with(|| {
            let mut entry = [0.0f32; NUM_ACTIONS];
            for value in entry.iter_mut() {
                *value = (rng.random::<f32>() - 0.5) * (2.0 * INIT_SPAN);
            }
            entry
        })
    }

    /// Dynamic learning rate for the online update of `key`.
    pub fn learning_rate<R: Rng>(&mut self, key: StateKey, rng: &mut R) -> f32 {
        let entry = self.values(key, rng);
        let activity: f32 = entry.iter().map(|v| v.abs()).sum();
        let visits = (activity * 10.0).max(1.0);
        (BASE_LEARNING_RATE / visits.sqrt()).max(MIN_LEARNING_RATE)
    }

    /// Online TD update for the transition `(prev, action) -> next`.
    pub fn update<R: Rng>(
        &mut self,
        prev: StateKey,
        action: Action,
        reward: f32,
        next: StateKey,
        rng: &mut R,
    ) {
        let rate = self.learning_rate(prev, rng);
        let max_next = max_value(&self.values(next, rng));
        let entry = self.entry_mut(prev, rng);
        let old = entry[action.index()];
        let new = old + rate * (reward + DISCOUNT_FACTOR * max_next - old);
        entry[action.index()] = new;
        log::trace!("q-update {:.3} -> {:.3} (reward {reward}, lr {rate:.3})", old, new);
    }

    /// Replay update for a stored experience at the fixed half-rate.
    ///
    /// Terminal experiences bootstrap from exactly zero instead of the next
    /// state's maximum.
    pub fn replay_update<R: Rng>(&mut self, experience: &Experience, rng: &mut R) {
        let max_next = if experience.done {
            0.0
        } else {
            max_value(&self.values(experience.next_state, rng))
        };
        let target = experience.reward + DISCOUNT_FACTOR * max_next;
        let entry = self.entry_mut(experience.state, rng);
        let old = entry[experience.action.index()];
        entry[experience.action.index()] = old + REPLAY_LEARNING_RATE * (target - old);
    }

    /// Episode-closing correction: pull the last transition's value toward
    /// its observed reward with no next-state bootstrap, at the base rate.
    pub fn final_update<R: Rng>(
        &mut self,
        key: StateKey,
        action: Action,
        reward: f32,
        rng: &mut R,
    ) {
        let entry = self.entry_mut(key, rng);
        let old = entry[action.index()];
        entry[action.index()] = old + BASE_LEARNING_RATE * (reward - old);
    }
}

#[inline]
fn max_value(entry: &QEntry) -> f32 {
    entry.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}
