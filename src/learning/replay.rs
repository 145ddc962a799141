//! Bounded experience-replay buffer.
//!
//! # Overview
//!
//! Past transitions are kept in a fixed-capacity FIFO ring and re-learned in
//! small random minibatches after each online update. Sampling is uniform
//! with replacement, so a single experience may appear more than once in a
//! batch. Replay fires only once the buffer holds at least one full batch.
//!
//! The `done` flag stored on each experience is the transition's actual
//! terminal marker as reported by the caller, never inferred from the
//! reward's magnitude.

use std::collections::VecDeque;

use rand::Rng;

use crate::grid::Action;
use crate::learning::encoder::StateKey;
use crate::learning::qtable::QTable;

/// Default buffer capacity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Default replay minibatch size.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// One stored transition. Immutable once stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Experience {
    pub state: StateKey,
    pub action: Action,
    pub reward: f32,
    pub next_state: StateKey,
    /// Whether the transition ended the episode.
    pub done: bool,
}

/// Fixed-capacity FIFO ring of past transitions.
#[derive(Debug)]
pub struct ReplayBuffer {
    experiences: VecDeque<Experience>,
    capacity: usize,
    batch_size: usize,
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_BATCH_SIZE)
    }

    /// Create a buffer with explicit capacity and batch size.
    pub fn with_capacity(capacity: usize, batch_size: usize) -> Self {
        Self {
            experiences: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            batch_size,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.experiences.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.experiences.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an experience, evicting the oldest entry on overflow.
    pub fn push(&mut self, experience: Experience) {
        if self.experiences.len() >= self.capacity {
            self.experiences.pop_front();
        }
        self.experiences.push_back(experience);
    }

    /// Drop all stored experiences.
    pub fn clear(&mut self) {
        self.experiences.clear();
    }

    /// Whether the buffer holds at least one full batch.
    #[inline]
    pub fn has_full_batch(&self) -> bool {
        self.experiences.len() >= self.batch_size
    }

    /// Re-learn one minibatch sampled uniformly with replacement.
    ///
    /// No-op while the buffer holds fewer than `batch_size` experiences.
    pub fn replay<R: Rng>(&self, table: &mut QTable, rng: &mut R) {
        if !self.has_full_batch() {
            return;
        }
        for _ in 0..self.batch_size {
            let index = rng.random_range(0..self.experiences.len());
            let experience = self.experiences[index];
            table.replay_update(&experience, rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::encoder::{Features, NUM_FEATURES};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn key(seed: f32) -> StateKey {
        let mut values = [0.0f32; NUM_FEATURES];
        values[0] = seed;
        StateKey::from_features(&Features(values))
    }

    fn experience(tag: f32) -> Experience {
        Experience {
            state: key(tag),
            action: Action::Straight,
            reward: tag,
            next_state: key(tag + 0.05),
            done: false,
        }
    }

    // ========== FIFO bound ==========

    #[test]
    fn test_push_below_capacity() {
        let mut buffer = ReplayBuffer::with_capacity(10, 4);
        for i in 0..5 {
            buffer.push(experience(i as f32 * 0.1));
        }
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_capacity_bound_and_oldest_eviction() {
        let mut buffer = ReplayBuffer::with_capacity(100, 32);

        // capacity + k inserts, distinguishable by reward.
        let k = 7;
        for i in 0..(100 + k) {
            let mut e = experience(0.0);
            e.reward = i as f32;
            buffer.push(e);
        }

        assert_eq!(buffer.len(), 100);

        // The k oldest entries must be gone; the rest survive in order.
        let rewards: Vec<f32> = buffer.experiences.iter().map(|e| e.reward).collect();
        assert_eq!(rewards[0], k as f32);
        assert_eq!(*rewards.last().unwrap(), (100 + k - 1) as f32);
        for old in 0..k {
            assert!(!rewards.contains(&(old as f32)));
        }
    }

    #[test]
    fn test_clear() {
        let mut buffer = ReplayBuffer::with_capacity(10, 4);
        buffer.push(experience(0.1));
        buffer.push(experience(0.2));
        buffer.clear();
        assert!(buffer.is_empty());
    }

    // ========== Replay trigger ==========

    #[test]
    fn test_replay_noop_below_batch_size() {
        let mut buffer = ReplayBuffer::with_capacity(100, 8);
        let mut table = QTable::new();
        let mut rng = StdRng::seed_from_u64(7);

        for i in 0..7 {
            buffer.push(experience(i as f32 * 0.1));
        }
        assert!(!buffer.has_full_batch());

        buffer.replay(&mut table, &mut rng);
        // Nothing sampled, nothing created.
        assert!(table.is_empty());
    }

    #[test]
    fn test_replay_updates_sampled_states() {
        let mut buffer = ReplayBuffer::with_capacity(100, 8);
        let mut table = QTable::new();
        let mut rng = StdRng::seed_from_u64(7);

        for i in 0..8 {
            let mut e = experience(i as f32 * 0.1);
            e.reward = 50.0;
            buffer.push(e);
        }
        assert!(buffer.has_full_batch());

        buffer.replay(&mut table, &mut rng);

        // Sampled states (and their next states) now exist in the table.
        assert!(!table.is_empty());
    }

    #[test]
    fn test_replay_moves_values_toward_target() {
        // A single experience sampled 32 times with replacement should pull
        // its Q-value well toward the reward.
        let mut buffer = ReplayBuffer::with_capacity(100, 32);
        let mut table = QTable::new();
        let mut rng = StdRng::seed_from_u64(11);

        let mut e = experience(0.2);
        e.reward = 100.0;
        e.done = true;
        for _ in 0..32 {
            buffer.push(e);
        }

        buffer.replay(&mut table, &mut rng);

        let value = table.values(e.state, &mut rng)[e.action.index()];
        assert!(value > 90.0, "value {} not pulled toward reward", value);
    }
}
