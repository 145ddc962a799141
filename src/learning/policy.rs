//! Epsilon-greedy action selection with decaying heuristic guidance.
//!
//! # Overview
//!
//! Each decision runs in one of two modes. While training, a uniform draw
//! against the current epsilon selects between them; outside training the
//! policy always exploits.
//!
//! - **Exploit**: maximize `q[a] + w * decay^episode * h[a]`, where the
//!   heuristic weight fades geometrically per episode so learned values take
//!   over. Exact ties are broken uniformly among the tied actions.
//! - **Explore**: still heuristic-biased rather than blind. For states with
//!   any learned signal, the single worst combined action is avoided 80 % of
//!   the time. For blank states, actions are drawn from a softmax over the
//!   heuristic scores, skipping collision-penalized actions; if everything
//!   is penalized the draw is uniform.

use rand::Rng;

use crate::grid::{Action, NUM_ACTIONS};
use crate::learning::heuristic::COLLISION_PENALTY;
use crate::learning::qtable::QEntry;

/// Base weight of the heuristic in the combined exploit score.
pub const HEURISTIC_WEIGHT: f32 = 0.3;

/// Per-episode geometric decay of the heuristic weight.
pub const HEURISTIC_DECAY: f32 = 0.99;

/// Absolute Q-value above which a state counts as having learned signal.
const LEARNED_SIGNAL_THRESHOLD: f32 = 0.1;

/// Probability of avoiding the worst combined action during exploration of
/// a learned state.
const AVOID_WORST_PROBABILITY: f32 = 0.8;

/// Softmax temperature for heuristic-guided exploration of blank states.
const SOFTMAX_TEMPERATURE: f32 = 100.0;

/// Heuristic-biased epsilon-greedy policy.
#[derive(Clone, Copy, Debug)]
pub struct PolicyEngine {
    heuristic_weight: f32,
    heuristic_decay: f32,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self {
            heuristic_weight: HEURISTIC_WEIGHT,
            heuristic_decay: HEURISTIC_DECAY,
        }
    }
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Heuristic weight in effect at `episode`.
    #[inline]
    pub fn effective_weight(&self, episode: u32) -> f32 {
        self.heuristic_weight * self.heuristic_decay.powi(episode as i32)
    }

    /// Choose an action for one decision.
    ///
    /// `epsilon` is consulted only while `training` is true.
    pub fn choose<R: Rng>(
        &self,
        q_values: &QEntry,
        heuristic: &[f32; NUM_ACTIONS],
        episode: u32,
        epsilon: f32,
        training: bool,
        rng: &mut R,
    ) -> Action {
        if training && rng.random::<f32>() < epsilon {
            self.explore(q_values, heuristic, rng)
        } else {
            self.exploit(q_values, heuristic, episode, rng)
        }
    }

    /// Greedy choice over the combined score, random among exact ties.
    fn exploit<R: Rng>(
        &self,
        q_values: &QEntry,
        heuristic: &[f32; NUM_ACTIONS],
        episode: u32,
        rng: &mut R,
    ) -> Action {
        let weight = self.effective_weight(episode);
        let mut combined = [0.0f32; NUM_ACTIONS];
        for (i, c) in combined.iter_mut().enumerate() {
            *c = q_values[i] + weight * heuristic[i];
        }

        let best = combined.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let tied: Vec<usize> = (0..NUM_ACTIONS).filter(|&i| combined[i] == best).collect();
        Action::ALL[tied[rng.random_range(0..tied.len())]]
    }

    /// Stochastic, heuristic-biased choice.
    fn explore<R: Rng>(
        &self,
        q_values: &QEntry,
        heuristic: &[f32; NUM_ACTIONS],
        rng: &mut R,
    ) -> Action {
        let has_signal = q_values.iter().any(|v| v.abs() > LEARNED_SIGNAL_THRESHOLD);

        if has_signal {
            // Blend at reduced (undecayed) heuristic weight and dodge the
            // single worst action most of the time.
            let weight = self.heuristic_weight * 0.5;
            let mut combined = [0.0f32; NUM_ACTIONS];
            for (i, c) in combined.iter_mut().enumerate() {
                *c = q_values[i] + weight * heuristic[i];
            }

            let mut worst = 0;
            for i in 1..NUM_ACTIONS {
                if combined[i] < combined[worst] {
                    worst = i;
                }
            }

            if rng.random::<f32>() < AVOID_WORST_PROBABILITY {
                let remaining: Vec<usize> = (0..NUM_ACTIONS).filter(|&i| i != worst).collect();
                return Action::ALL[remaining[rng.random_range(0..remaining.len())]];
            }
        } else {
            // Blank state: softmax over the heuristic, collision-penalized
            // actions excluded.
            let valid: Vec<usize> = (0..NUM_ACTIONS)
                .filter(|&i| heuristic[i] > COLLISION_PENALTY)
                .collect();

            if !valid.is_empty() {
                let probs: Vec<f32> = valid
                    .iter()
                    .map(|&i| (heuristic[i] / SOFTMAX_TEMPERATURE).exp())
                    .collect();
                let total: f32 = probs.iter().sum();

                let draw = rng.random::<f32>() * total;
                let mut cumulative = 0.0;
                for (slot, &action_index) in valid.iter().enumerate() {
                    cumulative += probs[slot];
                    if draw <= cumulative {
                        return Action::ALL[action_index];
                    }
                }
                // Float accumulation can leave the draw above the last bin.
                return Action::ALL[valid[valid.len() - 1]];
            }
        }

        Action::ALL[rng.random_range(0..NUM_ACTIONS)]
    }
}
