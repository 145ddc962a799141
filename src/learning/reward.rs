//! Shaped scalar reward for one state transition.
//!
//! # Overview
//!
//! The reward model reads the pre- and post-transition board states plus the
//! score change and terminal flag, and produces one scalar. Two outcomes
//! short-circuit everything else: reaching the target (+100) and dying by
//! self-collision (-200). Otherwise several shaping terms accumulate, all of
//! them wrap-aware where distance is involved.

use crate::grid::{BoardState, near_border, wrapped_manhattan};

/// Reward for reaching the target, overriding all shaping terms.
pub const TARGET_REWARD: f32 = 100.0;

/// Penalty for a terminal self-collision, overriding all shaping terms.
pub const DEATH_PENALTY: f32 = -200.0;

/// Shaping bonus for strictly decreasing the wrapped distance.
const CLOSER_BONUS: f32 = 15.0;

/// Shaping penalty for strictly increasing the wrapped distance.
const FARTHER_PENALTY: f32 = -8.0;

/// Extra bonus once the wrapped distance drops to 2 cells or fewer.
const PROXIMITY_BONUS: f32 = 10.0;

/// Bonus for moving onto the border while also closing the distance, which
/// rewards setting up a wrap-around shortcut.
const BORDER_APPROACH_BONUS: f32 = 5.0;

/// Flat per-tick survival bonus.
const SURVIVAL_BONUS: f32 = 1.0;

/// Penalty for the head sitting within 1 cell of any body segment.
const SELF_PROXIMITY_PENALTY: f32 = -15.0;

/// One tick's transition as seen by the reward model.
#[derive(Clone, Copy, Debug)]
pub struct TransitionView<'a> {
    /// Board state before the action was applied.
    pub prev: &'a BoardState,
    /// Board state after the action was applied.
    pub next: &'a BoardState,
    /// Score before the transition.
    pub prev_score: u32,
    /// Score after the transition.
    pub next_score: u32,
    /// Whether the transition ended the episode (self-collision).
    pub terminal: bool,
}

/// Score one transition.
pub fn evaluate(t: &TransitionView<'_>) -> f32 {
    if t.next_score > t.prev_score {
        return TARGET_REWARD;
    }

    if t.terminal {
        return DEATH_PENALTY;
    }

    let size = t.next.size;
    let head = t.next.head();
    let prev_head = t.prev.head();
    let target = t.next.target;

    let distance = wrapped_manhattan(head, target, size);
    let prev_distance = wrapped_manhattan(prev_head, target, size);

    let mut reward = 0.0;

    if distance < prev_distance {
        reward += CLOSER_BONUS;
    } else if distance > prev_distance {
        reward += FARTHER_PENALTY;
    }

    if distance <= 2 {
        reward += PROXIMITY_BONUS;
    }

    if near_border(head, size) && !near_border(prev_head, size) && distance < prev_distance {
        reward += BORDER_APPROACH_BONUS;
    }

    reward += SURVIVAL_BONUS;

    // Hugging the own body is how episodes end; discourage it before the
    // collision happens. First hit only.
    for segment in &t.next.body[1..] {
        let gap = (head.x - segment.x).abs() + (head.y - segment.y).abs();
        if gap <= 1 {
            reward += SELF_PROXIMITY_PENALTY;
            break;
        }
    }

    reward
}
