//! Hand-crafted per-action guidance scores.
//!
//! # Overview
//!
//! Early in training the Q-table is noise, so action selection leans on a
//! hand-crafted estimate of action quality derived from the feature vector.
//! The policy blends these scores into both exploitation and exploration
//! with an influence that decays geometrically per episode, so the learned
//! values take over as they become trustworthy.
//!
//! # Scoring
//!
//! Per action, starting from 0:
//! - collision override: -1000 when the action's danger flag is set, which
//!   dominates every bonus below;
//! - +30 per axis for continuing straight while the wrapped delta points
//!   away from the head's current half of the grid;
//! - +40 for turning toward the dominant-delta axis in the correct sign;
//! - +25 for the border/wrap cases where crossing the edge shortens the
//!   path (near min-x favors a left turn, near max-x a right turn, near
//!   min-y/max-y favor continuing straight);
//! - +20 flat when the summed absolute wrapped delta is below 0.3.
//!
//! Scores are never clamped.

use crate::grid::{Action, NUM_ACTIONS};
use crate::learning::encoder::Features;

/// Overriding score for an action whose danger flag is set.
pub const COLLISION_PENALTY: f32 = -1000.0;

/// Bonus per axis for continuing straight toward the target.
const STRAIGHT_BONUS: f32 = 30.0;

/// Bonus for turning toward the dominant-delta axis.
const TURN_BONUS: f32 = 40.0;

/// Bonus for exploiting the wrap near a border.
const WRAP_BONUS: f32 = 25.0;

/// Flat bonus when the target is very close.
const CLOSE_BONUS: f32 = 20.0;

/// Normalized delta magnitude beyond which wrapping across a nearby border
/// is worth encouraging.
const WRAP_DELTA_THRESHOLD: f32 = 0.3;

/// Summed normalized delta below which the target counts as very close.
const CLOSE_DELTA_THRESHOLD: f32 = 0.3;

/// Compute the three per-action guidance scores for a feature vector.
pub fn score(features: &Features) -> [f32; NUM_ACTIONS] {
    let dx = features.target_dx();
    let dy = features.target_dy();
    let head_x = features.head_x();
    let head_y = features.head_y();

    let mut scores = [0.0f32; NUM_ACTIONS];

    for action in Action::ALL {
        let idx = action.index();

        if features.danger(action) {
            scores[idx] = COLLISION_PENALTY;
            continue;
        }

        let mut s = 0.0;

        match action {
            Action::Straight => {
                // Reward holding course while the delta points out of the
                // head's current half, checked per axis.
                if (dx > 0.0 && head_x < 0.5) || (dx < 0.0 && head_x >= 0.5) {
                    s += STRAIGHT_BONUS;
                }
                if (dy > 0.0 && head_y < 0.5) || (dy < 0.0 && head_y >= 0.5) {
                    s += STRAIGHT_BONUS;
                }
            }
            Action::Left => {
                if dx.abs() > dy.abs() {
                    if dx < 0.0 {
                        s += TURN_BONUS;
                    }
                } else if dy < 0.0 {
                    s += TURN_BONUS;
                }
            }
            Action::Right => {
                if dx.abs() > dy.abs() {
                    if dx > 0.0 {
                        s += TURN_BONUS;
                    }
                } else if dy > 0.0 {
                    s += TURN_BONUS;
                }
            }
        }

        // Crossing a nearby border is a shortcut when the wrapped delta
        // already points through it.
        if features.near_min_x() && dx < -WRAP_DELTA_THRESHOLD && action == Action::Left {
            s += WRAP_BONUS;
        }
        if features.near_max_x() && dx > WRAP_DELTA_THRESHOLD && action == Action::Right {
            s += WRAP_BONUS;
        }
        if features.near_min_y() && dy < -WRAP_DELTA_THRESHOLD && action == Action::Straight {
            s += WRAP_BONUS;
        }
        if features.near_max_y() && dy > WRAP_DELTA_THRESHOLD && action == Action::Straight {
            s += WRAP_BONUS;
        }

        if dx.abs() + dy.abs() < CLOSE_DELTA_THRESHOLD {
            s += CLOSE_BONUS;
        }

        scores[idx] = s;
    }

    scores
}
