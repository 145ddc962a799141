//! State encoding: raw board state to feature vector to discretized key.
//!
//! # Overview
//!
//! The encoder is the semantic foundation of the whole learner. It maps the
//! raw board state to a fixed 14-element feature vector, and the vector to a
//! bucketed [`StateKey`] used to address the Q-table. Two nearby states that
//! round to the same buckets intentionally share one Q-entry; that aliasing
//! is the only form of generalization in this system.
//!
//! # Feature layout
//!
//! | index | feature | range |
//! |-------|---------|-------|
//! | 0-1 | normalized head x, y | [0, 1] |
//! | 2-3 | normalized target x, y | [0, 1] |
//! | 4-5 | wrapped signed delta to target x, y | [-0.5, 0.5] |
//! | 6 | wrapped Euclidean distance to target | [0, 1] |
//! | 7-9 | self-collision danger: straight, left, right | {0, 1} |
//! | 10-13 | border proximity: min-x, max-x, min-y, max-y | {0, 1} |
//!
//! Encoding is a pure function of its input: no randomness, no mutation.

use crate::grid::{Action, BoardState, Pos, wrapped_delta, wrapped_euclidean};

/// Number of features in the encoded state vector.
pub const NUM_FEATURES: usize = 14;

/// Bucket resolution for features inside `[0, 1]` (nearest 1/20).
const UNIT_BUCKETS: f32 = 20.0;

/// Bucket resolution for all other features (nearest 1/10).
const SIGNED_BUCKETS: f32 = 10.0;

// Feature indices.
pub const F_HEAD_X: usize = 0;
pub const F_HEAD_Y: usize = 1;
pub const F_TARGET_X: usize = 2;
pub const F_TARGET_Y: usize = 3;
pub const F_DELTA_X: usize = 4;
pub const F_DELTA_Y: usize = 5;
pub const F_DISTANCE: usize = 6;
pub const F_DANGER_STRAIGHT: usize = 7;
pub const F_DANGER_LEFT: usize = 8;
pub const F_DANGER_RIGHT: usize = 9;
pub const F_NEAR_MIN_X: usize = 10;
pub const F_NEAR_MAX_X: usize = 11;
pub const F_NEAR_MIN_Y: usize = 12;
pub const F_NEAR_MAX_Y: usize = 13;

/// Encoded state vector.
///
/// Produced fresh every tick by [`encode`]; never mutated in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Features(pub [f32; NUM_FEATURES]);

impl Features {
    #[inline]
    pub fn head_x(&self) -> f32 {
        self.0[F_HEAD_X]
    }

    #[inline]
    pub fn head_y(&self) -> f32 {
        self.0[F_HEAD_Y]
    }

    /// Wrapped signed delta to the target along x, normalized.
    #[inline]
    pub fn target_dx(&self) -> f32 {
        self.0[F_DELTA_X]
    }

    /// Wrapped signed delta to the target along y, normalized.
    #[inline]
    pub fn target_dy(&self) -> f32 {
        self.0[F_DELTA_Y]
    }

    /// Normalized wrapped Euclidean distance to the target.
    #[inline]
    pub fn distance(&self) -> f32 {
        self.0[F_DISTANCE]
    }

    /// Whether taking `action` from here runs into the agent's own body.
    #[inline]
    pub fn danger(&self, action: Action) -> bool {
        let idx = match action {
            Action::Straight => F_DANGER_STRAIGHT,
            Action::Left => F_DANGER_LEFT,
            Action::Right => F_DANGER_RIGHT,
        };
        self.0[idx] > 0.0
    }

    #[inline]
    pub fn near_min_x(&self) -> bool {
        self.0[F_NEAR_MIN_X] > 0.0
    }

    #[inline]
    pub fn near_max_x(&self) -> bool {
        self.0[F_NEAR_MAX_X] > 0.0
    }

    #[inline]
    pub fn near_min_y(&self) -> bool {
        self.0[F_NEAR_MIN_Y] > 0.0
    }

    #[inline]
    pub fn near_max_y(&self) -> bool {
        self.0[F_NEAR_MAX_Y] > 0.0
    }
}

/// Discretized Q-table key derived from a [`Features`] vector.
///
/// Each component is stored as an integer bucket so equality and hashing are
/// exact: values inside `[0, 1]` round to the nearest 1/20, everything else
/// to the nearest 1/10. Vectors closer than the bucket resolution collapse
/// to the same key and therefore the same Q-entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateKey([i16; NUM_FEATURES]);

impl StateKey {
    /// Discretize a feature vector.
    pub fn from_features(features: &Features) -> Self {
        let mut buckets = [0i16; NUM_FEATURES];
        for (bucket, &value) in buckets.iter_mut().zip(features.0.iter()) {
            let scale = if (0.0..=1.0).contains(&value) {
                UNIT_BUCKETS
            } else {
                SIGNED_BUCKETS
            };
            *bucket = (value * scale).round() as i16;
        }
        Self(buckets)
    }
}

/// Encode the raw board state into the 14-element feature vector.
///
/// Deltas and the distance use the shorter of the direct and wrap-around
/// paths along each axis. Danger flags check self-collision only; the grid
/// has no walls.
pub fn encode(state: &BoardState) -> Features {
    let size = state.size;
    let head = state.head();
    let target = state.target;
    let scale = size as f32;

    let dx = wrapped_delta(head.x, target.x, size);
    let dy = wrapped_delta(head.y, target.y, size);

    // Normalize by the grid diagonal so the distance lands in [0, 1].
    let distance = wrapped_euclidean(head, target, size) / (scale * std::f32::consts::SQRT_2);

    let straight = state.heading;
    let left = state.heading.turned_left();
    let right = state.heading.turned_right();

    let mut values = [0.0f32; NUM_FEATURES];
    values[F_HEAD_X] = head.x as f32 / scale;
    values[F_HEAD_Y] = head.y as f32 / scale;
    values[F_TARGET_X] = target.x as f32 / scale;
    values[F_TARGET_Y] = target.y as f32 / scale;
    values[F_DELTA_X] = dx;
    values[F_DELTA_Y] = dy;
    values[F_DISTANCE] = distance;
    values[F_DANGER_STRAIGHT] = danger_flag(state, straight.delta());
    values[F_DANGER_LEFT] = danger_flag(state, left.delta());
    values[F_DANGER_RIGHT] = danger_flag(state, right.delta());
    values[F_NEAR_MIN_X] = flag(head.x <= 1);
    values[F_NEAR_MAX_X] = flag(head.x >= size - 2);
    values[F_NEAR_MIN_Y] = flag(head.y <= 1);
    values[F_NEAR_MAX_Y] = flag(head.y >= size - 2);

    Features(values)
}

/// 1.0 when stepping `(dx, dy)` from the head lands on a body segment.
fn danger_flag(state: &BoardState, (dx, dy): (i32, i32)) -> f32 {
    let head = state.head();
    let next = Pos::new(head.x + dx, head.y + dy).wrapped(state.size);
    let hits = state.body[1..].iter().any(|&segment| segment == next);
    flag(hits)
}

#[inline]
fn flag(condition: bool) -> f32 {
    if condition { 1.0 } else { 0.0 }
}
