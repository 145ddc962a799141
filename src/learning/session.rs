//! Training-session bookkeeping: episode counters, the adaptive epsilon
//! schedule's state, the two-slot episode trace, and the read-only stats
//! snapshot.
//!
//! The session record is owned by the [`Agent`] and mutated only through its
//! lifecycle operations; nothing here is global.
//!
//! [`Agent`]: crate::learning::agent::Agent

use serde::Serialize;

use crate::grid::Action;
use crate::learning::encoder::StateKey;

/// Epsilon never decays below this floor.
pub const MIN_EPSILON: f32 = 0.01;

/// Default per-episode epsilon decay.
pub const EPSILON_DECAY: f32 = 0.995;

/// Faster decay applied while a good streak is running.
pub const FAST_EPSILON_DECAY: f32 = 0.98;

/// Growth factor used to re-inject exploration after stagnation.
pub const EPSILON_REINJECT_GROWTH: f32 = 1.05;

/// Good-streak length beyond which the fast decay kicks in.
pub const GOOD_STREAK_THRESHOLD: u32 = 3;

/// Good-streak length beyond which the effective draw epsilon is discounted.
pub const STREAK_DISCOUNT_THRESHOLD: u32 = 5;

/// Discount on the effective draw epsilon during a long good streak.
pub const STREAK_EPSILON_DISCOUNT: f32 = 0.9;

/// Stagnation count beyond which exploration is re-injected.
pub const STAGNATION_THRESHOLD: u32 = 10;

/// Number of trailing episode scores consulted by the convergence check.
pub const CONVERGENCE_WINDOW: usize = 15;

/// Earliest episode at which convergence may be declared.
pub const CONVERGENCE_MIN_EPISODE: u32 = 30;

/// Mean trailing score at or above which training converges.
pub const CONVERGENCE_SCORE: f32 = 30.0;

/// Number of trailing scores averaged in the stats snapshot.
pub const STATS_WINDOW: usize = 10;

/// Default episode budget.
pub const DEFAULT_MAX_EPISODES: u32 = 100;

/// Default initial exploration rate.
pub const DEFAULT_EPSILON: f32 = 0.9;

/// Mutable per-agent training state.
#[derive(Clone, Debug)]
pub struct TrainingSession {
    pub current_episode: u32,
    pub max_episodes: u32,
    pub epsilon: f32,
    pub initial_epsilon: f32,
    pub best_score: f32,
    pub consecutive_good_episodes: u32,
    pub stagnation_counter: u32,
    pub is_training: bool,
    /// Final score of every completed episode this session.
    pub episode_history: Vec<f32>,
}

impl Default for TrainingSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EPISODES, DEFAULT_EPSILON)
    }
}

impl TrainingSession {
    pub fn new(max_episodes: u32, epsilon: f32) -> Self {
        Self {
            current_episode: 0,
            max_episodes,
            epsilon,
            initial_epsilon: epsilon,
            best_score: 0.0,
            consecutive_good_episodes: 0,
            stagnation_counter: 0,
            is_training: false,
            episode_history: Vec::new(),
        }
    }

    /// Return to the initial configuration, keeping `max_episodes` and the
    /// initial epsilon.
    pub fn reset(&mut self) {
        self.current_episode = 0;
        self.epsilon = self.initial_epsilon;
        self.best_score = 0.0;
        self.consecutive_good_episodes = 0;
        self.stagnation_counter = 0;
        self.is_training = false;
        self.episode_history.clear();
    }

    /// Epsilon actually compared against the exploration draw.
    ///
    /// During a long good streak the draw threshold is discounted without
    /// mutating the stored epsilon, so a later bad episode restores the full
    /// rate automatically.
    pub fn effective_epsilon(&self) -> f32 {
        if self.consecutive_good_episodes > STREAK_DISCOUNT_THRESHOLD {
            (self.epsilon * STREAK_EPSILON_DISCOUNT).max(MIN_EPSILON)
        } else {
            self.epsilon
        }
    }

    /// Mean of the last `window` episode scores, 0 when the history is empty.
    pub fn trailing_mean(&self, window: usize) -> f32 {
        if self.episode_history.is_empty() {
            return 0.0;
        }
        let start = self.episode_history.len().saturating_sub(window);
        let tail = &self.episode_history[start..];
        tail.iter().sum::<f32>() / tail.len() as f32
    }
}

/// One decision awaiting (or holding) its reward.
#[derive(Clone, Copy, Debug)]
pub struct StepRecord {
    pub key: StateKey,
    pub action: Action,
    pub reward: Option<f32>,
}

/// Two-slot ring over the most recent decisions.
///
/// The online TD update only ever needs the second-to-last transition and
/// the latest state, so the per-episode trace is a ring of exactly two step
/// records rather than an unbounded array.
#[derive(Clone, Copy, Debug, Default)]
pub struct EpisodeTrace {
    prev: Option<StepRecord>,
    last: Option<StepRecord>,
}

impl EpisodeTrace {
    /// Forget both slots (episode start).
    pub fn clear(&mut self) {
        self.prev = None;
        self.last = None;
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    /// Shift the ring and store a fresh decision.
    pub fn record_decision(&mut self, key: StateKey, action: Action) {
        self.prev = self.last.take();
        self.last = Some(StepRecord {
            key,
            action,
            reward: None,
        });
    }

    /// Attach a reward to the newest decision.
    pub fn record_reward(&mut self, reward: f32) {
        if let Some(last) = self.last.as_mut() {
            last.reward = Some(reward);
        }
    }

    /// The completed second-to-last transition paired with the latest state,
    /// once both exist.
    pub fn completed_pair(&self) -> Option<(StepRecord, StepRecord)> {
        match (self.prev, self.last) {
            (Some(prev), Some(last)) if prev.reward.is_some() => Some((prev, last)),
            _ => None,
        }
    }

    /// The newest step, if its reward has arrived (episode-close update).
    pub fn last_completed(&self) -> Option<StepRecord> {
        self.last.filter(|step| step.reward.is_some())
    }
}

/// Read-only snapshot of the session, safe to poll from a host UI.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionStats {
    pub current_episode: u32,
    pub max_episodes: u32,
    pub epsilon: f32,
    pub is_training: bool,
    /// Mean of the last (at most) 10 episode scores.
    pub avg_score: f32,
    /// Distinct states in the Q-table.
    pub total_states: usize,
    pub best_score: f32,
    /// Experiences currently held by the replay buffer.
    pub buffer_size: usize,
    pub consecutive_good_episodes: u32,
    /// Heuristic weight in effect at the current episode.
    pub heuristic_weight: f32,
}
