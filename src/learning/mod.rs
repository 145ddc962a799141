//! Tabular Q-learning system for the toroidal-grid pursuit agent.
//!
//! # Overview
//!
//! The learning system combines a discretized tabular Q-function with
//! heuristic-guided exploration and experience replay:
//!
//! - **Feature Encoding**: Raw board states become 14-element feature vectors,
//!   discretized into exact integer state keys (encoder)
//! - **Q-Table**: Lazily initialized state-action values with TD updates and a
//!   visit-magnitude-driven dynamic learning rate (qtable)
//! - **Heuristic Guidance**: Domain scores blended into both exploitation and
//!   exploration, with a per-episode decaying weight (heuristic, policy)
//! - **Experience Replay**: Bounded FIFO of past transitions, re-learned in
//!   random minibatches (replay)
//! - **Session Lifecycle**: Episode bookkeeping, the adaptive epsilon
//!   schedule, and early convergence detection (session, agent)
//!
//! # Architecture
//!
//! ```text
//! Agent
//!     |-- encoder (BoardState -> Features -> StateKey)
//!     |-- PolicyEngine
//!     |       |-- heuristic scores
//!     |       |-- QTable (read)
//!     |-- QTable (TD updates)
//!     |-- ReplayBuffer
//!     |-- TrainingSession + EpisodeTrace
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gridmind::learning::Agent;
//!
//! let mut agent = Agent::new();
//! agent.configure(100, 0.9)?;
//! agent.start_training();
//! ```

use thiserror::Error;

// Submodules
pub mod agent;
pub mod encoder;
pub mod heuristic;
pub mod policy;
pub mod qtable;
pub mod replay;
pub mod reward;
pub mod session;

// Re-export public types
pub use agent::Agent;
pub use encoder::{Features, NUM_FEATURES, StateKey, encode};
pub use error::LearningError;
pub use heuristic::COLLISION_PENALTY;
pub use policy::{HEURISTIC_DECAY, HEURISTIC_WEIGHT, PolicyEngine};
pub use qtable::{
    BASE_LEARNING_RATE, DISCOUNT_FACTOR, MIN_LEARNING_RATE, QEntry, QTable, REPLAY_LEARNING_RATE,
};
pub use replay::{DEFAULT_BATCH_SIZE, DEFAULT_CAPACITY, Experience, ReplayBuffer};
pub use reward::{DEATH_PENALTY, TARGET_REWARD, TransitionView};
pub use session::{
    CONVERGENCE_MIN_EPISODE, CONVERGENCE_SCORE, CONVERGENCE_WINDOW, DEFAULT_EPSILON,
    DEFAULT_MAX_EPISODES, EpisodeTrace, MIN_EPSILON, SessionStats, StepRecord, TrainingSession,
};

/// Error types for the learning module
mod error {
    use super::*;

    /// Learning system error type
    ///
    /// The learning core holds no file handles and performs no I/O, so the
    /// only failure surface is the configuration boundary. The enum stays
    /// open for host-side additions.
    #[derive(Error, Debug)]
    pub enum LearningError {
        /// Configuration error
        ///
        /// Occurs when configuration values are invalid:
        /// - Zero episode budget
        /// - Exploration rate outside `(0, 1]`
        #[error("Configuration error: {0}")]
        Config(String),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = LearningError::Config("exploration_rate 2 outside (0, 1]".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("exploration_rate"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LearningError>();
    }
}
