//! The learning agent: lifecycle state machine over all learning components.
//!
//! # Overview
//!
//! [`Agent`] owns the Q-table, replay buffer, policy, session record, the
//! per-episode trace, and a private RNG. It is an explicitly constructed
//! instance with no global state; the host drives it through a fixed
//! per-tick ordering:
//!
//! ```text
//! select_action(state)      encode -> policy -> action
//! (host applies the action)
//! record_step(reward, terminal)
//!     |-- store Experience
//!     |-- online TD update on the second-to-last transition
//!     |-- replay minibatch once the buffer holds a full batch
//! ```
//!
//! Episodes open with [`Agent::start_episode`] and close with
//! [`Agent::end_episode`], which applies the final reward-only correction,
//! runs the adaptive epsilon schedule, and checks for early convergence.
//!
//! # Lifecycle states
//!
//! ```text
//! idle --configure/start_training--> training --start_episode--> episode
//!   episode --end_episode--> training (continue) | idle (budget/converged)
//! ```
//!
//! Reward and update calls while idle, or before any decision, are no-ops
//! rather than errors: the external loop does not always know the session
//! state, and nothing here may take the host down.

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::grid::{Action, BoardState};
use crate::learning::encoder::{self, StateKey};
use crate::learning::heuristic;
use crate::learning::policy::PolicyEngine;
use crate::learning::qtable::QTable;
use crate::learning::replay::{Experience, ReplayBuffer};
use crate::learning::session::{
    CONVERGENCE_MIN_EPISODE, CONVERGENCE_SCORE, CONVERGENCE_WINDOW, EPSILON_DECAY,
    EPSILON_REINJECT_GROWTH, EpisodeTrace, FAST_EPSILON_DECAY, GOOD_STREAK_THRESHOLD,
    MIN_EPSILON, STAGNATION_THRESHOLD, STATS_WINDOW, SessionStats, TrainingSession,
};
use crate::learning::LearningError;

/// Tabular Q-learning agent for the toroidal-grid pursuit task.
///
/// # Example
///
/// ```ignore
/// use gridmind::learning::Agent;
///
/// let mut agent = Agent::new();
/// agent.configure(100, 0.9)?;
/// agent.start_training();
/// agent.start_episode();
///
/// // per tick, driven by the host scheduler:
/// let action = agent.select_action(&board_state);
/// // host applies the action, computes the reward...
/// agent.record_step(reward, terminal);
///
/// let keep_going = agent.end_episode(final_score);
/// ```
pub struct Agent {
    qtable: QTable,
    replay: ReplayBuffer,
    policy: PolicyEngine,
    session: TrainingSession,
    trace: EpisodeTrace,
    rng: SmallRng,
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent {
    /// Create an agent with OS-seeded randomness.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    /// Create an agent with deterministic randomness (tests, reproduction).
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            qtable: QTable::new(),
            replay: ReplayBuffer::new(),
            policy: PolicyEngine::new(),
            session: TrainingSession::default(),
            trace: EpisodeTrace::default(),
            rng,
        }
    }

    /// Configure a fresh training session.
    ///
    /// Resets the episode counter, epsilon, history, replay buffer, and
    /// streak counters; training stays off until [`Agent::start_training`].
    ///
    /// # Errors
    ///
    /// `LearningError::Config` when `max_episodes` is zero or
    /// `exploration_rate` is outside `(0, 1]`.
    pub fn configure(&mut self, max_episodes: u32, exploration_rate: f32) -> Result<(), LearningError> {
        if max_episodes == 0 {
            return Err(LearningError::Config(
                "max_episodes must be positive".to_string(),
            ));
        }
        if !exploration_rate.is_finite() || exploration_rate <= 0.0 || exploration_rate > 1.0 {
            return Err(LearningError::Config(format!(
                "exploration_rate {} outside (0, 1]",
                exploration_rate
            )));
        }

        self.session = TrainingSession::new(max_episodes, exploration_rate);
        self.replay.clear();
        self.trace.clear();

        info!(
            "training configured: {} episodes, epsilon={}",
            max_episodes, exploration_rate
        );
        Ok(())
    }

    /// Begin training: reset counters, epsilon, and the replay buffer.
    pub fn start_training(&mut self) {
        self.session.reset();
        self.session.is_training = true;
        self.replay.clear();
        self.trace.clear();

        info!(
            "training started: {} episodes, epsilon={}",
            self.session.max_episodes, self.session.epsilon
        );
    }

    /// Open the next episode and clear the trace.
    pub fn start_episode(&mut self) {
        self.session.current_episode += 1;
        self.trace.clear();

        debug!(
            "episode {}/{} started",
            self.session.current_episode, self.session.max_episodes
        );
    }

    /// Choose an action for the supplied raw state.
    ///
    /// Synchronous by design; a host that needs a non-blocking boundary
    /// wraps this call at its own scheduling layer. While training, the
    /// decision is recorded in the episode trace so the next
    /// [`Agent::record_step`] can complete the transition.
    pub fn select_action(&mut self, state: &BoardState) -> Action {
        let features = encoder::encode(state);
        let key = StateKey::from_features(&features);
        let q_values = self.qtable.values(key, &mut self.rng);
        let heuristic = heuristic::score(&features);
        let epsilon = self.session.effective_epsilon();

        let action = self.policy.choose(
            &q_values,
            &heuristic,
            self.session.current_episode,
            epsilon,
            self.session.is_training,
            &mut self.rng,
        );

        if self.session.is_training {
            self.trace.record_decision(key, action);
        }

        action
    }

    /// Report the reward for the most recent action, with the transition's
    /// actual terminal flag.
    ///
    /// No-op while idle or before the first decision of an episode. Once the
    /// trace holds two decisions, the second-to-last transition is stored in
    /// the replay buffer, updated online, and a replay minibatch runs if the
    /// buffer holds a full batch.
    pub fn record_step(&mut self, reward: f32, terminal: bool) {
        if !self.session.is_training || self.trace.is_empty() {
            return;
        }

        self.trace.record_reward(reward);

        let Some((prev, last)) = self.trace.completed_pair() else {
            return;
        };
        let Some(prev_reward) = prev.reward else {
            return;
        };

        self.replay.push(Experience {
            state: prev.key,
            action: prev.action,
            reward: prev_reward,
            next_state: last.key,
            done: terminal,
        });

        self.qtable
            .update(prev.key, prev.action, prev_reward, last.key, &mut self.rng);

        self.replay.replay(&mut self.qtable, &mut self.rng);
    }

    /// Close the current episode.
    ///
    /// Applies the final reward-only correction, records the score, runs the
    /// adaptive epsilon schedule, and checks for convergence. Returns whether
    /// another episode should be started; `false` also means training has
    /// been switched off.
    pub fn end_episode(&mut self, final_score: f32) -> bool {
        if !self.session.is_training {
            return false;
        }

        // Reward-only correction for the last transition of the episode:
        // there is no successor state to bootstrap from.
        if let Some(last) = self.trace.last_completed()
            && let Some(reward) = last.reward
        {
            self.qtable
                .final_update(last.key, last.action, reward, &mut self.rng);
        }

        self.session.episode_history.push(final_score);
        self.adapt_epsilon(final_score);

        info!(
            "episode {} ended: score={}, epsilon={:.3}, best={}",
            self.session.current_episode, final_score, self.session.epsilon, self.session.best_score
        );

        if self.converged() {
            info!("early convergence: trailing mean over the last {CONVERGENCE_WINDOW} episodes reached the target");
            self.session.is_training = false;
            return false;
        }

        let should_continue = self.session.current_episode < self.session.max_episodes;
        if !should_continue {
            self.session.is_training = false;
            info!(
                "training complete: avg(last {})={:.1}, {} states, buffer {}",
                STATS_WINDOW,
                self.session.trailing_mean(STATS_WINDOW),
                self.qtable.len(),
                self.replay.len()
            );
        }
        should_continue
    }

    /// Adaptive epsilon schedule, driven by score improvement.
    fn adapt_epsilon(&mut self, final_score: f32) {
        let session = &mut self.session;

        if final_score > session.best_score {
            session.best_score = final_score;
            session.consecutive_good_episodes += 1;
            session.stagnation_counter = 0;
        } else {
            session.consecutive_good_episodes = session.consecutive_good_episodes.saturating_sub(1);
            session.stagnation_counter += 1;
        }

        if session.consecutive_good_episodes > GOOD_STREAK_THRESHOLD {
            // Succeeding: decay exploration faster.
            session.epsilon *= FAST_EPSILON_DECAY;
        } else if session.stagnation_counter > STAGNATION_THRESHOLD {
            // Stuck: re-inject exploration, capped at half the initial rate.
            session.epsilon =
                (session.epsilon * EPSILON_REINJECT_GROWTH).min(session.initial_epsilon * 0.5);
            session.stagnation_counter = 0;
        } else {
            session.epsilon *= EPSILON_DECAY;
        }

        session.epsilon = session.epsilon.max(MIN_EPSILON);
    }

    /// Whether the trailing-score convergence criterion is met.
    fn converged(&self) -> bool {
        self.session.episode_history.len() >= CONVERGENCE_WINDOW
            && self.session.current_episode >= CONVERGENCE_MIN_EPISODE
            && self.session.trailing_mean(CONVERGENCE_WINDOW) >= CONVERGENCE_SCORE
    }

    /// Read-only snapshot of the session. Never mutates state.
    pub fn get_stats(&self) -> SessionStats {
        SessionStats {
            current_episode: self.session.current_episode,
            max_episodes: self.session.max_episodes,
            epsilon: self.session.epsilon,
            is_training: self.session.is_training,
            avg_score: self.session.trailing_mean(STATS_WINDOW),
            total_states: self.qtable.len(),
            best_score: self.session.best_score,
            buffer_size: self.replay.len(),
            consecutive_good_episodes: self.session.consecutive_good_episodes,
            heuristic_weight: self.policy.effective_weight(self.session.current_episode),
        }
    }

    /// Return the session to its initial configuration without touching the
    /// learned Q-values.
    pub fn reset(&mut self) {
        self.session.reset();
        self.replay.clear();
        self.trace.clear();
        info!("training session reset");
    }

    /// Final scores of all episodes completed this session.
    pub fn episode_history(&self) -> &[f32] {
        &self.session.episode_history
    }

    /// Number of distinct states in the Q-table.
    pub fn qtable_len(&self) -> usize {
        self.qtable.len()
    }

    /// Whether a training session is currently active.
    pub fn is_training(&self) -> bool {
        self.session.is_training
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Heading, Pos};

    fn board() -> BoardState {
        BoardState {
            body: vec![Pos::new(5, 5), Pos::new(4, 5), Pos::new(3, 5)],
            target: Pos::new(7, 7),
            heading: Heading::Right,
            size: 10,
        }
    }

    fn trained_agent() -> Agent {
        let mut agent = Agent::with_seed(42);
        agent.configure(100, 0.9).unwrap();
        agent.start_training();
        agent.start_episode();
        agent
    }

    // ========== Configuration boundary ==========

    #[test]
    fn test_configure_rejects_zero_episodes() {
        let mut agent = Agent::with_seed(1);
        assert!(matches!(
            agent.configure(0, 0.5),
            Err(LearningError::Config(_))
        ));
    }

    #[test]
    fn test_configure_rejects_bad_exploration_rate() {
        let mut agent = Agent::with_seed(1);
        for rate in [0.0, -0.2, 1.5, f32::NAN, f32::INFINITY] {
            assert!(
                matches!(agent.configure(10, rate), Err(LearningError::Config(_))),
                "rate {} accepted",
                rate
            );
        }
        // Boundary value 1.0 is allowed.
        assert!(agent.configure(10, 1.0).is_ok());
    }

    #[test]
    fn test_configure_resets_session_and_buffer() {
        let mut agent = trained_agent();

        // Build up some state.
        for _ in 0..5 {
            agent.select_action(&board());
            agent.record_step(1.0, false);
        }
        agent.end_episode(10.0);

        agent.configure(7, 0.4).unwrap();
        let stats = agent.get_stats();
        assert_eq!(stats.current_episode, 0);
        assert_eq!(stats.max_episodes, 7);
        assert_eq!(stats.epsilon, 0.4);
        assert!(!stats.is_training);
        assert_eq!(stats.buffer_size, 0);
        assert_eq!(stats.avg_score, 0.0);
    }

    // ========== Tick cycle ==========

    #[test]
    fn test_select_action_returns_valid_action() {
        let mut agent = trained_agent();
        for _ in 0..50 {
            let action = agent.select_action(&board());
            assert!(action.index() < 3);
        }
    }

    #[test]
    fn test_record_step_noop_when_idle() {
        let mut agent = Agent::with_seed(3);
        agent.configure(10, 0.5).unwrap();

        // Not training: nothing may change.
        agent.record_step(100.0, false);
        assert_eq!(agent.qtable_len(), 0);
        assert_eq!(agent.get_stats().buffer_size, 0);
    }

    #[test]
    fn test_record_step_noop_before_first_decision() {
        let mut agent = trained_agent();
        agent.record_step(100.0, false);
        assert_eq!(agent.get_stats().buffer_size, 0);
    }

    #[test]
    fn test_second_step_stores_experience_and_updates() {
        let mut agent = trained_agent();

        agent.select_action(&board());
        agent.record_step(1.0, false);
        assert_eq!(agent.get_stats().buffer_size, 0);

        let mut moved = board();
        moved.body[0] = Pos::new(6, 5);
        agent.select_action(&moved);
        agent.record_step(16.0, false);

        assert_eq!(agent.get_stats().buffer_size, 1);
        assert!(agent.qtable_len() >= 2);
    }

    // ========== Episode lifecycle ==========

    #[test]
    fn test_end_episode_when_idle_returns_false() {
        let mut agent = Agent::with_seed(4);
        agent.configure(10, 0.5).unwrap();
        assert!(!agent.end_episode(50.0));
    }

    #[test]
    fn test_budget_exhaustion_stops_training() {
        let mut agent = Agent::with_seed(5);
        agent.configure(5, 0.9).unwrap();
        agent.start_training();

        for episode in 1..=5 {
            agent.start_episode();
            let cont = agent.end_episode(episode as f32);
            if episode < 5 {
                assert!(cont, "episode {} should continue", episode);
            } else {
                assert!(!cont, "episode 5 must be the last");
            }
        }
        assert!(!agent.is_training());
    }

    #[test]
    fn test_early_convergence() {
        let mut agent = Agent::with_seed(6);
        agent.configure(200, 0.9).unwrap();
        agent.start_training();

        // 30 mediocre episodes, then consistently good scores.
        let mut stopped_at = None;
        for episode in 1..=100 {
            agent.start_episode();
            let score = if episode <= 30 { 0.0 } else { 50.0 };
            if !agent.end_episode(score) {
                stopped_at = Some(episode);
                break;
            }
        }

        let stopped_at = stopped_at.expect("convergence should stop training early");
        assert!(stopped_at < 100);
        // 15-episode trailing mean crosses 30 well before episode 60.
        assert!(stopped_at <= 60, "stopped at {}", stopped_at);
        assert!(!agent.is_training());
    }

    // ========== Epsilon schedule ==========

    #[test]
    fn test_epsilon_default_decay() {
        let mut agent = Agent::with_seed(7);
        agent.configure(100, 0.9).unwrap();
        agent.start_training();

        agent.start_episode();
        agent.end_episode(10.0); // new best: streak 1, default decay path
        let eps = agent.get_stats().epsilon;
        assert!((eps - 0.9 * EPSILON_DECAY).abs() < 1e-6);
    }

    #[test]
    fn test_epsilon_fast_decay_on_streak() {
        let mut agent = Agent::with_seed(8);
        agent.configure(100, 0.9).unwrap();
        agent.start_training();

        // Strictly improving scores: streak exceeds the threshold on the
        // 4th episode, switching to the fast decay.
        let mut prev = agent.get_stats().epsilon;
        for episode in 1..=6 {
            agent.start_episode();
            agent.end_episode(10.0 * episode as f32);
            let eps = agent.get_stats().epsilon;
            if episode >= 4 {
                assert!((eps - prev * FAST_EPSILON_DECAY).abs() < 1e-5);
            }
            prev = eps;
        }
    }

    #[test]
    fn test_epsilon_reinjection_clamps_to_half_initial() {
        let mut agent = Agent::with_seed(9);
        agent.configure(200, 0.9).unwrap();
        agent.start_training();

        // One good episode, then a long plateau at a non-improving score:
        // the 11th stagnant episode snaps epsilon to half the initial rate.
        agent.start_episode();
        agent.end_episode(100.0);

        let mut epsilons = Vec::new();
        for _ in 0..11 {
            agent.start_episode();
            agent.end_episode(1.0);
            epsilons.push(agent.get_stats().epsilon);
        }

        assert!(epsilons[9] > 0.45);
        assert!((epsilons[10] - 0.45).abs() < 1e-6, "got {}", epsilons[10]);
    }

    #[test]
    fn test_epsilon_reinjection_grows_from_below_cap() {
        let mut agent = Agent::with_seed(9);
        agent.configure(500, 0.2).unwrap();
        agent.start_training();

        // Once epsilon sits at or under the cap (half of 0.2), each burst of
        // 11 stagnant episodes decays it and then re-injects it upward.
        agent.start_episode();
        agent.end_episode(5.0);

        let mut epsilons = Vec::new();
        for _ in 0..25 {
            agent.start_episode();
            agent.end_episode(1.0);
            epsilons.push(agent.get_stats().epsilon);
        }

        let grew = epsilons.windows(2).any(|w| w[1] > w[0]);
        assert!(grew, "re-injection never grew epsilon: {:?}", epsilons);
        for eps in epsilons {
            assert!(eps <= 0.2, "epsilon exceeded initial rate");
            assert!(eps >= MIN_EPSILON);
        }
    }

    #[test]
    fn test_epsilon_never_below_floor() {
        let mut agent = Agent::with_seed(10);
        agent.configure(10_000, 0.05).unwrap();
        agent.start_training();

        for episode in 1..=500 {
            agent.start_episode();
            // Alternate best-updates to keep training alive without
            // convergence-level scores.
            let score = if episode % 2 == 0 { 0.0 } else { episode as f32 * 0.01 };
            agent.end_episode(score);
            let eps = agent.get_stats().epsilon;
            assert!(eps >= MIN_EPSILON, "epsilon {} below floor", eps);
        }
    }

    // ========== Stats and reset ==========

    #[test]
    fn test_stats_pure() {
        let mut agent = trained_agent();
        for _ in 0..3 {
            agent.select_action(&board());
            agent.record_step(1.0, false);
        }

        let a = agent.get_stats();
        let b = agent.get_stats();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stats_fields_track_session() {
        let mut agent = Agent::with_seed(11);
        agent.configure(20, 0.7).unwrap();
        agent.start_training();
        agent.start_episode();
        agent.end_episode(40.0);

        let stats = agent.get_stats();
        assert_eq!(stats.current_episode, 1);
        assert_eq!(stats.max_episodes, 20);
        assert_eq!(stats.best_score, 40.0);
        assert_eq!(stats.consecutive_good_episodes, 1);
        assert!((stats.avg_score - 40.0).abs() < 1e-6);
        assert!(stats.heuristic_weight < 0.3);
    }

    #[test]
    fn test_reset_preserves_qtable() {
        let mut agent = trained_agent();
        for _ in 0..5 {
            agent.select_action(&board());
            agent.record_step(1.0, false);
        }
        let states_before = agent.qtable_len();
        assert!(states_before > 0);

        agent.reset();

        assert_eq!(agent.qtable_len(), states_before);
        let stats = agent.get_stats();
        assert_eq!(stats.current_episode, 0);
        assert!(!stats.is_training);
        assert_eq!(stats.buffer_size, 0);
        assert!(agent.episode_history().is_empty());
    }

    #[test]
    fn test_episode_history_accumulates() {
        let mut agent = Agent::with_seed(12);
        agent.configure(10, 0.9).unwrap();
        agent.start_training();

        for score in [5.0, 15.0, 25.0] {
            agent.start_episode();
            agent.end_episode(score);
        }
        assert_eq!(agent.episode_history(), &[5.0, 15.0, 25.0]);
    }
}
