//! Gridmind - reinforcement-learning controller for a toroidal-grid agent
//!
//! A tabular Q-learning agent that learns to steer toward a target on a
//! wrap-around grid while avoiding self-collision. The crate is the learning
//! core only: feature encoding, a discretized Q-table, heuristic-guided
//! exploration, experience replay, a shaped reward model, and the
//! episode/training lifecycle. Rendering, input, and tick scheduling belong
//! to the host.
//!
//! # Example
//!
//! ```ignore
//! use gridmind::learning::Agent;
//!
//! let mut agent = Agent::new();
//! agent.configure(100, 0.9)?;
//! agent.start_training();
//! loop {
//!     agent.start_episode();
//!     // per tick: let action = agent.select_action(&state);
//!     //           agent.record_step(reward, terminal);
//!     if !agent.end_episode(score) {
//!         break;
//!     }
//! }
//! ```

pub mod grid;
pub mod learning;
