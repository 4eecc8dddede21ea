// src/agents/mod.rs

//! Concrete agents and the registry that builds them by name.
//!
//! Every agent module exposes a `register` function;
//! [`AgentRegistry::with_builtin_agents`] calls all of them.

pub mod analyze;
pub mod final_decision;
pub mod final_refer;
pub mod majority_vote;
pub mod malicious;
pub mod math_solver;
pub mod normal;
pub mod registry;

pub use analyze::AnalyzeAgent;
pub use final_decision::FinalDecision;
pub use final_refer::FinalRefer;
pub use majority_vote::FinalMajorityVote;
pub use malicious::MaliciousAgent;
pub use math_solver::MathSolver;
pub use normal::NormalAgent;
pub use registry::{AgentArgs, AgentFactory, AgentRegistry, Spawned};
