//! Planner configuration, social costs and the per-tick driver.

pub mod agent;
pub mod config;
pub mod social;

pub use agent::Agent;
pub use config::PlannerConfig;
pub use social::SocialCostmap;
