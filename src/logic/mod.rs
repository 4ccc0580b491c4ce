pub mod calculations;
pub mod controller;
pub mod orchestrator;
pub mod planner;
pub mod profile_cache;
pub mod rules;
pub mod simulator;

pub use orchestrator::Orchestrator;
pub use simulator::SimOutput;
