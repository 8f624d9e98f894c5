pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod rng;
pub mod scenario;
pub mod score;
pub mod settlement;
pub mod snapshot;
pub mod systems;
pub mod world;

pub use config::SimConfig;
pub use engine::{Engine, EngineSettings, MonthSummary};
pub use error::SimError;
pub use scenario::{Scenario, ScenarioLoader};
