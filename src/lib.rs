pub mod config;
pub mod db;
pub mod routes;
pub mod simulator;

pub use config::{AppConfig, SimulatorConfig};
pub use simulator::{SimulatorError, SimulatorService};
