//! Runtime Module
//!
//! Non-deterministic host around the engine: wall-clock ticking on tokio,
//! command serialization, update broadcast and shutdown.
//!
//! ## Module Structure
//!
//! - `config`: Driver settings loaded from the environment
//! - `driver`: Tick task and `EngineHandle`

pub mod config;
pub mod driver;

pub use config::DriverConfig;
pub use driver::{DriverError, EngineHandle, EngineUpdate};
