//! Core types, configuration, and utilities for the LiftLog client.

mod clock;
mod config;
mod error;
mod logging;
mod paths;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, DEFAULT_LOG_LEVEL, DEFAULT_SERVER_URL};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
