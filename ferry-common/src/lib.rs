//! Shared plumbing for the ferry relay: logging, shutdown coordination and
//! environment-driven configuration helpers.

pub mod env;
pub mod error;
pub mod logging;
pub mod shutdown;

pub use error::ConfigError;
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use tracing;
