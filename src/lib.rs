pub mod config;
pub mod core;
pub mod error;

pub use crate::config::{Config, ConfigValue, KillRingScope};
pub use crate::core::dispatcher::{Command, DispatchResult, dispatch};
pub use crate::core::registry::SessionRegistry;
pub use crate::core::session::Session;
pub use crate::core::surface::Surface;
pub use crate::error::{ConfigError, Error, Result};
