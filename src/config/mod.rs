//! Configuration module
//!
//! Provides CLI arguments, the runtime configuration value passed into
//! every component, and the credential store keyed by host.

mod credentials;
mod settings;

pub use credentials::*;
pub use settings::*;
