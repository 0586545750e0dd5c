//! Destination registry
//!
//! Parses destination repository URLs and asks the registry's open API
//! which artifacts and files it already holds.

mod destination;
mod oracle;

pub use destination::*;
pub use oracle::*;
