//! Progress reporting module
//!
//! Terminal progress for the transfer stage: one bar counting completed
//! units and a status line for stage changes.

mod reporter;

pub use reporter::*;
