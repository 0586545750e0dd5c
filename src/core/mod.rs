//! Core migration engine
//!
//! Provides the transfer executor, the bounded-concurrency scheduler and
//! the pipeline that ties listing, existence checks and transfers together.

mod pipeline;
mod scheduler;
mod transfer;

pub use pipeline::*;
pub use scheduler::*;
pub use transfer::*;
