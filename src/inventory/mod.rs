//! Inventory of transfer candidates
//!
//! Source entries are classified into coordinates, turned into transfer
//! units and collected either into a group/artifact/version/file tree or a
//! flat set. Units the destination already holds are left out.

mod builder;
mod entry;
mod tree;

pub use builder::*;
pub use entry::*;
pub use tree::*;
