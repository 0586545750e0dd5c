//! # artifact-migrate - incremental bulk migration between artifact repositories
//!
//! Moves artifacts from a source repository (a local directory, a Nexus
//! repository or an Artifactory repository) into a destination registry.
//! Artifacts the destination already holds are left out, so a run can be
//! repeated until everything has moved.
//!
//! ## Pipeline
//!
//! - **Listing**: a [`source::ListingAdapter`] produces flat source entries
//! - **Inventory**: an [`kind::ArtifactKind`] classifies entries into
//!   coordinates; the [`inventory::InventoryBuilder`] drops what the
//!   [`registry::ExistenceOracle`] reports as present
//! - **Transfer**: the [`core::TransferScheduler`] pushes units through an
//!   [`core::HttpTransfer`] with bounded concurrency
//! - **Report**: every unit lands in the [`report::Report`] exactly once
//!
//! ## Quick Start
//!
//! ```no_run
//! use artifact_migrate::config::{ArtifactType, Credentials, MigrateConfig};
//! use artifact_migrate::core::Migration;
//!
//! # async fn run() -> artifact_migrate::Result<()> {
//! let config = MigrateConfig {
//!     kind: ArtifactType::Maven,
//!     source: "/home/me/.m2/repository".into(),
//!     destination: "https://team-maven.pkg.example.com/repository/proj/releases".into(),
//!     destination_credentials: Some(Credentials::new("me", "secret")),
//!     concurrency: 4,
//!     ..Default::default()
//! };
//!
//! let result = Migration::new(config).execute().await?;
//! result.print_summary();
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod http;
pub mod inventory;
pub mod kind;
pub mod progress;
pub mod registry;
pub mod report;
pub mod source;

// Re-export commonly used types
pub use config::{ArtifactType, MigrateConfig};
pub use core::{Migration, MigrationResult};
pub use error::{MigrateError, Result};
pub use progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
