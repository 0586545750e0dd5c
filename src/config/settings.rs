//! Configuration settings for artifact migration
//!
//! Defines all configuration options, CLI arguments, and defaults
//! for a migration run.

use crate::config::{CredentialStore, Credentials};
use crate::error::{MigrateError, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// artifact-migrate - incremental bulk migration between artifact repositories
#[derive(Parser, Debug, Clone)]
#[command(name = "artifact-migrate")]
#[command(author = "Artifact Migrate Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Migrate artifacts from a local or remote repository into an artifact registry")]
#[command(long_about = r#"
Migrates artifacts in bulk from a source repository (a local directory, a
Nexus repository or an Artifactory repository) into a destination registry.
Artifacts the destination already holds are skipped, so a run can be
repeated until everything has moved.

Examples:
  artifact-migrate maven --dst https://team-maven.pkg.example.com/repository/proj/releases
  artifact-migrate generic --src https://nexus.local/repository/raw --dst https://team-generic.pkg.example.com/proj/files -c 8
  artifact-migrate pypi --src https://nexus.local/repository/pypi --dst https://team-pypi.pkg.example.com/proj/pypi --dry-run
  artifact-migrate composer --src https://nexus.local/repository/composer --dst https://team-composer.pkg.example.com/proj/php
"#)]
pub struct CliArgs {
    /// Artifact type to migrate
    #[arg(value_enum, value_name = "TYPE")]
    pub kind: ArtifactType,

    /// Source: a local directory or a repository URL
    #[arg(long, default_value = "", value_name = "PATH|URL")]
    pub src: String,

    /// Source type (defaults to nexus for URLs and local otherwise)
    #[arg(long, value_enum, value_name = "TYPE")]
    pub src_type: Option<SourceType>,

    /// Username for the source repository
    #[arg(long, env = "ARTIFACT_MIGRATE_SRC_USERNAME", value_name = "USER")]
    pub src_username: Option<String>,

    /// Password for the source repository
    #[arg(long, env = "ARTIFACT_MIGRATE_SRC_PASSWORD", hide_env_values = true, value_name = "PASSWORD")]
    pub src_password: Option<String>,

    /// Destination repository URL
    #[arg(long, value_name = "URL")]
    pub dst: String,

    /// Username for the destination registry (overrides the credentials file)
    #[arg(long, env = "ARTIFACT_MIGRATE_DST_USERNAME", value_name = "USER")]
    pub dst_username: Option<String>,

    /// Password for the destination registry (overrides the credentials file)
    #[arg(long, env = "ARTIFACT_MIGRATE_DST_PASSWORD", hide_env_values = true, value_name = "PASSWORD")]
    pub dst_password: Option<String>,

    /// Credentials file
    #[arg(long, env = "ARTIFACT_MIGRATE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of artifacts transferred simultaneously
    #[arg(short = 'c', long, default_value = "1", value_name = "NUM")]
    pub concurrency: usize,

    /// Transfer everything, even artifacts the destination already has
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Stop dispatching new artifacts after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Show what would be migrated without transferring anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Dispatch the largest artifacts first
    #[arg(long, overrides_with = "no_largest_first")]
    pub largest_first: bool,

    /// Dispatch artifacts in listing order
    #[arg(long, overrides_with = "largest_first")]
    pub no_largest_first: bool,

    /// Only migrate generic artifacts whose path starts with this prefix
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Maximum number of files to migrate
    #[arg(long, value_name = "NUM")]
    pub max_files: Option<usize>,

    /// Attempts per artifact when the network fails
    #[arg(long, default_value = "3", value_name = "NUM")]
    pub retries: usize,

    /// Delay between attempts (e.g. 1s, 500ms)
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub retry_delay: Duration,

    /// HTTP request timeout
    #[arg(long, default_value = "5m", value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub timeout: Duration,

    /// Pause after each artifact (e.g. 200ms)
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub sleep: Option<Duration>,

    /// Show a progress bar
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Output format for the final report
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Artifact type handled by a run
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// Maven repositories (group/artifact/version layout)
    #[default]
    Maven,
    /// Generic files keyed by path
    Generic,
    /// Python distributions
    Pypi,
    /// PHP packages described by Composer package indexes
    Composer,
}

impl ArtifactType {
    /// Name as it appears in registry host names
    pub fn name(&self) -> &'static str {
        match self {
            Self::Maven => "maven",
            Self::Generic => "generic",
            Self::Pypi => "pypi",
            Self::Composer => "composer",
        }
    }
}

/// Where the source listing comes from
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Local directory walk
    #[default]
    Local,
    /// Nexus assets API
    Nexus,
    /// Artifactory AQL search
    Jfrog,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Artifact type
    pub kind: ArtifactType,
    /// Source directory or URL
    pub source: String,
    /// How to list the source
    pub source_type: SourceType,
    /// Source credentials (anonymous when absent)
    pub source_credentials: Option<Credentials>,
    /// Destination repository URL
    pub destination: String,
    /// Destination credentials
    pub destination_credentials: Option<Credentials>,
    /// Number of concurrent transfers
    pub concurrency: usize,
    /// Ignore what the destination already has
    pub force: bool,
    /// Stop dispatching after the first failure
    pub fail_fast: bool,
    /// Build the inventory only
    pub dry_run: bool,
    /// Size-descending dispatch; `None` uses the artifact type's default
    pub largest_first: Option<bool>,
    /// Generic path prefix filter
    pub prefix: Option<String>,
    /// Cap on inventory size
    pub max_files: Option<usize>,
    /// Attempts per unit
    pub retries: usize,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Pause after each unit
    pub sleep: Option<Duration>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            kind: ArtifactType::Maven,
            source: String::new(),
            source_type: SourceType::Local,
            source_credentials: None,
            destination: String::new(),
            destination_credentials: None,
            concurrency: 1,
            force: false,
            fail_fast: false,
            dry_run: false,
            largest_first: None,
            prefix: None,
            max_files: None,
            retries: 3,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
            sleep: None,
        }
    }
}

/// Check whether a source string is a remote URL
pub fn is_remote_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Default local Maven repository (`$HOME/.m2/repository`)
pub fn default_maven_repository() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".m2").join("repository"))
}

impl MigrateConfig {
    /// Create config from CLI arguments, resolving destination credentials
    /// from the credentials file when they are not given explicitly.
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let mut config = Self {
            kind: args.kind,
            destination: args.dst.trim().to_string(),
            concurrency: args.concurrency,
            force: args.force,
            fail_fast: args.fail_fast,
            dry_run: args.dry_run,
            prefix: args.prefix.clone().filter(|p| !p.is_empty()),
            max_files: args.max_files,
            retries: args.retries.max(1),
            retry_delay: args.retry_delay,
            timeout: args.timeout,
            sleep: args.sleep,
            ..Default::default()
        };

        if config.destination.is_empty() {
            return Err(MigrateError::config("Destination URL required (--dst)"));
        }

        config.source = args.src.trim().to_string();
        if config.source.is_empty() {
            if args.kind != ArtifactType::Maven {
                return Err(MigrateError::config("Source required (--src)"));
            }
            let default = default_maven_repository()
                .ok_or_else(|| MigrateError::config("Cannot determine home directory for ~/.m2/repository"))?;
            config.source = default.to_string_lossy().into_owned();
        }

        config.source_type = match (args.src_type, is_remote_source(&config.source)) {
            (Some(SourceType::Local), true) => {
                return Err(MigrateError::config(format!(
                    "Source '{}' is a URL but --src-type is local",
                    config.source
                )))
            }
            (Some(t @ (SourceType::Nexus | SourceType::Jfrog)), false) => {
                return Err(MigrateError::config(format!(
                    "--src-type {:?} requires an http(s) source URL",
                    t
                )))
            }
            (Some(t), _) => t,
            (None, true) => SourceType::Nexus,
            (None, false) => SourceType::Local,
        };

        config.largest_first = if args.largest_first {
            Some(true)
        } else if args.no_largest_first {
            Some(false)
        } else {
            None
        };

        config.source_credentials = match (&args.src_username, &args.src_password) {
            (Some(user), password) => Some(Credentials::new(user, password.as_deref().unwrap_or(""))),
            _ => None,
        };

        config.destination_credentials = match (&args.dst_username, &args.dst_password) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            _ => {
                let store = match &args.config {
                    Some(path) => CredentialStore::load(path)?,
                    None => match CredentialStore::default_path() {
                        Some(path) => CredentialStore::load(&path)?,
                        None => CredentialStore::default(),
                    },
                };
                store.lookup_url(&config.destination).cloned()
            }
        };

        Ok(config)
    }
}
