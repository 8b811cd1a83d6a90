//! Configuration loading.
//!
//! Sources merge lowest-precedence first: built-in defaults, the user's
//! `config.toml` in the XDG config directory, the project's
//! `roster.toml`, the gitignored `roster.local.toml`, then `ROSTER_*`
//! environment variables. Files that don't exist are simply skipped.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;

use crate::RosterConfig;

/// Loads [`RosterConfig`] from the layered sources.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Creates a loader rooted at the current directory.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "ROSTER".to_string(),
        }
    }

    /// Sets the directory searched for `roster.toml` and
    /// `roster.local.toml`.
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Overrides the environment variable prefix (default `ROSTER`).
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Merges every source and deserializes the result.
    pub fn load(self) -> Result<RosterConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&RosterConfig::default())?);

        for path in self.config_files() {
            builder =
                builder.add_source(File::from(path).required(false).format(FileFormat::Toml));
        }

        builder
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .separator("_")
                    .try_parsing(true),
            )
            .build()
            .context("failed to merge configuration sources")?
            .try_deserialize()
            .context("configuration does not match the expected schema")
    }

    /// Loads configuration, falling back to defaults on any failure.
    pub fn load_or_default(self) -> RosterConfig {
        self.load().unwrap_or_default()
    }

    /// Candidate config files, lowest precedence first. The file source
    /// tolerates entries that don't exist.
    fn config_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(dirs) = ProjectDirs::from("io", "Roster", "roster") {
            files.push(dirs.config_dir().join("config.toml"));
        }
        files.push(self.project_dir.join("roster.toml"));
        files.push(self.project_dir.join("roster.local.toml"));
        files
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
