//! Configuration management for Roster
//!
//! [`RosterConfig`] carries the deployment's code templates, the
//! allocator retry bound, import batching, and dispatcher settings.
//! [`ConfigLoader`] layers it from built-in defaults, an optional user
//! `config.toml`, the project's `roster.toml` and gitignored
//! `roster.local.toml`, and finally `ROSTER_*` environment variables,
//! later sources winning.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod loader;

pub use loader::ConfigLoader;

/// Main Roster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub project: ProjectConfig,
    pub allocator: AllocatorConfig,
    pub codes: CodeConfig,
    pub import: ImportConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "roster-project".to_string(),
        }
    }
}

/// Allocator retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Attempts before an allocation gives up with ExhaustedRetries.
    /// Exhaustion indicates systemic contention or a scope with a
    /// pathological template, not a transient hiccup.
    pub max_attempts: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self { max_attempts: 100 }
    }
}

/// Code templates per entity kind.
///
/// Templates use the placeholder language from `roster-kernel`:
/// `{dept}` (department prefix), `{year}` / `{year:4}`, `{sequence}` /
/// `{sequence:N}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub student_template: String,
    pub class_template: String,
    pub course_template: String,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            student_template: "{dept}{year}{sequence:3}".to_string(),
            class_template: "C{year}{sequence:3}".to_string(),
            course_template: "{dept}-{sequence:3}".to_string(),
        }
    }
}

/// Bulk import batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Rows per sub-batch. Bounds peak resource usage only; sub-batch
    /// boundaries carry no transactional meaning.
    pub sub_batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { sub_batch_size: 50 }
    }
}

/// Deferred side-effect dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Callback URL handed to the notification dispatcher with each job.
    pub callback_url: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            callback_url: "http://127.0.0.1:7700/callbacks/roster".to_string(),
        }
    }
}

impl RosterConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }
}
