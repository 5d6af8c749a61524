use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MoodshelfError, Result};

/// Root application configuration, loaded from `~/.config/moodshelf/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub backup: BackupConfig,
    pub report: ReportConfig,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub database_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub directory: String,
}

/// Weights of the duplicate quality heuristic.
///
/// The two bonuses are provisional product choices and are kept here so they
/// can be tuned without a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub field_weight: u32,
    pub ai_description_bonus: u32,
    pub source_id_bonus: u32,
}

// ─── Defaults ──────────────────────────────────────────────

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("moodshelf")
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("content.db").to_string_lossy().to_string(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: data_dir().join("backups").to_string_lossy().to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: data_dir().join("reports").to_string_lossy().to_string(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            field_weight: 1,
            ai_description_bonus: 2,
            source_id_bonus: 1,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/moodshelf/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("MOODSHELF_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("moodshelf")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    /// `MOODSHELF_DATABASE` overrides the catalog path.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(db) = std::env::var("MOODSHELF_DATABASE") {
            config.set_database_path(db);
        }
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Every configured path must be non-blank.
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("catalog.database_path", &self.catalog.database_path),
            ("backup.directory", &self.backup.directory),
            ("report.directory", &self.report.directory),
        ];
        for (key, value) in paths {
            if value.trim().is_empty() {
                return Err(MoodshelfError::ConfigError(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn set_database_path(&mut self, path: impl Into<String>) {
        self.catalog.database_path = path.into();
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.catalog.database_path)
    }

    pub fn backup_dir(&self) -> PathBuf {
        PathBuf::from(&self.backup.directory)
    }

    pub fn report_dir(&self) -> PathBuf {
        PathBuf::from(&self.report.directory)
    }
}
