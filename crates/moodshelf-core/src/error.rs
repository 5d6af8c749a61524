use thiserror::Error;

/// All errors that can occur in moodshelf-core.
#[derive(Debug, Error)]
pub enum MoodshelfError {
    #[error("Catalog store not found: {0}")]
    StoreNotFound(String),

    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, MoodshelfError>;
