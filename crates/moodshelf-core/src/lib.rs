pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{AppConfig, ScoringConfig};
pub use error::{MoodshelfError, Result};
pub use models::*;

pub use storage::CatalogStore;
pub use storage::queries::CatalogStatsQuery;
pub use storage::repositories::{ContentRepository, Repository, SqliteContentRepository};
