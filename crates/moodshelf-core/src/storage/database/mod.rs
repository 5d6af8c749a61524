mod schema;

pub use schema::{has_content_table, init_schema};

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};

use crate::error::{MoodshelfError, Result};

use super::queries::CatalogStatsQuery;
use super::repositories::SqliteContentRepository;

/// Handle to the SQLite catalog file.
///
/// [`CatalogStore::open`] never creates a file: a missing store is an error,
/// not a fresh empty catalog. Use [`CatalogStore::create`] to bootstrap one.
pub struct CatalogStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl CatalogStore {
    /// Open an existing catalog for reading and writing.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(MoodshelfError::StoreNotFound(path.display().to_string()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        schema::apply_pragmas(&conn)?;

        if !schema::has_content_table(&conn)? {
            return Err(MoodshelfError::ValidationError(format!(
                "{} has no content table",
                path.display()
            )));
        }

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open or create the catalog at `path` and make sure the schema exists.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::apply_pragmas(&conn)?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mutable access is only needed to start a transaction.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn records(&self) -> SqliteContentRepository<'_> {
        SqliteContentRepository::new(&self.conn)
    }

    pub fn stats(&self) -> CatalogStatsQuery<'_> {
        CatalogStatsQuery::new(&self.conn)
    }
}
