use rusqlite::Connection;

use crate::error::Result;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA synchronous = FULL;
        PRAGMA busy_timeout = 5000;
        ",
    )?;
    Ok(())
}

/// Catalog table as created by the harvesting setup. Collaborators may add
/// columns; readers select by name and ignore the rest.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS content (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            type        TEXT NOT NULL,
            title       TEXT NOT NULL,
            creator     TEXT,
            description TEXT,
            image_url   TEXT,
            year        INTEGER,
            rating      REAL,
            mood        TEXT,
            genre       TEXT,
            epoch       TEXT,
            needs_ai    INTEGER DEFAULT 0,
            source_id   TEXT UNIQUE,
            created_at  TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_content_type ON content(type);
        ",
    )?;
    Ok(())
}

pub fn has_content_table(conn: &Connection) -> Result<bool> {
    let exists = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='content'")?
        .exists([])?;
    Ok(exists)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    create_tables(conn)?;
    create_indexes(conn)?;
    Ok(())
}
