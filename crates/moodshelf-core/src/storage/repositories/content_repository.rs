use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, Row, params, params_from_iter};

use crate::error::Result;
use crate::models::{ContentRecord, ContentType, IdentityKey};

use super::Repository;

const RECORD_COLUMNS: &str = "id, type, title, creator, description, image_url, year, rating,
                              mood, genre, epoch, needs_ai, source_id";

pub trait ContentRepository: Repository<Entity = ContentRecord, Id = i64> {
    fn count(&self) -> Result<usize>;
    /// `(id, identity key)` for every row, ascending by id.
    fn list_identities(&self) -> Result<Vec<(i64, IdentityKey)>>;
    /// Full records for `ids`, ascending by id. Missing ids are skipped.
    fn find_many(&self, ids: &[i64]) -> Result<Vec<ContentRecord>>;
    fn list_all(&self) -> Result<Vec<ContentRecord>>;
    /// Insert keeping `record.id` as the primary key.
    fn insert_with_id(&self, record: &ContentRecord) -> Result<()>;
}

pub struct SqliteContentRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteContentRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<ContentRecord> {
        let mut unparsed = Vec::new();
        let year = lenient_i64(row, 6)?.keep("year", &mut unparsed);
        let rating = lenient_f64(row, 7)?.keep("rating", &mut unparsed);

        Ok(ContentRecord {
            id: row.get(0)?,
            kind: content_type(row, 1)?,
            title: row.get(2)?,
            creator: row.get(3)?,
            description: lenient_text(row, 4)?,
            image_url: lenient_text(row, 5)?,
            year,
            rating,
            mood: lenient_text(row, 8)?,
            genre: lenient_text(row, 9)?,
            epoch: lenient_text(row, 10)?,
            needs_ai: lenient_i64(row, 11)?.value().is_none_or(|flag| flag != 0),
            source_id: lenient_text(row, 12)?,
            unparsed,
        })
    }
}

fn content_type(row: &Row, idx: usize) -> rusqlite::Result<ContentType> {
    let raw: String = row.get(idx)?;
    raw.parse::<ContentType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// A numeric column as read from a loosely typed row.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Lenient<T> {
    /// NULL or blank text.
    Empty,
    Value(T),
    /// Non-blank, but not a number (`'unknown'`, a blob).
    Unparsed,
}

impl<T> Lenient<T> {
    fn value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Empty | Self::Unparsed => None,
        }
    }

    /// Parsed value, remembering `column` when it was filled but unreadable.
    fn keep(self, column: &'static str, unparsed: &mut Vec<&'static str>) -> Option<T> {
        if matches!(self, Self::Unparsed) {
            unparsed.push(column);
        }
        self.value()
    }
}

/// Harvesters have written numbers as text before; accept both.
fn lenient_i64(row: &Row, idx: usize) -> rusqlite::Result<Lenient<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Lenient::Empty,
        ValueRef::Blob(_) => Lenient::Unparsed,
        ValueRef::Integer(i) => Lenient::Value(i),
        ValueRef::Real(r) => Lenient::Value(r as i64),
        ValueRef::Text(raw) => {
            let text = String::from_utf8_lossy(raw);
            let text = text.trim();
            if text.is_empty() {
                Lenient::Empty
            } else if let Ok(i) = text.parse::<i64>() {
                Lenient::Value(i)
            } else if let Ok(r) = text.parse::<f64>() {
                Lenient::Value(r as i64)
            } else {
                tracing::warn!(column = idx, value = %text, "non-numeric value kept as unparsed");
                Lenient::Unparsed
            }
        }
    })
}

fn lenient_f64(row: &Row, idx: usize) -> rusqlite::Result<Lenient<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Lenient::Empty,
        ValueRef::Blob(_) => Lenient::Unparsed,
        ValueRef::Integer(i) => Lenient::Value(i as f64),
        ValueRef::Real(r) => Lenient::Value(r),
        ValueRef::Text(raw) => {
            let text = String::from_utf8_lossy(raw);
            let text = text.trim();
            if text.is_empty() {
                Lenient::Empty
            } else if let Ok(r) = text.parse::<f64>() {
                Lenient::Value(r)
            } else {
                tracing::warn!(column = idx, value = %text, "non-numeric value kept as unparsed");
                Lenient::Unparsed
            }
        }
    })
}

/// Text columns sometimes hold numbers; render them instead of failing the row.
fn lenient_text(row: &Row, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(r) => Some(r.to_string()),
        ValueRef::Text(raw) | ValueRef::Blob(raw) => Some(String::from_utf8_lossy(raw).into_owned()),
    })
}

impl<'a> Repository for SqliteContentRepository<'a> {
    type Entity = ContentRecord;
    type Id = i64;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM content WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], Self::row_to_record)?;
        Ok(rows.next().transpose()?)
    }

    fn insert(&self, record: &Self::Entity) -> Result<Self::Id> {
        self.conn.execute(
            "INSERT INTO content
                (type, title, creator, description, image_url, year, rating,
                 mood, genre, epoch, needs_ai, source_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.kind.as_str(),
                record.title,
                record.creator,
                record.description,
                record.image_url,
                record.year,
                record.rating,
                record.mood,
                record.genre,
                record.epoch,
                record.needs_ai as i64,
                record.source_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM content WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl<'a> ContentRepository for SqliteContentRepository<'a> {
    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn list_identities(&self) -> Result<Vec<(i64, IdentityKey)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, type, title, creator FROM content ORDER BY id")?;

        let rows = stmt
            .query_map([], |row| {
                let kind = content_type(row, 1)?;
                let title: String = row.get(2)?;
                let creator: Option<String> = row.get(3)?;
                Ok((row.get(0)?, IdentityKey::new(&title, creator.as_deref(), kind)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_many(&self, ids: &[i64]) -> Result<Vec<ContentRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(",");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM content WHERE id IN ({placeholders}) ORDER BY id"
        ))?;

        let rows = stmt
            .query_map(params_from_iter(ids.iter()), Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_all(&self) -> Result<Vec<ContentRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM content ORDER BY id"))?;
        let rows = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_with_id(&self, record: &ContentRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO content
                (id, type, title, creator, description, image_url, year, rating,
                 mood, genre, epoch, needs_ai, source_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.id,
                record.kind.as_str(),
                record.title,
                record.creator,
                record.description,
                record.image_url,
                record.year,
                record.rating,
                record.mood,
                record.genre,
                record.epoch,
                record.needs_ai as i64,
                record.source_id,
            ],
        )?;
        Ok(())
    }
}
