use rusqlite::Connection;

use crate::error::{MoodshelfError, Result};
use crate::models::{CatalogStats, ContentType, TypeCount, ValueCount};

pub struct CatalogStatsQuery<'a> {
    conn: &'a Connection,
}

impl<'a> CatalogStatsQuery<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn get_stats(&self, top: usize) -> Result<CatalogStats> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM content", [], |row| {
                row.get::<_, i64>(0).map(|n| n as usize)
            })?;

        let needs_ai: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM content WHERE needs_ai = 1",
            [],
            |row| row.get::<_, i64>(0).map(|n| n as usize),
        )?;

        Ok(CatalogStats {
            total,
            by_type: self.count_by_type()?,
            top_genres: self.top_values("genre", top)?,
            top_epochs: self.top_values("epoch", top)?,
            needs_ai,
        })
    }

    pub fn count_by_type(&self) -> Result<Vec<TypeCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT type, COUNT(*) AS count FROM content GROUP BY type ORDER BY count DESC, type",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(kind, count)| {
                let kind = kind
                    .parse::<ContentType>()
                    .map_err(|_| MoodshelfError::UnknownContentType(kind))?;
                Ok(TypeCount {
                    kind,
                    count: count as usize,
                })
            })
            .collect()
    }

    fn top_values(&self, column: &str, limit: usize) -> Result<Vec<ValueCount>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column}, COUNT(*) AS count FROM content
             GROUP BY {column} ORDER BY count DESC, {column} LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok(ValueCount {
                    value: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentRecord;
    use crate::storage::CatalogStore;
    use crate::storage::repositories::Repository;

    #[test]
    fn test_stats_counts() {
        let store = CatalogStore::open_in_memory().unwrap();
        let repo = store.records();

        let mut a = ContentRecord::new(0, ContentType::Book, "Dune");
        a.genre = Some("sci-fi".to_string());
        let mut b = ContentRecord::new(0, ContentType::Book, "Hyperion");
        b.genre = Some("sci-fi".to_string());
        b.needs_ai = false;
        let mut c = ContentRecord::new(0, ContentType::Music, "Blue in Green");
        c.genre = Some("jazz".to_string());
        c.epoch = Some("1950s".to_string());
        for record in [&a, &b, &c] {
            repo.insert(record).unwrap();
        }

        let stats = store.stats().get_stats(5).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.needs_ai, 2);
        assert_eq!(
            stats.by_type,
            vec![
                TypeCount { kind: ContentType::Book, count: 2 },
                TypeCount { kind: ContentType::Music, count: 1 },
            ]
        );
        assert_eq!(stats.top_genres[0].value.as_deref(), Some("sci-fi"));
        assert_eq!(stats.top_genres[0].count, 2);
        assert_eq!(stats.top_epochs[0].value, None);
        assert_eq!(stats.top_epochs[0].count, 2);
    }

    #[test]
    fn test_stats_empty_catalog() {
        let store = CatalogStore::open_in_memory().unwrap();
        let stats = store.stats().get_stats(5).unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.by_type.is_empty());
        assert!(stats.top_genres.is_empty());
    }
}
