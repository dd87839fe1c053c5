//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::search::{ResultHandle, ResultItem, SearchError};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the result store at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_items(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> StorageResult<Vec<ResultItem>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(ResultItem {
                title: row.get(0)?,
                url: row.get::<_, Option<String>>(1)?.filter(|u| !u.is_empty()),
                description: row.get(2)?,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }
}

impl Storage for SqliteStorage {
    fn begin_search(&mut self, keyword: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO searches (keyword, searched_at) VALUES (?1, ?2)",
            params![keyword, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn record_results(&mut self, search_id: i64, items: &[ResultItem]) -> StorageResult<()> {
        let known: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM searches WHERE id = ?1",
            params![search_id],
            |row| row.get(0),
        )?;
        if known == 0 {
            return Err(StorageError::SearchNotFound(search_id));
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO link (search_id, title, url, description) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for item in items {
                stmt.execute(params![search_id, item.title, item.url, item.description])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn search_ids(&self, keyword: &str) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM searches WHERE keyword = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![keyword], |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn load_results(&self, search_ids: &[i64]) -> StorageResult<Vec<ResultItem>> {
        if search_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; search_ids.len()].join(", ");
        let sql = format!(
            "SELECT title, url, description FROM link WHERE search_id IN ({}) ORDER BY id",
            placeholders
        );
        let params: Vec<&dyn rusqlite::ToSql> = search_ids
            .iter()
            .map(|id| id as &dyn rusqlite::ToSql)
            .collect();
        self.query_items(&sql, &params)
    }

    fn count_results(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM link", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// The slice of a store written or replayed by one scrape
pub struct StoredResults {
    store: SqliteStorage,
    search_ids: Vec<i64>,
}

impl StoredResults {
    pub fn new(store: SqliteStorage, search_ids: Vec<i64>) -> Self {
        Self { store, search_ids }
    }
}

impl ResultHandle for StoredResults {
    fn read_all(&self) -> Result<Vec<ResultItem>, SearchError> {
        Ok(self.store.load_results(&self.search_ids)?)
    }
}
