//! Database schema definitions for the search result store

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per keyword scraped
CREATE TABLE IF NOT EXISTS searches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL,
    searched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_searches_keyword ON searches(keyword);

-- Every result returned for a search
CREATE TABLE IF NOT EXISTS link (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_id INTEGER NOT NULL REFERENCES searches(id),
    title TEXT NOT NULL,
    url TEXT,
    description TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_link_search ON link(search_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
