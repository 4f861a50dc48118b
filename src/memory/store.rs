//! Long-term memory store
//!
//! Sqlite-backed `(category, content)` log with keyword recall. Recall
//! scoring mixes keyword overlap with a temporal decay bonus so recent
//! exchanges outrank stale ones.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use uuid::Uuid;

use crate::{Error, Result};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Half-life for temporal decay (in days)
const DECAY_HALF_LIFE_DAYS: f64 = 7.0;

/// Weight of recency against keyword overlap in recall scoring
const DECAY_WEIGHT: f64 = 0.3;

/// Rows fetched per recall before scoring
const RECALL_CANDIDATES: usize = 500;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// A stored memory entry
#[derive(Debug, Clone)]
pub struct Memory {
    pub id: String,
    pub category: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
}

/// Long-term memory repository
#[derive(Clone)]
pub struct MemoryStore {
    pool: DbPool,
}

impl MemoryStore {
    /// Open (or create) the memory database at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or migrated
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
        init_schema(&conn)?;

        tracing::info!(version = SCHEMA_VERSION, "memory store initialized");
        Ok(Self { pool })
    }

    /// Open an in-memory store (for testing)
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be initialized
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self { pool })
    }

    /// Store a new memory entry
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails
    pub fn remember(&self, content: &str, category: &str) -> Result<()> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r"INSERT INTO memories (id, category, content, created_at, accessed_at, access_count)
              VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            rusqlite::params![
                format!("mem_{}", Uuid::new_v4()),
                category,
                content,
                now,
                now,
            ],
        )?;

        tracing::debug!(category, "memory stored");
        Ok(())
    }

    /// Recall the memories most relevant to `query`, best first
    ///
    /// Relevance is keyword overlap with a recency bonus. Entries with no
    /// overlapping keyword are never returned.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    pub fn recall(&self, query: &str, limit: usize) -> Result<Vec<Memory>> {
        let tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(ToString::to_string)
            .collect();

        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let mut stmt = conn.prepare(
            r"SELECT id, category, content, created_at, accessed_at
              FROM memories ORDER BY accessed_at DESC LIMIT ?1",
        )?;

        #[allow(clippy::cast_possible_wrap)]
        let rows = stmt.query_map([RECALL_CANDIDATES as i64], row_to_memory)?;

        let now = Utc::now();
        let mut scored: Vec<(Memory, f64)> = rows
            .flatten()
            .filter_map(|memory| {
                let content = memory.content.to_lowercase();
                let overlap = tokens.iter().filter(|t| content.contains(t.as_str())).count();
                if overlap == 0 {
                    return None;
                }

                #[allow(clippy::cast_precision_loss)]
                let score = overlap as f64
                    + DECAY_WEIGHT * temporal_decay_factor(&memory.accessed_at, &now);
                Some((memory, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        let memories: Vec<Memory> = scored.into_iter().map(|(m, _)| m).collect();

        // Bump access stats for the entries handed back
        for memory in &memories {
            conn.execute(
                r"UPDATE memories SET access_count = access_count + 1,
                  accessed_at = datetime('now') WHERE id = ?1",
                [&memory.id],
            )?;
        }

        Ok(memories)
    }

    /// Recall context formatted for prompt injection, best-effort
    ///
    /// Returns the top three relevant entries under a `Relevant Context:`
    /// header, or an empty string when nothing matches or recall fails.
    #[must_use]
    pub fn recall_context(&self, query: &str) -> String {
        match self.recall(query, 3) {
            Ok(memories) if !memories.is_empty() => {
                let mut out = String::from("Relevant Context:\n");
                for memory in &memories {
                    let _ = writeln!(out, "- [{}] {}", memory.category, memory.content);
                }
                out
            }
            Ok(_) => String::new(),
            Err(e) => {
                tracing::debug!(error = %e, "memory recall failed, continuing without context");
                String::new()
            }
        }
    }

    /// Total number of stored entries
    ///
    /// # Errors
    ///
    /// Returns error if the query fails
    pub fn count(&self) -> Result<i64> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let count = conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Map a database row to a [`Memory`]
fn row_to_memory(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memory> {
    let created_at: String = row.get(3)?;
    let accessed_at: String = row.get(4)?;

    Ok(Memory {
        id: row.get(0)?,
        category: row.get(1)?,
        content: row.get(2)?,
        created_at: parse_timestamp(&created_at),
        accessed_at: parse_timestamp(&accessed_at),
    })
}

/// Parse an RFC 3339 or sqlite datetime string, defaulting to now
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

/// Compute temporal decay factor from an `accessed_at` timestamp.
///
/// Exponential decay with a 7-day half-life; 1.0 means just accessed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
fn temporal_decay_factor(accessed_at: &DateTime<Utc>, now: &DateTime<Utc>) -> f64 {
    let elapsed_days = (*now - *accessed_at).num_seconds().max(0) as f64 / 86400.0;
    (-elapsed_days / DECAY_HALF_LIFE_DAYS).exp2()
}

/// Initialize the database schema
fn init_schema(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            accessed_at TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
        CREATE INDEX IF NOT EXISTS idx_memories_accessed ON memories(accessed_at);

        PRAGMA user_version = 1;
        ",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_and_recall_roundtrip() {
        let store = MemoryStore::open_in_memory().unwrap();

        store
            .remember("User: open firefox | Jarvis: Opening Firefox.", "interaction")
            .unwrap();
        store
            .remember("User prefers dark terminal themes", "preference")
            .unwrap();

        let found = store.recall("firefox browser", 3).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].content.contains("firefox"));
    }

    #[test]
    fn recall_without_overlap_is_empty() {
        let store = MemoryStore::open_in_memory().unwrap();
        store.remember("the sky is blue", "fact").unwrap();

        assert!(store.recall("quantum entanglement", 3).unwrap().is_empty());
    }

    #[test]
    fn short_tokens_are_not_matched() {
        let store = MemoryStore::open_in_memory().unwrap();
        store.remember("note about it", "fact").unwrap();

        // Every query token is too short to count as a keyword
        assert!(store.recall("it is on", 3).unwrap().is_empty());
    }

    #[test]
    fn recall_context_formats_header_and_entries() {
        let store = MemoryStore::open_in_memory().unwrap();
        store
            .remember("User prefers vim keybindings", "preference")
            .unwrap();

        let context = store.recall_context("configure vim editor");
        assert!(context.starts_with("Relevant Context:\n"));
        assert!(context.contains("- [preference] User prefers vim keybindings"));
    }

    #[test]
    fn recall_context_is_empty_when_nothing_matches() {
        let store = MemoryStore::open_in_memory().unwrap();
        assert!(store.recall_context("anything at all").is_empty());
    }

    #[test]
    fn recall_respects_limit() {
        let store = MemoryStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .remember(&format!("browser session note {i}"), "interaction")
                .unwrap();
        }

        let found = store.recall("browser session", 3).unwrap();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn temporal_decay_recent_is_high() {
        let now = Utc::now();
        let factor = temporal_decay_factor(&now, &now);
        assert!(factor > 0.99, "factor for now should be ~1.0, got {factor}");
    }

    #[test]
    fn temporal_decay_half_life() {
        let now = Utc::now();
        let half = now - chrono::Duration::days(7);
        let factor = temporal_decay_factor(&half, &now);
        assert!(
            (factor - 0.5).abs() < 0.01,
            "factor at 7 days should be ~0.5, got {factor}"
        );
    }
}
