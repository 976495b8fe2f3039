//! SQLite-backed expiring store for lookup payloads.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use prizm_core::error::{PrizmError, Result};
use prizm_core::LookupPayload;

/// Schema for the cache table. `expires_at` is indexed so sweeps do not
/// scan the whole table.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS postal_code_cache (
    postal_code TEXT PRIMARY KEY,
    payload     TEXT NOT NULL,
    cached_at   INTEGER NOT NULL,
    expires_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_expires_at ON postal_code_cache (expires_at);
";

/// A live cache row.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    /// The persisted verdict.
    pub payload: LookupPayload,
    /// When the row was written.
    pub cached_at: DateTime<Utc>,
    /// When the row stops being served.
    pub expires_at: DateTime<Utc>,
}

/// Read-only diagnostic snapshot of the store.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// All physically present rows, expired ones included.
    pub total: u64,
    /// Rows still being served.
    pub valid: u64,
    /// Rows past expiry awaiting a sweep.
    pub expired: u64,
    /// Write time of the oldest still-valid row.
    pub oldest_valid: Option<DateTime<Utc>>,
    /// Write time of the newest still-valid row.
    pub newest_valid: Option<DateTime<Utc>>,
    /// Database file size in bytes (0 for in-memory stores).
    pub db_size_bytes: u64,
}

/// Durable, expiring key-value store for lookup payloads.
///
/// Opened once per process and shared; the connection sits behind a mutex
/// and every write is an upsert, so concurrent readers and writers need no
/// external coordination. Entries are idempotently derived from their key,
/// making last-write-wins safe.
pub struct SegmentCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SegmentCache {
    /// Opens (creating if needed) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| PrizmError::Storage(format!("failed to open {}: {e}", path.display())))?;
        Self::init(conn, Some(path))
    }

    /// Opens a private in-memory cache, used by tests and ephemeral runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PrizmError::Storage(format!("failed to open in-memory cache: {e}")))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.execute_batch(SCHEMA)
            .map_err(|e| PrizmError::Storage(format!("failed to initialize schema: {e}")))?;

        if let Some(p) = &path {
            info!(path = %p.display(), "Cache database initialized");
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Returns the entry for `key` if present and not yet expired.
    ///
    /// Expired rows are never returned even while physically present.
    /// Storage faults and undecodable payloads degrade to a miss.
    pub fn get(&self, key: &str) -> Option<CachedEntry> {
        let now = Utc::now().timestamp();
        let conn = self.conn.lock();

        let row = conn
            .query_row(
                "SELECT payload, cached_at, expires_at
                 FROM postal_code_cache
                 WHERE postal_code = ?1 AND expires_at > ?2",
                params![key, now],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional();

        let (raw_payload, cached_at, expires_at) = match row {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!(key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let payload: LookupPayload = match serde_json::from_str(&raw_payload) {
            Ok(p) => p,
            Err(e) => {
                warn!(key, error = %e, "Cached payload undecodable, treating as miss");
                return None;
            }
        };

        let entry = CachedEntry {
            payload,
            cached_at: DateTime::from_timestamp(cached_at, 0)?,
            expires_at: DateTime::from_timestamp(expires_at, 0)?,
        };

        debug!(key, cached_at = %entry.cached_at, "Cache hit");
        Some(entry)
    }

    /// Upserts `payload` under `key`, expiring `ttl` from now.
    ///
    /// Replaces any existing row for the key and recomputes its expiry
    /// (last-write-wins). Returns whether the write landed; storage faults
    /// are logged and reported as `false`.
    pub fn put(&self, key: &str, payload: &LookupPayload, ttl: Duration) -> bool {
        let now = Utc::now();
        let expires = now + ttl;

        let raw = match serde_json::to_string(payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize payload, dropping write");
                return false;
            }
        };

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT OR REPLACE INTO postal_code_cache
             (postal_code, payload, cached_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, raw, now.timestamp(), expires.timestamp()],
        );

        match result {
            Ok(_) => {
                debug!(key, expires_at = %expires, "Cached payload");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Cache write failed");
                false
            }
        }
    }

    /// Returns whether `key` has a live (non-expired, decodable) entry.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Deletes the entry for `key`. Returns whether a row existed.
    pub fn delete(&self, key: &str) -> bool {
        let conn = self.conn.lock();
        match conn.execute(
            "DELETE FROM postal_code_cache WHERE postal_code = ?1",
            params![key],
        ) {
            Ok(n) => {
                if n > 0 {
                    info!(key, "Deleted cache entry");
                }
                n > 0
            }
            Err(e) => {
                warn!(key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Removes every entry unconditionally.
    pub fn clear(&self) -> bool {
        let conn = self.conn.lock();
        match conn.execute("DELETE FROM postal_code_cache", []) {
            Ok(n) => {
                info!(removed = n, "Cleared cache");
                true
            }
            Err(e) => {
                warn!(error = %e, "Cache clear failed");
                false
            }
        }
    }

    /// Removes all rows whose expiry has passed; returns how many.
    ///
    /// Purely space reclamation: `get` is correct whether or not this has
    /// ever run.
    pub fn sweep_expired(&self) -> u64 {
        let now = Utc::now().timestamp();
        let conn = self.conn.lock();
        match conn.execute(
            "DELETE FROM postal_code_cache WHERE expires_at <= ?1",
            params![now],
        ) {
            Ok(n) => {
                if n > 0 {
                    info!(removed = n, "Swept expired cache entries");
                }
                n as u64
            }
            Err(e) => {
                warn!(error = %e, "Cache sweep failed");
                0
            }
        }
    }

    /// Returns a diagnostic snapshot. Faults yield an all-zero snapshot.
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now().timestamp();
        let conn = self.conn.lock();

        let query = || -> rusqlite::Result<CacheStats> {
            let total: u64 =
                conn.query_row("SELECT COUNT(*) FROM postal_code_cache", [], |r| r.get(0))?;
            let valid: u64 = conn.query_row(
                "SELECT COUNT(*) FROM postal_code_cache WHERE expires_at > ?1",
                params![now],
                |r| r.get(0),
            )?;
            let (oldest, newest): (Option<i64>, Option<i64>) = conn.query_row(
                "SELECT MIN(cached_at), MAX(cached_at)
                 FROM postal_code_cache WHERE expires_at > ?1",
                params![now],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;

            Ok(CacheStats {
                total,
                valid,
                expired: total.saturating_sub(valid),
                oldest_valid: oldest.and_then(|t| DateTime::from_timestamp(t, 0)),
                newest_valid: newest.and_then(|t| DateTime::from_timestamp(t, 0)),
                db_size_bytes: self.file_size(),
            })
        };

        match query() {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Cache stats query failed");
                CacheStats {
                    total: 0,
                    valid: 0,
                    expired: 0,
                    oldest_valid: None,
                    newest_valid: None,
                    db_size_bytes: self.file_size(),
                }
            }
        }
    }

    fn file_size(&self) -> u64 {
        self.path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }
}
