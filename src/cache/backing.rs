//! Persistent cache backing - survives process restarts.
//!
//! The in-process cache is authoritative while the process runs; a backing
//! store is the optional integration point for deployments that want the
//! working set back after a restart. Entries are stored in their full shape
//! so restored entries keep their original tier, creation time and counters.

use crate::cache::types::{CacheEntry, CacheTier};
use crate::cache::TieredCache;
use crate::error::Result;
use crate::types::Enhancement;
use log::{info, warn};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

/// Get/set/delete interface for a persistent entry store.
///
/// Keys are the same point-derived keys the in-process cache uses.
pub trait CacheBacking: Send + Sync {
    /// Every persisted entry.
    fn load_all(&self) -> Result<Vec<(String, CacheEntry)>>;

    /// Persist one entry, replacing any prior row for the key.
    fn store(&self, key: &str, entry: &CacheEntry) -> Result<()>;

    /// Remove one key. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// SQLite-backed entry store.
pub struct SqliteBacking {
    conn: Mutex<Connection>,
}

impl SqliteBacking {
    /// Open or create the backing database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path.as_ref())?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS enhancement_cache (
                key TEXT PRIMARY KEY,
                tier INTEGER NOT NULL,
                confidence INTEGER NOT NULL,
                created_at_ms INTEGER NOT NULL,
                ttl_secs INTEGER NOT NULL,
                hit_count INTEGER NOT NULL,
                data_json TEXT NOT NULL
            )",
            [],
        )?;

        Ok(SqliteBacking {
            conn: Mutex::new(conn),
        })
    }
}

impl CacheBacking for SqliteBacking {
    fn load_all(&self) -> Result<Vec<(String, CacheEntry)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT key, tier, confidence, created_at_ms, ttl_secs, hit_count, data_json
             FROM enhancement_cache",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, u8>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, u64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, tier, confidence, created_at_ms, ttl_secs, hit_count, data_json) = row?;

            // Rows with an unknown tier or unreadable payload are skipped,
            // not fatal: a schema drift must not take the cache down.
            let Some(tier) = CacheTier::from_u8(tier) else {
                warn!("skipping cache row '{}' with unknown tier {}", key, tier);
                continue;
            };
            let data: Enhancement = match serde_json::from_str(&data_json) {
                Ok(data) => data,
                Err(e) => {
                    warn!("skipping unreadable cache row '{}': {}", key, e);
                    continue;
                }
            };

            entries.push((
                key,
                CacheEntry {
                    data,
                    tier,
                    confidence,
                    created_at_ms,
                    ttl_secs,
                    hit_count,
                },
            ));
        }

        Ok(entries)
    }

    fn store(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let data_json = serde_json::to_string(&entry.data)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO enhancement_cache (
                key, tier, confidence, created_at_ms, ttl_secs, hit_count, data_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                key,
                entry.tier.as_u8(),
                entry.confidence,
                entry.created_at_ms,
                entry.ttl_secs,
                entry.hit_count,
                data_json
            ],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM enhancement_cache WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl TieredCache {
    /// Restore live entries from a backing store.
    ///
    /// Entries that expired while the process was down are left behind in the
    /// backing and not restored. Returns how many entries came back.
    pub fn load_from(&self, backing: &dyn CacheBacking) -> Result<usize> {
        let now = crate::types::now_ms();
        let mut restored = 0;

        for (key, entry) in backing.load_all()? {
            if entry.is_expired_at(now) {
                continue;
            }
            self.restore(key, entry);
            restored += 1;
        }

        info!("restored {} cache entries from backing", restored);
        Ok(restored)
    }

    /// Persist every live entry to a backing store.
    ///
    /// Returns how many entries were written. A failed row aborts the pass;
    /// the backing is left with whatever rows were already written.
    pub fn persist_to(&self, backing: &dyn CacheBacking) -> Result<usize> {
        let entries = self.live_entries();
        for (key, entry) in &entries {
            backing.store(key, entry)?;
        }

        info!("persisted {} cache entries to backing", entries.len());
        Ok(entries.len())
    }
}
