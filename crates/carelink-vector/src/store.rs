//! Durable tier: one SQLite file, one writer connection.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use crate::cache::CacheEntry;
use crate::schema::{decode_vector, encode_vector, CREATE_TABLES, SCHEMA_VERSION};

pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(())
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let writer = Connection::open(path).with_context(|| format!("opening {}", path.display()))?;
        configure_connection(&writer)?;
        writer.execute_batch(CREATE_TABLES)?;
        writer.execute(
            "INSERT OR REPLACE INTO cache_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;

        let reader = Connection::open(path)?;
        configure_connection(&reader)?;
        Ok(Self { writer: Mutex::new(writer), reader: Mutex::new(reader) })
    }

    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.reader.lock();
        let row = conn
            .query_row(
                "SELECT embedding, metadata, updated_at FROM vector_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?)),
            )
            .optional()?;
        let Some((blob, metadata, updated_at)) = row else {
            return Ok(None);
        };
        let Some(embedding) = decode_vector(&blob) else {
            tracing::warn!(key, "discarding malformed cached vector");
            return Ok(None);
        };
        let metadata: HashMap<String, String> = serde_json::from_str(&metadata).unwrap_or_default();
        let updated_at = DateTime::<Utc>::from_timestamp_millis(updated_at).unwrap_or_default();
        Ok(Some(CacheEntry { key: key.to_string(), embedding, metadata, updated_at }))
    }

    pub fn upsert(&self, entry: &CacheEntry) -> Result<()> {
        let metadata = serde_json::to_string(&entry.metadata)?;
        let conn = self.writer.lock();
        conn.execute(
            "INSERT INTO vector_cache (key, embedding, metadata, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET embedding = excluded.embedding,
                 metadata = excluded.metadata, updated_at = excluded.updated_at",
            params![entry.key, encode_vector(&entry.embedding), metadata, entry.updated_at.timestamp_millis()],
        )?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.writer.lock().execute("DELETE FROM vector_cache", [])?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let n: i64 = self.reader.lock().query_row("SELECT COUNT(*) FROM vector_cache", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }
}
