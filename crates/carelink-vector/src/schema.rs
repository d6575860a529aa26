//! On-disk layout of the vector cache.

pub const SCHEMA_VERSION: i64 = 1;

pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS vector_cache (
    key        TEXT PRIMARY KEY,
    embedding  BLOB NOT NULL,
    metadata   TEXT NOT NULL DEFAULT '{}',
    updated_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS cache_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Little-endian f32s, four bytes each.
pub fn encode_vector(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// `None` when the blob is not a whole number of f32s.
pub fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}
