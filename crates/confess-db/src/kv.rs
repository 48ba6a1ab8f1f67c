//! Key-value primitives: JSON values, sets and sorted sets.
//!
//! Each function takes a plain `&Connection` so it composes inside a
//! `rusqlite::Transaction` as well as on a bare connection.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;

// -- Values --

pub fn get_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;

    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Last write wins.
pub fn set_json<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        params![key, raw],
    )?;
    Ok(())
}

/// Returns false, leaving the stored value alone, if `key` already exists.
pub fn set_json_if_absent<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<bool> {
    let raw = serde_json::to_string(value)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO kv (key, value) VALUES (?1, ?2)",
        params![key, raw],
    )?;
    Ok(inserted == 1)
}

pub fn exists(conn: &Connection, key: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM kv WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

// -- Sets --

/// Returns true if `member` was not already in the set.
pub fn sadd(conn: &Connection, key: &str, member: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO kv_sets (key, member) VALUES (?1, ?2)",
        params![key, member],
    )?;
    Ok(inserted == 1)
}

pub fn sismember(conn: &Connection, key: &str, member: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM kv_sets WHERE key = ?1 AND member = ?2",
            params![key, member],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Members in insertion order.
pub fn smembers(conn: &Connection, key: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT member FROM kv_sets WHERE key = ?1 ORDER BY rowid")?;
    let members = stmt
        .query_map([key], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(members)
}

pub fn scard(conn: &Connection, key: &str) -> Result<u64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM kv_sets WHERE key = ?1", [key], |row| row.get(0))?;
    Ok(count as u64)
}

// -- Sorted sets --

pub fn zadd(conn: &Connection, key: &str, member: &str, score: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_zsets (key, member, score) VALUES (?1, ?2, ?3)
         ON CONFLICT(key, member) DO UPDATE SET score = excluded.score",
        params![key, member, score],
    )?;
    Ok(())
}

/// Highest scores first. Ties resolve newest insertion first.
pub fn zrevrange(conn: &Connection, key: &str, limit: u32) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT member FROM kv_zsets WHERE key = ?1 ORDER BY score DESC, rowid DESC LIMIT ?2",
    )?;
    let members = stmt
        .query_map(params![key, limit], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(members)
}
