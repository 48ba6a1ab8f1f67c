use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (key-value schema)");
        conn.execute_batch(
            "
            -- Plain values, JSON encoded
            CREATE TABLE kv (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Unordered sets; rowid keeps insertion order for listing
            CREATE TABLE kv_sets (
                key     TEXT NOT NULL,
                member  TEXT NOT NULL,
                PRIMARY KEY (key, member)
            );

            -- Sorted sets
            CREATE TABLE kv_zsets (
                key     TEXT NOT NULL,
                member  TEXT NOT NULL,
                score   INTEGER NOT NULL,
                PRIMARY KEY (key, member)
            );

            CREATE INDEX idx_kv_zsets_score ON kv_zsets(key, score);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
