use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS turns (
            id                 TEXT PRIMARY KEY,
            turn               INTEGER NOT NULL,
            source             TEXT NOT NULL DEFAULT '',
            state              TEXT NOT NULL,
            cycles             INTEGER NOT NULL,
            target_reached     INTEGER NOT NULL DEFAULT 0,
            target_cycle       INTEGER,
            final_energy       REAL NOT NULL,
            final_coherence    REAL NOT NULL,
            final_satisfaction REAL NOT NULL,
            nexus_count        INTEGER NOT NULL,
            best_atom          TEXT,
            learned            INTEGER NOT NULL DEFAULT 0,
            failure            TEXT,
            created_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cycles (
            turn_id        TEXT NOT NULL REFERENCES turns(id) ON DELETE CASCADE,
            cycle          INTEGER NOT NULL,
            energy_before  REAL NOT NULL,
            energy_after   REAL NOT NULL,
            coherence      REAL NOT NULL,
            satisfaction   REAL NOT NULL,
            composed       INTEGER NOT NULL,
            admitted       INTEGER NOT NULL,
            kairos         INTEGER NOT NULL,
            PRIMARY KEY (turn_id, cycle)
        );

        CREATE TABLE IF NOT EXISTS coupling_updates (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            turn_id   TEXT NOT NULL REFERENCES turns(id) ON DELETE CASCADE,
            organ_a   TEXT NOT NULL,
            organ_b   TEXT NOT NULL,
            previous  REAL NOT NULL,
            delta     REAL NOT NULL,
            value     REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_turns_created ON turns(created_at);
        CREATE INDEX IF NOT EXISTS idx_updates_turn ON coupling_updates(turn_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        let version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
    }
}
