//! SQLite journal of convergence traces.
//!
//! One row per turn, one per cycle, one per applied coupling update. The
//! journal is write-mostly; the summary queries back the `stats` command.

use std::path::Path;

use hyphae_core::time::iso8601_now;
use hyphae_core::{CouplingUpdate, TurnOutcome};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::schema;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnSummary {
    pub id: String,
    pub turn: u64,
    pub source: String,
    pub state: String,
    pub cycles: u32,
    pub target_reached: bool,
    pub target_cycle: Option<u32>,
    pub final_energy: f64,
    pub nexus_count: u32,
    pub best_atom: Option<String>,
    pub learned: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JournalSummary {
    pub turns: u64,
    pub learned_turns: u64,
    pub kairos_rate: f64,
    pub mean_cycles: f64,
    pub coupling_updates: u64,
}

pub struct TraceJournal {
    conn: Connection,
}

impl TraceJournal {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Journal one turn. `source` labels where the activations came from.
    pub fn record(&self, outcome: &TurnOutcome, source: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let trace = &outcome.trace;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO turns (id, turn, source, state, cycles, target_reached, target_cycle,
                                final_energy, final_coherence, final_satisfaction, nexus_count,
                                best_atom, learned, failure, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                id_str,
                outcome.turn as i64,
                source,
                trace.state.as_str(),
                trace.cycle_count() as i64,
                trace.target_reached,
                trace.target_cycle_index.map(|c| c as i64),
                trace.final_energy,
                trace.final_coherence(),
                trace.final_satisfaction(),
                trace.nexuses.len() as i64,
                trace.best().map(|n| n.atom().to_string()),
                outcome.learned(),
                trace.failure,
                iso8601_now(),
            ],
        )?;

        for c in &trace.cycles {
            tx.execute(
                "INSERT INTO cycles (turn_id, cycle, energy_before, energy_after, coherence,
                                     satisfaction, composed, admitted, kairos)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id_str,
                    c.cycle as i64,
                    c.energy_before,
                    c.energy_after,
                    c.coherence,
                    c.satisfaction,
                    c.composed as i64,
                    c.admitted as i64,
                    c.kairos,
                ],
            )?;
        }

        for u in &outcome.updates {
            tx.execute(
                "INSERT INTO coupling_updates (turn_id, organ_a, organ_b, previous, delta, value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id_str, u.organ_a, u.organ_b, u.previous, u.delta, u.value],
            )?;
        }

        tx.commit()?;
        Ok(id)
    }

    pub fn turn_count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Fraction of journaled turns that reached the Kairos window.
    pub fn kairos_rate(&self) -> Result<f64> {
        let rate: Option<f64> = self.conn.query_row(
            "SELECT AVG(target_reached) FROM turns",
            [],
            |row| row.get(0),
        )?;
        Ok(rate.unwrap_or(0.0))
    }

    pub fn summary(&self) -> Result<JournalSummary> {
        let (turns, learned, kairos, cycles): (i64, Option<i64>, Option<f64>, Option<f64>) =
            self.conn.query_row(
                "SELECT COUNT(*), SUM(learned), AVG(target_reached), AVG(cycles) FROM turns",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        let updates: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM coupling_updates", [], |row| row.get(0))?;
        Ok(JournalSummary {
            turns: turns as u64,
            learned_turns: learned.unwrap_or(0) as u64,
            kairos_rate: kairos.unwrap_or(0.0),
            mean_cycles: cycles.unwrap_or(0.0),
            coupling_updates: updates as u64,
        })
    }

    /// Most recent turns, newest first.
    pub fn recent_turns(&self, limit: usize) -> Result<Vec<TurnSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, turn, source, state, cycles, target_reached, target_cycle,
                    final_energy, nexus_count, best_atom, learned, created_at
             FROM turns ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(TurnSummary {
                id: row.get(0)?,
                turn: row.get::<_, i64>(1)? as u64,
                source: row.get(2)?,
                state: row.get(3)?,
                cycles: row.get(4)?,
                target_reached: row.get(5)?,
                target_cycle: row.get(6)?,
                final_energy: row.get(7)?,
                nexus_count: row.get(8)?,
                best_atom: row.get(9)?,
                learned: row.get(10)?,
                created_at: row.get(11)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn updates_for(&self, turn_id: &str) -> Result<Vec<CouplingUpdate>> {
        let mut stmt = self.conn.prepare(
            "SELECT organ_a, organ_b, previous, delta, value
             FROM coupling_updates WHERE turn_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([turn_id], |row| {
            Ok(CouplingUpdate {
                organ_a: row.get(0)?,
                organ_b: row.get(1)?,
                previous: row.get(2)?,
                delta: row.get(3)?,
                value: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Energy after each cycle of one turn, in cycle order.
    pub fn energy_path(&self, turn_id: &str) -> Result<Vec<f64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT energy_after FROM cycles WHERE turn_id = ?1 ORDER BY cycle")?;
        let rows = stmt.query_map([turn_id], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }
}
