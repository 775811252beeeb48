//! SQLite persistence layer.
//!
//! RULE: Only this module talks to the database.
//! The engine calls store methods; nothing else executes SQL.
//!
//! Save payloads are opaque bytes here. Encoding, versioning and rebasing
//! belong to `persistence`.

use crate::{error::SimResult, event::EventLogEntry, types::Tick};
use rusqlite::{params, Connection, OptionalExtension};

/// One stored save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSlot {
    pub slot:     String,
    pub save_id:  String,
    pub codec:    String,
    pub payload:  Vec<u8>,
    pub saved_at: String,
}

pub struct SaveStore {
    conn: Connection,
}

impl SaveStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_save_slots.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, tick, source, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.tick as i64,
                entry.source,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, run_id: &str, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, tick, source, event_type, payload
             FROM event_log WHERE run_id = ?1 AND tick = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, tick as i64], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    tick:       row.get::<_, i64>(2)? as u64,
                    source:     row.get(3)?,
                    event_type: row.get(4)?,
                    payload:    row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str, event_type: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Save slots ─────────────────────────────────────────────

    /// Replace the slot's payload. Returns the new save id.
    pub fn write_slot(&self, slot: &str, payload: &[u8], codec: &str) -> SimResult<String> {
        let save_id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO save_slot (slot, save_id, codec, payload, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(slot) DO UPDATE SET
                save_id = excluded.save_id,
                codec = excluded.codec,
                payload = excluded.payload,
                saved_at = excluded.saved_at",
            params![slot, save_id, codec, payload, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(save_id)
    }

    pub fn read_slot(&self, slot: &str) -> SimResult<Option<SaveSlot>> {
        let found = self
            .conn
            .query_row(
                "SELECT slot, save_id, codec, payload, saved_at FROM save_slot WHERE slot = ?1",
                params![slot],
                |row| {
                    Ok(SaveSlot {
                        slot:     row.get(0)?,
                        save_id:  row.get(1)?,
                        codec:    row.get(2)?,
                        payload:  row.get(3)?,
                        saved_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    pub fn list_slots(&self) -> SimResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT slot FROM save_slot ORDER BY slot ASC")?;
        let slots = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(slots)
    }

    /// Returns whether the slot existed.
    pub fn delete_slot(&self, slot: &str) -> SimResult<bool> {
        let removed = self.conn.execute("DELETE FROM save_slot WHERE slot = ?1", params![slot])?;
        Ok(removed > 0)
    }
}
