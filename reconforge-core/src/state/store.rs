//! Persistent session store
//!
//! One rusqlite database holds every session. The connection mutex
//! serializes writes per the store; readers get owned snapshots, so no
//! caller ever observes a half-written turn.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::normalize::Finding;
use crate::state::models::{SessionRecord, SessionSummary, Turn, TurnKind};
use crate::state::run_migrations;
use crate::{Error, Result};

/// Session persistence over a single SQLite database
pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests and ephemeral runs.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Config("session store mutex poisoned".to_string()))
    }

    /// Create a new session and return its id.
    pub fn create(&self) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT INTO sessions (id, started_at, last_activity_at) VALUES (?1, ?2, ?3)",
            params![id, now, now],
        )?;
        Ok(id)
    }

    /// Append a conversation turn. Fails with `SessionNotFound` for ids the
    /// store has never seen.
    pub fn append_turn(
        &self,
        session_id: &str,
        kind: TurnKind,
        content: &str,
        results: Option<&serde_json::Value>,
    ) -> Result<()> {
        let conn = self.conn()?;
        ensure_session(&conn, session_id)?;

        let now = Utc::now().to_rfc3339();
        let results_json = results.map(serde_json::Value::to_string);
        conn.execute(
            "INSERT INTO turns (session_id, kind, content, results, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, kind.as_str(), content, results_json, now],
        )?;
        touch(&conn, session_id, &now)?;
        Ok(())
    }

    /// Append findings to a session's cumulative set.
    pub fn append_findings(&self, session_id: &str, findings: &[Finding]) -> Result<usize> {
        let conn = self.conn()?;
        ensure_session(&conn, session_id)?;

        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;
        for finding in findings {
            let metadata = finding.metadata.as_ref().map(serde_json::Value::to_string);
            conn.execute(
                "INSERT INTO findings
                 (id, session_id, kind, value, source, confidence, metadata, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    Uuid::new_v4().to_string(),
                    session_id,
                    finding.kind.as_str(),
                    finding.value,
                    finding.source,
                    finding.confidence,
                    metadata,
                    now,
                ],
            )?;
            inserted += 1;
        }
        touch(&conn, session_id, &now)?;
        Ok(inserted)
    }

    /// Full snapshot of one session.
    pub fn get(&self, session_id: &str) -> Result<SessionRecord> {
        let conn = self.conn()?;

        let header: Option<(String, String)> = conn
            .query_row(
                "SELECT started_at, last_activity_at FROM sessions WHERE id = ?1",
                [session_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((started_at, last_activity)) = header else {
            return Err(Error::SessionNotFound(session_id.to_string()));
        };

        let mut stmt = conn.prepare(
            "SELECT kind, content, results, created_at FROM turns
             WHERE session_id = ?1 ORDER BY id",
        )?;
        let turns = stmt
            .query_map([session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(kind, content, results, created_at)| {
                Ok(Turn {
                    kind: kind
                        .parse::<TurnKind>()
                        .map_err(Error::Config)?,
                    content,
                    results: results
                        .map(|r| serde_json::from_str(&r))
                        .transpose()?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect::<Result<Vec<Turn>>>()?;

        let mut stmt = conn.prepare(
            "SELECT kind, value, source, confidence, metadata FROM findings
             WHERE session_id = ?1 ORDER BY discovered_at, id",
        )?;
        let findings = stmt
            .query_map([session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(kind, value, source, confidence, metadata)| {
                let mut finding = Finding::new(
                    kind.parse().map_err(Error::Config)?,
                    value,
                    source,
                )
                .with_confidence(confidence);
                if let Some(metadata) = metadata {
                    finding = finding.with_metadata(serde_json::from_str(&metadata)?);
                }
                Ok(finding)
            })
            .collect::<Result<Vec<Finding>>>()?;

        Ok(SessionRecord {
            session_id: session_id.to_string(),
            started_at: parse_timestamp(&started_at)?,
            last_activity: parse_timestamp(&last_activity)?,
            turns,
            findings,
        })
    }

    /// Summaries of all sessions, most recently active first.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.started_at, s.last_activity_at,
                    (SELECT COUNT(*) FROM turns t WHERE t.session_id = s.id),
                    (SELECT COUNT(*) FROM findings f WHERE f.session_id = s.id)
             FROM sessions s ORDER BY s.last_activity_at DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
        .map(|(id, started_at, last_activity, turns, findings)| {
            Ok(SessionSummary {
                session_id: id,
                started_at: parse_timestamp(&started_at)?,
                last_activity: parse_timestamp(&last_activity)?,
                turn_count: turns as usize,
                findings_count: findings as usize,
            })
        })
        .collect()
    }

    /// Delete a session and everything attached to it. Deleting an unknown
    /// id is an error, not a silent success.
    pub fn delete(&self, session_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM turns WHERE session_id = ?1", [session_id])?;
        conn.execute("DELETE FROM findings WHERE session_id = ?1", [session_id])?;
        let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", [session_id])?;
        if removed == 0 {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    /// Remove sessions idle for longer than the given number of days.
    pub fn purge_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM turns WHERE session_id IN
             (SELECT id FROM sessions WHERE last_activity_at < ?1)",
            [&cutoff],
        )?;
        conn.execute(
            "DELETE FROM findings WHERE session_id IN
             (SELECT id FROM sessions WHERE last_activity_at < ?1)",
            [&cutoff],
        )?;
        let removed = conn.execute("DELETE FROM sessions WHERE last_activity_at < ?1", [&cutoff])?;
        Ok(removed)
    }
}

fn ensure_session(conn: &Connection, session_id: &str) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM sessions WHERE id = ?1", [session_id], |row| {
            row.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(Error::SessionNotFound(session_id.to_string()));
    }
    Ok(())
}

fn touch(conn: &Connection, session_id: &str, now: &str) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET last_activity_at = ?1 WHERE id = ?2",
        params![now, session_id],
    )?;
    Ok(())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Config(format!("Invalid timestamp '{value}': {e}")))
}
