//! Append-only, hash-chained audit store for command submissions.
//!
//! Every call to the gatekeeper facade (allowed, rejected, or failed)
//! lands here as exactly one row. Each row carries a SHA-256 hash of its
//! own canonical content plus the previous row's hash, forming a
//! tamper-evident chain (the first row chains from 64 zeros). Appends are
//! serialized under the connection mutex, so concurrent submissions never
//! interleave a single record's fields.
//!
//! A failed append must never fail the submission itself; callers report
//! append errors on the operational log channel and move on.

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// The hash used for the first record in the chain (no predecessor).
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Fields of one submission attempt, as handed in by the facade.
///
/// Execution-related fields are `None` for submissions that never reached
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRecord {
    pub session_id: String,
    pub candidate: String,
    /// Stable verdict tag: `allowed`, `rejected_malformed`,
    /// `rejected_pattern`, `rejected_whitelist`, or `unknown_os`.
    pub verdict: String,
    /// The whitelist token or blocklist pattern that decided a rejection.
    pub matched_rule: Option<String>,
    /// The sanitized command actually executed.
    pub command: Option<String>,
    pub exit_code: Option<i32>,
    pub timed_out: Option<bool>,
    pub stdout_excerpt: Option<String>,
    pub stderr_excerpt: Option<String>,
    pub stdout_truncated: Option<bool>,
    pub stderr_truncated: Option<bool>,
    pub duration_ms: Option<i64>,
    pub spawn_error: Option<String>,
}

/// A stored audit record, including its position in the hash chain.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub ts: String,
    pub session_id: String,
    pub candidate: String,
    pub verdict: String,
    pub matched_rule: Option<String>,
    pub command: Option<String>,
    pub exit_code: Option<i32>,
    pub timed_out: Option<bool>,
    pub stdout_excerpt: Option<String>,
    pub stderr_excerpt: Option<String>,
    pub stdout_truncated: Option<bool>,
    pub stderr_truncated: Option<bool>,
    pub duration_ms: Option<i64>,
    pub spawn_error: Option<String>,
    pub prev_hash: String,
    pub record_hash: String,
}

/// Canonical serialization used for hashing. Field order is fixed by the
/// struct declaration; changing it invalidates existing chains.
#[derive(Serialize)]
struct CanonicalRecord<'a> {
    ts: &'a str,
    session_id: &'a str,
    candidate: &'a str,
    verdict: &'a str,
    matched_rule: &'a Option<String>,
    command: &'a Option<String>,
    exit_code: Option<i32>,
    timed_out: Option<bool>,
    stdout_excerpt: &'a Option<String>,
    stderr_excerpt: &'a Option<String>,
    stdout_truncated: Option<bool>,
    stderr_truncated: Option<bool>,
    duration_ms: Option<i64>,
    spawn_error: &'a Option<String>,
    prev_hash: &'a str,
}

/// Durable audit store over SQLite.
#[derive(Clone)]
pub struct AuditLog {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLog {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open audit store at {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts TEXT NOT NULL,
                session_id TEXT NOT NULL,
                candidate TEXT NOT NULL,
                verdict TEXT NOT NULL,
                matched_rule TEXT,
                command TEXT,
                exit_code INTEGER,
                timed_out INTEGER,
                stdout_excerpt TEXT,
                stderr_excerpt TEXT,
                stdout_truncated INTEGER,
                stderr_truncated INTEGER,
                duration_ms INTEGER,
                spawn_error TEXT,
                prev_hash TEXT NOT NULL,
                record_hash TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_submissions_session
                ON submissions(session_id);
            CREATE INDEX IF NOT EXISTS idx_submissions_ts
                ON submissions(ts);
            "#,
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append one record. Atomic per record: the chain read and the insert
    /// happen under a single lock acquisition.
    pub fn append(&self, record: SubmissionRecord) -> Result<()> {
        let ts = chrono::Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let prev_hash: String = conn
            .query_row(
                "SELECT record_hash FROM submissions ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let record_hash = hash_record(&ts, &record, &prev_hash)?;

        conn.execute(
            r#"
            INSERT INTO submissions (
                ts, session_id, candidate, verdict, matched_rule, command,
                exit_code, timed_out, stdout_excerpt, stderr_excerpt,
                stdout_truncated, stderr_truncated, duration_ms, spawn_error,
                prev_hash, record_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                ts,
                record.session_id,
                record.candidate,
                record.verdict,
                record.matched_rule,
                record.command,
                record.exit_code,
                record.timed_out,
                record.stdout_excerpt,
                record.stderr_excerpt,
                record.stdout_truncated,
                record.stderr_truncated,
                record.duration_ms,
                record.spawn_error,
                prev_hash,
                record_hash,
            ],
        )?;

        debug!("Audit record appended (verdict: {})", record.verdict);
        Ok(())
    }

    /// Most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT id, ts, session_id, candidate, verdict, matched_rule, command,
                    exit_code, timed_out, stdout_excerpt, stderr_excerpt,
                    stdout_truncated, stderr_truncated, duration_ms, spawn_error,
                    prev_hash, record_hash
             FROM submissions ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Total number of records.
    pub fn count(&self) -> Result<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let count = conn.query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Verify the hash chain from the first record to the last.
    ///
    /// Returns the ids of records whose stored hash does not match a
    /// recomputation, or whose `prev_hash` does not match the predecessor.
    /// Empty means the chain is intact.
    pub fn verify_chain(&self) -> Result<Vec<i64>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT id, ts, session_id, candidate, verdict, matched_rule, command,
                    exit_code, timed_out, stdout_excerpt, stderr_excerpt,
                    stdout_truncated, stderr_truncated, duration_ms, spawn_error,
                    prev_hash, record_hash
             FROM submissions ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], row_to_record)?;

        let mut broken = Vec::new();
        let mut expected_prev = GENESIS_HASH.to_string();

        for row in rows {
            let record = row?;

            let submission = SubmissionRecord {
                session_id: record.session_id.clone(),
                candidate: record.candidate.clone(),
                verdict: record.verdict.clone(),
                matched_rule: record.matched_rule.clone(),
                command: record.command.clone(),
                exit_code: record.exit_code,
                timed_out: record.timed_out,
                stdout_excerpt: record.stdout_excerpt.clone(),
                stderr_excerpt: record.stderr_excerpt.clone(),
                stdout_truncated: record.stdout_truncated,
                stderr_truncated: record.stderr_truncated,
                duration_ms: record.duration_ms,
                spawn_error: record.spawn_error.clone(),
            };
            let recomputed = hash_record(&record.ts, &submission, &record.prev_hash)?;

            if record.prev_hash != expected_prev || record.record_hash != recomputed {
                broken.push(record.id);
            }

            expected_prev = record.record_hash.clone();
        }

        Ok(broken)
    }
}

/// Clip text for storage as an audit excerpt.
pub fn clip_excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        id: row.get(0)?,
        ts: row.get(1)?,
        session_id: row.get(2)?,
        candidate: row.get(3)?,
        verdict: row.get(4)?,
        matched_rule: row.get(5)?,
        command: row.get(6)?,
        exit_code: row.get(7)?,
        timed_out: row.get(8)?,
        stdout_excerpt: row.get(9)?,
        stderr_excerpt: row.get(10)?,
        stdout_truncated: row.get(11)?,
        stderr_truncated: row.get(12)?,
        duration_ms: row.get(13)?,
        spawn_error: row.get(14)?,
        prev_hash: row.get(15)?,
        record_hash: row.get(16)?,
    })
}

fn hash_record(ts: &str, record: &SubmissionRecord, prev_hash: &str) -> Result<String> {
    let canonical = CanonicalRecord {
        ts,
        session_id: &record.session_id,
        candidate: &record.candidate,
        verdict: &record.verdict,
        matched_rule: &record.matched_rule,
        command: &record.command,
        exit_code: record.exit_code,
        timed_out: record.timed_out,
        stdout_excerpt: &record.stdout_excerpt,
        stderr_excerpt: &record.stderr_excerpt,
        stdout_truncated: record.stdout_truncated,
        stderr_truncated: record.stderr_truncated,
        duration_ms: record.duration_ms,
        spawn_error: &record.spawn_error,
        prev_hash,
    };
    let json = serde_json::to_string(&canonical).context("Failed to serialize audit record")?;
    Ok(sha256_hex(json.as_bytes()))
}

/// Compute hex-encoded SHA-256.
fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
