// SPDX-License-Identifier: MIT
//
// The queue ledger store, backed by SQLite.
//
// Three tables: `jobs` (the submitted work), `queue_entries` (the ordered
// ledger — one row per admitted job), and `printers` (the physical
// resource registry).  The ledger is the single authoritative ordering
// store; printer rows carry no job list, and per-printer views are always
// derived by query.
//
// Position discipline: entries in `Pending` status hold a dense 1-based
// position ordered by (priority rank DESC, admission order).  An entry
// promoted to `Printing` moves to position 0 and the remaining pending
// entries are shifted down, so the pending sequence is exactly `{1..N}`
// at every observable instant.  Every multi-row renumbering runs inside
// one SQLite transaction.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{
    EntryStatus, JobId, JobStatus, PrintJob, Printer, PrinterStatus, Priority, QueueEntry,
    QueueView,
};

/// SQLite schema for the ledger database.
const CREATE_TABLES_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        user_ref TEXT NOT NULL,
        printer_name TEXT NOT NULL,
        file_ref TEXT NOT NULL,
        settings TEXT NOT NULL,
        cost_cents INTEGER NOT NULL,
        payment TEXT NOT NULL,
        fee_exempt INTEGER NOT NULL,
        priority TEXT NOT NULL,
        status TEXT NOT NULL,
        submitted_at TEXT NOT NULL,
        started_at TEXT,
        completed_at TEXT,
        failure_reason TEXT
    );

    CREATE TABLE IF NOT EXISTS queue_entries (
        job_id TEXT PRIMARY KEY,
        printer_name TEXT NOT NULL,
        priority_rank INTEGER NOT NULL,
        position INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS printers (
        name TEXT PRIMARY KEY,
        location TEXT NOT NULL,
        status TEXT NOT NULL,
        supports_color INTEGER NOT NULL,
        supports_duplex INTEGER NOT NULL
    );
"#;

/// Counts for dashboards, computed in one pass over the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Entries waiting in line.
    pub pending: u32,
    /// Entries currently dispatched.
    pub printing: u32,
    /// Active entries per printer name.
    pub per_printer: HashMap<String, u32>,
}

/// The ledger store.
///
/// All methods are synchronous because `rusqlite` does not support async
/// natively; callers in async contexts hold the store behind a mutex and
/// keep lock scopes short.  Mutating multi-row operations take `&mut self`
/// so the renumbering transaction is exclusive by construction.
pub struct LedgerStore {
    conn: Connection,
}

impl LedgerStore {
    /// Open (or create) the ledger database at the given path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| PrintdeskError::Database(format!("open: {e}")))?;

        // WAL mode keeps dashboard reads cheap while the dispatch loop
        // writes, and survives unclean shutdowns more gracefully.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| PrintdeskError::Database(format!("WAL pragma: {e}")))?;

        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(|e| PrintdeskError::Database(format!("create tables: {e}")))?;

        info!("ledger database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PrintdeskError::Database(format!("open in-memory: {e}")))?;

        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(|e| PrintdeskError::Database(format!("create tables: {e}")))?;

        debug!("in-memory ledger database opened");
        Ok(Self { conn })
    }

    // -- Jobs ----------------------------------------------------------------

    /// Insert a newly submitted job.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub fn insert_job(&self, job: &PrintJob) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO jobs (id, user_ref, printer_name, file_ref, settings,
                 cost_cents, payment, fee_exempt, priority, status,
                 submitted_at, started_at, completed_at, failure_reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    job.id.to_string(),
                    job.user_ref,
                    job.printer_name,
                    job.file_ref,
                    encode("settings", &job.settings)?,
                    job.cost_cents,
                    encode("payment", &job.payment)?,
                    job.fee_exempt,
                    encode("priority", &job.priority)?,
                    encode("status", &job.status)?,
                    job.submitted_at.to_rfc3339(),
                    job.started_at.map(|t| t.to_rfc3339()),
                    job.completed_at.map(|t| t.to_rfc3339()),
                    job.failure_reason,
                ],
            )
            .map_err(|e| PrintdeskError::Database(format!("insert job: {e}")))?;

        info!(job_id = %job.id, printer = %job.printer_name, "job recorded");
        Ok(())
    }

    /// Retrieve a single job, or `None` if unknown.
    pub fn get_job(&self, job_id: &JobId) -> Result<Option<PrintJob>> {
        self.conn
            .query_row(
                &format!("{JOB_SELECT} WHERE id = ?1"),
                params![job_id.to_string()],
                row_to_job,
            )
            .optional()
            .map_err(|e| PrintdeskError::Database(format!("get job: {e}")))
    }

    /// Record payment against a job.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn mark_paid(&self, job_id: &JobId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE jobs SET payment = ?1 WHERE id = ?2",
                params![encode("payment", &printdesk_core::PaymentState::Paid)?, job_id.to_string()],
            )
            .map_err(|e| PrintdeskError::Database(format!("mark paid: {e}")))?;

        if rows == 0 {
            return Err(PrintdeskError::JobNotFound(*job_id));
        }
        Ok(())
    }

    /// Flag a refund: payment state moves to `Refunded`.
    pub fn mark_refunded(&self, job_id: &JobId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE jobs SET payment = ?1 WHERE id = ?2",
                params![
                    encode("payment", &printdesk_core::PaymentState::Refunded)?,
                    job_id.to_string()
                ],
            )
            .map_err(|e| PrintdeskError::Database(format!("mark refunded: {e}")))?;

        if rows == 0 {
            return Err(PrintdeskError::JobNotFound(*job_id));
        }
        Ok(())
    }

    // -- Ledger entries ------------------------------------------------------

    /// Admit a job: create its ledger entry at the position dictated by
    /// (priority DESC, admission order) and mark the job `Queued`.
    ///
    /// Entries of equal or lower priority at or after the new position are
    /// shifted +1 so the pending sequence stays dense.  Preconditions
    /// (job pending, paid, no duplicate entry, printer available) are the
    /// queue manager's responsibility.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub fn admit(&mut self, job: &PrintJob) -> Result<QueueEntry> {
        let rank = priority_rank(job.priority);
        let now = Utc::now();
        let pending = encode("status", &EntryStatus::Pending)?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| PrintdeskError::Database(format!("begin admit: {e}")))?;

        let ahead: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM queue_entries
                 WHERE status = ?1 AND priority_rank >= ?2",
                params![pending, rank],
                |row| row.get(0),
            )
            .map_err(|e| PrintdeskError::Database(format!("count ahead: {e}")))?;
        let position = ahead + 1;

        tx.execute(
            "UPDATE queue_entries SET position = position + 1, updated_at = ?1
             WHERE status = ?2 AND position >= ?3",
            params![now.to_rfc3339(), pending, position],
        )
        .map_err(|e| PrintdeskError::Database(format!("shift up: {e}")))?;

        tx.execute(
            "INSERT INTO queue_entries
             (job_id, printer_name, priority_rank, position, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.id.to_string(),
                job.printer_name,
                rank,
                position,
                pending,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| PrintdeskError::Database(format!("insert entry: {e}")))?;

        update_job_status(&tx, &job.id, JobStatus::Queued, None)?;

        tx.commit()
            .map_err(|e| PrintdeskError::Database(format!("commit admit: {e}")))?;

        info!(job_id = %job.id, position, "job admitted to queue");
        Ok(QueueEntry {
            job_id: job.id,
            printer_name: job.printer_name.clone(),
            position,
            status: EntryStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// The ledger entry for a job, if one exists.
    pub fn get_entry(&self, job_id: &JobId) -> Result<Option<QueueEntry>> {
        self.conn
            .query_row(
                &format!("{ENTRY_SELECT} WHERE job_id = ?1"),
                params![job_id.to_string()],
                row_to_entry,
            )
            .optional()
            .map_err(|e| PrintdeskError::Database(format!("get entry: {e}")))
    }

    /// The head-of-line pending entry (position 1), or `None`.
    pub fn head_entry(&self) -> Result<Option<QueueEntry>> {
        self.conn
            .query_row(
                &format!(
                    "{ENTRY_SELECT} WHERE status = ?1 ORDER BY position ASC LIMIT 1"
                ),
                params![encode("status", &EntryStatus::Pending)?],
                row_to_entry,
            )
            .optional()
            .map_err(|e| PrintdeskError::Database(format!("head entry: {e}")))
    }

    /// The printing entry for a printer, if one exists.
    pub fn printing_entry_for(&self, printer_name: &str) -> Result<Option<QueueEntry>> {
        self.conn
            .query_row(
                &format!("{ENTRY_SELECT} WHERE printer_name = ?1 AND status = ?2"),
                params![printer_name, encode("status", &EntryStatus::Printing)?],
                row_to_entry,
            )
            .optional()
            .map_err(|e| PrintdeskError::Database(format!("printing entry: {e}")))
    }

    /// Promote a pending entry to `Printing`.
    ///
    /// One transaction: verifies printer exclusivity (at most one printing
    /// entry per printer), moves the entry to position 0, shifts the
    /// remaining pending entries down so their positions stay `{1..N}`,
    /// marks the job `Printing` with a start timestamp, and marks the
    /// printer `Busy`.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub fn mark_printing(&mut self, job_id: &JobId) -> Result<QueueEntry> {
        let now = Utc::now();
        let pending = encode("status", &EntryStatus::Pending)?;
        let printing = encode("status", &EntryStatus::Printing)?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| PrintdeskError::Database(format!("begin mark_printing: {e}")))?;

        let entry = tx
            .query_row(
                &format!("{ENTRY_SELECT} WHERE job_id = ?1"),
                params![job_id.to_string()],
                row_to_entry,
            )
            .optional()
            .map_err(|e| PrintdeskError::Database(format!("load entry: {e}")))?
            .ok_or(PrintdeskError::JobNotFound(*job_id))?;

        if entry.status != EntryStatus::Pending {
            return Err(PrintdeskError::Database(format!(
                "entry for job {job_id} is {:?}, expected Pending",
                entry.status
            )));
        }

        let already_printing: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM queue_entries WHERE printer_name = ?1 AND status = ?2",
                params![entry.printer_name, printing],
                |row| row.get(0),
            )
            .map_err(|e| PrintdeskError::Database(format!("exclusivity check: {e}")))?;
        if already_printing > 0 {
            return Err(PrintdeskError::PrinterBusy(entry.printer_name.clone()));
        }

        tx.execute(
            "UPDATE queue_entries SET status = ?1, position = 0, updated_at = ?2
             WHERE job_id = ?3",
            params![printing, now.to_rfc3339(), job_id.to_string()],
        )
        .map_err(|e| PrintdeskError::Database(format!("promote entry: {e}")))?;

        tx.execute(
            "UPDATE queue_entries SET position = position - 1, updated_at = ?1
             WHERE status = ?2 AND position > ?3",
            params![now.to_rfc3339(), pending, entry.position],
        )
        .map_err(|e| PrintdeskError::Database(format!("shift down: {e}")))?;

        update_job_status(&tx, job_id, JobStatus::Printing, None)?;

        tx.execute(
            "UPDATE printers SET status = ?1 WHERE name = ?2",
            params![
                encode("status", &PrinterStatus::Busy)?,
                entry.printer_name
            ],
        )
        .map_err(|e| PrintdeskError::Database(format!("mark printer busy: {e}")))?;

        tx.commit()
            .map_err(|e| PrintdeskError::Database(format!("commit mark_printing: {e}")))?;

        debug!(job_id = %job_id, printer = %entry.printer_name, "entry promoted to printing");
        Ok(QueueEntry {
            position: 0,
            status: EntryStatus::Printing,
            updated_at: now,
            ..entry
        })
    }

    /// Remove a job's ledger entry (wherever it is) and move the job to a
    /// terminal status, renumbering the remaining pending entries so the
    /// sequence stays dense.
    ///
    /// Returns whether an entry existed.  Safe to call for jobs whose
    /// entry is already gone — only the job row is touched then.
    #[instrument(skip(self), fields(job_id = %job_id, status = ?final_status))]
    pub fn resolve(
        &mut self,
        job_id: &JobId,
        final_status: JobStatus,
        reason: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now();
        let pending = encode("status", &EntryStatus::Pending)?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| PrintdeskError::Database(format!("begin resolve: {e}")))?;

        let entry = tx
            .query_row(
                &format!("{ENTRY_SELECT} WHERE job_id = ?1"),
                params![job_id.to_string()],
                row_to_entry,
            )
            .optional()
            .map_err(|e| PrintdeskError::Database(format!("load entry: {e}")))?;

        if let Some(ref entry) = entry {
            tx.execute(
                "DELETE FROM queue_entries WHERE job_id = ?1",
                params![job_id.to_string()],
            )
            .map_err(|e| PrintdeskError::Database(format!("delete entry: {e}")))?;

            // A printing entry sits at position 0, outside the pending
            // sequence — nothing to renumber for it.
            if entry.status == EntryStatus::Pending {
                tx.execute(
                    "UPDATE queue_entries SET position = position - 1, updated_at = ?1
                     WHERE status = ?2 AND position > ?3",
                    params![now.to_rfc3339(), pending, entry.position],
                )
                .map_err(|e| PrintdeskError::Database(format!("shift down: {e}")))?;
            }
        }

        update_job_status(&tx, job_id, final_status, reason)?;

        tx.commit()
            .map_err(|e| PrintdeskError::Database(format!("commit resolve: {e}")))?;

        info!(job_id = %job_id, removed = entry.is_some(), "job resolved");
        Ok(entry.is_some())
    }

    /// Ledger entries by position ascending, joined with job and printer
    /// summaries.  Read-only.
    pub fn queue_view(&self, limit: u32) -> Result<Vec<QueueView>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT e.position, e.status, j.id, j.user_ref, j.priority, j.status,
                        p.name, p.status
                 FROM queue_entries e
                 JOIN jobs j ON j.id = e.job_id
                 JOIN printers p ON p.name = e.printer_name
                 ORDER BY e.position ASC
                 LIMIT ?1",
            )
            .map_err(|e| PrintdeskError::Database(format!("prepare queue_view: {e}")))?;

        let rows = stmt
            .query_map(params![limit], |row| {
                let id_str: String = row.get(2)?;
                let uuid = uuid::Uuid::parse_str(&id_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(QueueView {
                    position: row.get(0)?,
                    entry_status: decode(1, &row.get::<_, String>(1)?)?,
                    job_id: JobId(uuid),
                    user_ref: row.get(3)?,
                    priority: decode(4, &row.get::<_, String>(4)?)?,
                    job_status: decode(5, &row.get::<_, String>(5)?)?,
                    printer_name: row.get(6)?,
                    printer_status: decode(7, &row.get::<_, String>(7)?)?,
                })
            })
            .map_err(|e| PrintdeskError::Database(format!("query queue_view: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PrintdeskError::Database(format!("collect queue_view: {e}")))?;

        Ok(rows)
    }

    /// Entry counts by status and per printer.  One pass over the ledger.
    pub fn stats(&self) -> Result<QueueStats> {
        let mut stmt = self
            .conn
            .prepare("SELECT printer_name, status FROM queue_entries")
            .map_err(|e| PrintdeskError::Database(format!("prepare stats: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let printer: String = row.get(0)?;
                let status: EntryStatus = decode(1, &row.get::<_, String>(1)?)?;
                Ok((printer, status))
            })
            .map_err(|e| PrintdeskError::Database(format!("query stats: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PrintdeskError::Database(format!("collect stats: {e}")))?;

        let mut stats = QueueStats::default();
        for (printer, status) in rows {
            match status {
                EntryStatus::Pending => stats.pending += 1,
                EntryStatus::Printing => stats.printing += 1,
                EntryStatus::Done => {}
            }
            *stats.per_printer.entry(printer).or_insert(0) += 1;
        }
        Ok(stats)
    }

    // -- Printers ------------------------------------------------------------

    /// Insert or replace a printer record.
    #[instrument(skip(self, printer), fields(name = %printer.name))]
    pub fn upsert_printer(&self, printer: &Printer) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO printers
                 (name, location, status, supports_color, supports_duplex)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    printer.name,
                    printer.location,
                    encode("status", &printer.status)?,
                    printer.supports_color,
                    printer.supports_duplex,
                ],
            )
            .map_err(|e| PrintdeskError::Database(format!("upsert printer: {e}")))?;

        info!(name = %printer.name, "printer registered");
        Ok(())
    }

    /// Retrieve a printer by name.
    pub fn get_printer(&self, name: &str) -> Result<Option<Printer>> {
        self.conn
            .query_row(
                &format!("{PRINTER_SELECT} WHERE name = ?1"),
                params![name],
                row_to_printer,
            )
            .optional()
            .map_err(|e| PrintdeskError::Database(format!("get printer: {e}")))
    }

    /// All registered printers, by name.
    pub fn list_printers(&self) -> Result<Vec<Printer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PRINTER_SELECT} ORDER BY name ASC"))
            .map_err(|e| PrintdeskError::Database(format!("prepare list printers: {e}")))?;

        stmt.query_map([], row_to_printer)
            .map_err(|e| PrintdeskError::Database(format!("query printers: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PrintdeskError::Database(format!("collect printers: {e}")))
    }

    /// Update a printer's availability status.
    #[instrument(skip(self), fields(name = %name, status = ?status))]
    pub fn set_printer_status(&self, name: &str, status: PrinterStatus) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE printers SET status = ?1 WHERE name = ?2",
                params![encode("status", &status)?, name],
            )
            .map_err(|e| PrintdeskError::Database(format!("set printer status: {e}")))?;

        if rows == 0 {
            return Err(PrintdeskError::PrinterNotFound(name.to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SQL fragments and helpers
// ---------------------------------------------------------------------------

const JOB_SELECT: &str = "SELECT id, user_ref, printer_name, file_ref, settings,
     cost_cents, payment, fee_exempt, priority, status,
     submitted_at, started_at, completed_at, failure_reason
     FROM jobs";

const ENTRY_SELECT: &str = "SELECT job_id, printer_name, position, status, created_at, updated_at
     FROM queue_entries";

const PRINTER_SELECT: &str =
    "SELECT name, location, status, supports_color, supports_duplex FROM printers";

/// Ordering rank for a priority class.  Higher ranks sort ahead.
fn priority_rank(priority: Priority) -> i64 {
    match priority {
        Priority::Normal => 0,
        Priority::High => 1,
    }
}

/// Serialize an enum/struct column to its JSON representation.
fn encode<T: serde::Serialize>(what: &str, value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| PrintdeskError::Database(format!("serialize {what}: {e}")))
}

/// Deserialize a JSON column, mapping failures onto the row error channel.
fn decode<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse an RFC 3339 timestamp column.
fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Update a job's lifecycle status inside an open transaction.
///
/// Sets `started_at` on entry to `Printing` and `completed_at` on any
/// terminal status; a supplied reason overwrites the stored diagnostic.
fn update_job_status(
    conn: &Connection,
    job_id: &JobId,
    status: JobStatus,
    reason: Option<&str>,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let started = matches!(status, JobStatus::Printing).then_some(now.clone());
    let completed = status.is_terminal().then_some(now);

    let rows = conn
        .execute(
            "UPDATE jobs SET status = ?1,
                 started_at = COALESCE(?2, started_at),
                 completed_at = COALESCE(?3, completed_at),
                 failure_reason = COALESCE(?4, failure_reason)
             WHERE id = ?5",
            params![
                encode("status", &status)?,
                started,
                completed,
                reason,
                job_id.to_string()
            ],
        )
        .map_err(|e| PrintdeskError::Database(format!("update job status: {e}")))?;

    if rows == 0 {
        return Err(PrintdeskError::JobNotFound(*job_id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Map a SQLite row to a `PrintJob`.
///
/// Column indices must match `JOB_SELECT`.
fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrintJob> {
    let id_str: String = row.get(0)?;
    let uuid = uuid::Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let started_at: Option<String> = row.get(11)?;
    let completed_at: Option<String> = row.get(12)?;

    Ok(PrintJob {
        id: JobId(uuid),
        user_ref: row.get(1)?,
        printer_name: row.get(2)?,
        file_ref: row.get(3)?,
        settings: decode(4, &row.get::<_, String>(4)?)?,
        cost_cents: row.get(5)?,
        payment: decode(6, &row.get::<_, String>(6)?)?,
        fee_exempt: row.get(7)?,
        priority: decode(8, &row.get::<_, String>(8)?)?,
        status: decode(9, &row.get::<_, String>(9)?)?,
        submitted_at: parse_ts(10, &row.get::<_, String>(10)?)?,
        started_at: started_at.as_deref().map(|s| parse_ts(11, s)).transpose()?,
        completed_at: completed_at.as_deref().map(|s| parse_ts(12, s)).transpose()?,
        failure_reason: row.get(13)?,
    })
}

/// Map a SQLite row to a `QueueEntry`.  Indices match `ENTRY_SELECT`.
fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    let id_str: String = row.get(0)?;
    let uuid = uuid::Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(QueueEntry {
        job_id: JobId(uuid),
        printer_name: row.get(1)?,
        position: row.get(2)?,
        status: decode(3, &row.get::<_, String>(3)?)?,
        created_at: parse_ts(4, &row.get::<_, String>(4)?)?,
        updated_at: parse_ts(5, &row.get::<_, String>(5)?)?,
    })
}

/// Map a SQLite row to a `Printer`.  Indices match `PRINTER_SELECT`.
fn row_to_printer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Printer> {
    Ok(Printer {
        name: row.get(0)?,
        location: row.get(1)?,
        status: decode(2, &row.get::<_, String>(2)?)?,
        supports_color: row.get(3)?,
        supports_duplex: row.get(4)?,
    })
}
