// SPDX-License-Identifier: MIT
//
// The queue manager — sole mutator of the ledger.
//
// Every mutating operation takes the store lock once and runs its
// multi-row work inside a single SQLite transaction, so renumbering never
// interleaves with a concurrent admission or removal (single-writer
// discipline).  Reads take the same lock but hold it only for the query.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{
    JobId, JobSpec, JobStatus, PaymentState, PrintJob, PrinterStatus, QueueEntry, QueueView,
};

use crate::store::{LedgerStore, QueueStats};

/// Admission, inspection, and removal operations over the queue ledger.
///
/// Cheaply cloneable; all clones share one store.
#[derive(Clone)]
pub struct QueueManager {
    store: Arc<Mutex<LedgerStore>>,
}

impl QueueManager {
    pub fn new(store: Arc<Mutex<LedgerStore>>) -> Self {
        Self { store }
    }

    // -- Job submission support ---------------------------------------------

    /// Create a job in `Pending` on behalf of the submission source.
    pub fn create_job(&self, spec: JobSpec) -> Result<PrintJob> {
        let job = PrintJob::new(spec);
        let store = self.store.lock().expect("ledger lock poisoned");
        store.insert_job(&job)?;
        Ok(job)
    }

    /// Look up a job by id.
    pub fn get_job(&self, job_id: &JobId) -> Result<Option<PrintJob>> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.get_job(job_id)
    }

    /// Record payment against a job (payment verification happens outside
    /// the core; this only flips the stored state).
    pub fn mark_paid(&self, job_id: &JobId) -> Result<()> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.mark_paid(job_id)
    }

    // -- Admission ------------------------------------------------------------

    /// Admit a pending, paid (or fee-exempt) job into the queue.
    ///
    /// Position is one past the count of pending entries at equal or
    /// higher priority; equal-or-lower entries at or after it shift +1.
    /// High-priority work therefore lands ahead of every normal entry but
    /// behind earlier high-priority admissions.
    ///
    /// # Errors
    ///
    /// `JobNotFound`, `DuplicateEntry`, `NotAdmissible` (wrong lifecycle
    /// state), `PaymentRequired`, `PrinterNotFound`, `PrinterUnavailable`
    /// (offline or in maintenance; a busy printer still accepts queued
    /// work).  No state is mutated on rejection.
    pub fn enqueue(&self, job_id: &JobId) -> Result<QueueEntry> {
        let mut store = self.store.lock().expect("ledger lock poisoned");

        let job = store
            .get_job(job_id)?
            .ok_or(PrintdeskError::JobNotFound(*job_id))?;

        if store.get_entry(job_id)?.is_some() {
            return Err(PrintdeskError::DuplicateEntry(*job_id));
        }
        if job.status != JobStatus::Pending {
            return Err(PrintdeskError::NotAdmissible(*job_id, job.status));
        }
        if job.payment != PaymentState::Paid && !job.fee_exempt {
            return Err(PrintdeskError::PaymentRequired(*job_id));
        }

        let printer = store
            .get_printer(&job.printer_name)?
            .ok_or_else(|| PrintdeskError::PrinterNotFound(job.printer_name.clone()))?;
        if matches!(
            printer.status,
            PrinterStatus::Offline | PrinterStatus::Maintenance
        ) {
            return Err(PrintdeskError::PrinterUnavailable {
                name: printer.name,
                status: printer.status,
            });
        }

        let entry = store.admit(&job)?;
        info!(job_id = %job_id, position = entry.position, "job enqueued");
        Ok(entry)
    }

    // -- Inspection -----------------------------------------------------------

    /// Ledger entries by position ascending, joined with job and printer
    /// summaries, up to `limit` rows.  Read-only.
    pub fn current_queue(&self, limit: u32) -> Result<Vec<QueueView>> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.queue_view(limit)
    }

    /// Entry counts by status and per printer.
    pub fn stats(&self) -> Result<QueueStats> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.stats()
    }

    /// The pending entry at the head of the line, or `None`.  Pure read.
    pub fn next_job(&self) -> Result<Option<QueueEntry>> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.head_entry()
    }

    /// A job's current queue position, if it holds an entry.
    pub fn position_of(&self, job_id: &JobId) -> Result<Option<i64>> {
        let store = self.store.lock().expect("ledger lock poisoned");
        Ok(store.get_entry(job_id)?.map(|e| e.position))
    }

    // -- Dispatch transitions -------------------------------------------------

    /// Promote the job's entry to `Printing` (dispatch loop only).
    ///
    /// Enforces printer exclusivity and keeps the pending positions dense
    /// by shifting the remaining entries down.
    pub fn mark_printing(&self, job_id: &JobId) -> Result<QueueEntry> {
        let mut store = self.store.lock().expect("ledger lock poisoned");
        store.mark_printing(job_id)
    }

    // -- Removal --------------------------------------------------------------

    /// Remove the job's entry and mark the job `Completed`.
    ///
    /// Idempotent: completing an already-terminal job is a no-op, not an
    /// error.  Remaining pending entries are renumbered to stay dense.
    pub fn complete(&self, job_id: &JobId) -> Result<()> {
        let mut store = self.store.lock().expect("ledger lock poisoned");

        let job = store
            .get_job(job_id)?
            .ok_or(PrintdeskError::JobNotFound(*job_id))?;
        if job.status.is_terminal() {
            debug!(job_id = %job_id, status = ?job.status, "complete on terminal job — no-op");
            return Ok(());
        }

        store.resolve(job_id, JobStatus::Completed, None)?;
        Ok(())
    }

    /// Remove the job's entry and mark the job `Failed` with a diagnostic.
    ///
    /// Shares the removal/renumbering path with [`complete`](Self::complete)
    /// so a failed job can never leak a stuck ledger slot.
    pub fn fail(&self, job_id: &JobId, reason: &str) -> Result<()> {
        let mut store = self.store.lock().expect("ledger lock poisoned");

        let job = store
            .get_job(job_id)?
            .ok_or(PrintdeskError::JobNotFound(*job_id))?;
        if job.status.is_terminal() {
            debug!(job_id = %job_id, status = ?job.status, "fail on terminal job — no-op");
            return Ok(());
        }

        store.resolve(job_id, JobStatus::Failed, Some(reason))?;
        Ok(())
    }

    /// Force-remove a job on behalf of the termination handler.
    ///
    /// Bypasses the `cancel` lifecycle restriction: valid from any
    /// non-terminal state, including `Printing`.  The entry is removed
    /// with the usual renumbering and the job lands in `Terminated`.
    pub fn force_remove(&self, job_id: &JobId, reason: &str) -> Result<()> {
        let mut store = self.store.lock().expect("ledger lock poisoned");

        let job = store
            .get_job(job_id)?
            .ok_or(PrintdeskError::JobNotFound(*job_id))?;
        if job.status.is_terminal() {
            return Err(PrintdeskError::AlreadyTerminal {
                id: *job_id,
                status: job.status,
            });
        }

        store.resolve(job_id, JobStatus::Terminated, Some(reason))?;
        info!(job_id = %job_id, reason, "job terminated");
        Ok(())
    }

    /// Flip a paid job's payment state to `Refunded` once the refund has
    /// been flagged to the payment collaborator.
    pub fn flag_refund(&self, job_id: &JobId) -> Result<()> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.mark_refunded(job_id)
    }

    /// Cancel a job that has not started printing.
    ///
    /// Valid only while the job is `Pending` or `Queued`; a printing job
    /// can only be removed through the termination handler.
    pub fn cancel(&self, job_id: &JobId) -> Result<()> {
        let mut store = self.store.lock().expect("ledger lock poisoned");

        let job = store
            .get_job(job_id)?
            .ok_or(PrintdeskError::JobNotFound(*job_id))?;
        match job.status {
            JobStatus::Pending | JobStatus::Queued => {}
            JobStatus::Printing => return Err(PrintdeskError::NotCancellable(*job_id)),
            status => {
                return Err(PrintdeskError::AlreadyTerminal {
                    id: *job_id,
                    status,
                });
            }
        }

        store.resolve(job_id, JobStatus::Cancelled, None)?;
        info!(job_id = %job_id, "job cancelled");
        Ok(())
    }
}
