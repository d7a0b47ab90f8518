// SPDX-License-Identifier: MIT
//
// Core domain types for the Printdesk queue and dispatch subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a print job.
///
/// `Completed`, `Failed`, `Cancelled`, and `Terminated` are terminal — a
/// job in any of those states no longer holds a ledger entry and never
/// transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Submitted and validated, not yet admitted to the queue.
    Pending,
    /// Admitted — holds a ledger entry with a position.
    Queued,
    /// Handed to the OS spooler, awaiting physical completion.
    Printing,
    /// Physically printed.
    Completed,
    /// Submission or monitoring failed — see the job's failure reason.
    Failed,
    /// Cancelled by the owner before dispatch.
    Cancelled,
    /// Force-removed by an administrator (refund flagged).
    Terminated,
}

impl JobStatus {
    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Terminated
        )
    }
}

/// Payment state of a job, owned by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentState {
    Unpaid,
    Paid,
    /// Refund flagged after an administrative termination.
    Refunded,
}

/// Scheduling priority class. Assigned at submission, immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Normal,
    /// Staff-submitted work — always placed ahead of all normal entries.
    High,
}

/// Print settings carried with a job.
///
/// Opaque to the queue core: values are forwarded to the spooler client
/// unmodified and never interpreted by ordering or dispatch logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSettings {
    pub copies: u32,
    pub color: bool,
    pub duplex: bool,
    pub paper_type: String,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            copies: 1,
            color: false,
            duplex: false,
            paper_type: "a4".into(),
        }
    }
}

/// A unit of print work submitted by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    /// Owning user (opaque reference — user admin lives outside the core).
    pub user_ref: String,
    /// Name of the target physical printer.
    pub printer_name: String,
    /// Opaque reference to the rendered file (path or storage key).
    pub file_ref: String,
    pub settings: PrintSettings,
    /// Quoted cost in cents; used only when flagging refunds.
    pub cost_cents: i64,
    pub payment: PaymentState,
    /// Staff submissions skip the payment precondition.
    pub fee_exempt: bool,
    pub priority: Priority,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Diagnostic recorded on `Failed` / `Terminated`.
    pub failure_reason: Option<String>,
}

/// The caller-supplied part of a job; the rest is filled in at creation.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub user_ref: String,
    pub printer_name: String,
    pub file_ref: String,
    pub settings: PrintSettings,
    pub cost_cents: i64,
    pub fee_exempt: bool,
    pub priority: Priority,
}

impl PrintJob {
    /// Create a new job in `Pending` with an unpaid balance.
    pub fn new(spec: JobSpec) -> Self {
        Self {
            id: JobId::new(),
            user_ref: spec.user_ref,
            printer_name: spec.printer_name,
            file_ref: spec.file_ref,
            settings: spec.settings,
            cost_cents: spec.cost_cents,
            payment: PaymentState::Unpaid,
            fee_exempt: spec.fee_exempt,
            priority: spec.priority,
            status: JobStatus::Pending,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failure_reason: None,
        }
    }
}

/// Availability state of a physical printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterStatus {
    Online,
    Offline,
    Maintenance,
    /// Actively printing a dispatched job.
    Busy,
}

/// A physical printer resource.
///
/// The queue ledger is the only ordering store — the printer record
/// deliberately carries no job list of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Printer {
    pub name: String,
    pub location: String,
    pub status: PrinterStatus,
    pub supports_color: bool,
    pub supports_duplex: bool,
}

/// Status of a queue ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Waiting in line; holds a dense 1-based position.
    Pending,
    /// Currently dispatched; excluded from the pending sequence.
    Printing,
    /// Resolved — retained only transiently before deletion.
    Done,
}

/// One row of the queue ledger: a job's place in line.
///
/// Positions of `Pending` entries are dense and 1-based, ordered by
/// (priority DESC, admission order). A `Printing` entry holds position 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub job_id: JobId,
    pub printer_name: String,
    pub position: i64,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ledger entry joined with its job and printer summaries, as returned
/// by queue listings for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueView {
    pub position: i64,
    pub entry_status: EntryStatus,
    pub job_id: JobId,
    pub user_ref: String,
    pub priority: Priority,
    pub job_status: JobStatus,
    pub printer_name: String,
    pub printer_status: PrinterStatus,
}

/// Lifecycle state of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorState {
    Stopped,
    Running,
}
