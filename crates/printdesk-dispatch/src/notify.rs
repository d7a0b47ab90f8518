// SPDX-License-Identifier: MIT
//
// Collaborator interfaces for notifications and refunds.
//
// Both are fire-and-forget: the core never blocks on delivery and never
// fails an operation because a collaborator misbehaved.  Implementations
// are expected to swallow and log their own errors.

use tracing::info;

use printdesk_core::types::JobId;

/// A user-visible event emitted by the queue core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Job admitted; carries its assigned queue position.
    Queued { job_id: JobId, position: i64 },
    /// Job physically printed.
    Completed { job_id: JobId },
    /// Job failed (submission error, timeout, probe failure).
    Failed { job_id: JobId, reason: String },
    /// Job force-removed by an administrator.
    Terminated { job_id: JobId, reason: String },
}

/// Notification collaborator — email/SMS/websocket delivery lives outside
/// the core.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: JobEvent);
}

/// Default notifier that records events in the structured log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: JobEvent) {
        info!(?event, "job notification");
    }
}

/// Payment collaborator — informed of refund intent; the core never
/// performs the refund itself.
pub trait RefundSink: Send + Sync {
    fn flag_refund(&self, job_id: JobId, amount_cents: i64, reason: &str);
}

/// Default refund sink that records the intent in the structured log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRefundSink;

impl RefundSink for LogRefundSink {
    fn flag_refund(&self, job_id: JobId, amount_cents: i64, reason: &str) {
        info!(%job_id, amount_cents, reason, "refund flagged");
    }
}
