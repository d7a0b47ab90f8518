// SPDX-License-Identifier: MIT
//
// Administrative job termination.
//
// Termination is the only path that can remove a printing job.  It
// composes several effects — OS cancellation, ledger removal, refund
// flagging, printer restoration, notification — and orders them so the
// ledger write happens before any best-effort step can be skipped.

use std::sync::Arc;

use tracing::{info, warn};

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{JobId, JobStatus, PaymentState, PrintJob, PrinterStatus};
use printdesk_spool::{PrinterRegistry, QueueManager};

use crate::notify::{JobEvent, Notifier, RefundSink};
use crate::spooler::SpoolerClient;

/// Force-removes jobs from any non-terminal state on an administrator's
/// behalf.
#[derive(Clone)]
pub struct TerminationHandler {
    manager: QueueManager,
    registry: PrinterRegistry,
    spooler: Arc<dyn SpoolerClient>,
    refunds: Arc<dyn RefundSink>,
    notifier: Arc<dyn Notifier>,
}

impl TerminationHandler {
    pub fn new(
        manager: QueueManager,
        registry: PrinterRegistry,
        spooler: Arc<dyn SpoolerClient>,
        refunds: Arc<dyn RefundSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            manager,
            registry,
            spooler,
            refunds,
            notifier,
        }
    }

    /// Terminate a job with a recorded reason.
    ///
    /// Valid from any non-terminal state, including `Printing`.  For a
    /// printing job the OS spooler is asked to drop the device's
    /// outstanding work first (best-effort; failure is logged, not
    /// fatal), the ledger slot is freed with renumbering, and the
    /// printer returns to online.  A paid job has a refund flagged to
    /// the payment collaborator and its payment state set to `Refunded`.
    ///
    /// # Errors
    ///
    /// `JobNotFound`, or `AlreadyTerminal` when the job has already
    /// resolved.
    pub fn terminate(&self, job_id: &JobId, reason: &str) -> Result<PrintJob> {
        let job = self
            .manager
            .get_job(job_id)?
            .ok_or(PrintdeskError::JobNotFound(*job_id))?;
        if job.status.is_terminal() {
            return Err(PrintdeskError::AlreadyTerminal {
                id: *job_id,
                status: job.status,
            });
        }

        let was_printing = job.status == JobStatus::Printing;
        if was_printing {
            // The physical page may already be through the fuser; the OS
            // cancel is advisory and its failure must not block removal.
            if let Err(e) = self.spooler.cancel_printer(&job.printer_name) {
                warn!(
                    job_id = %job_id,
                    printer = %job.printer_name,
                    error = %e,
                    "OS cancel failed during termination"
                );
            }
        }

        self.manager.force_remove(job_id, reason)?;

        if job.payment == PaymentState::Paid {
            self.manager.flag_refund(job_id)?;
            self.refunds.flag_refund(*job_id, job.cost_cents, reason);
            info!(job_id = %job_id, amount_cents = job.cost_cents, "refund flagged for terminated job");
        }

        if was_printing {
            self.registry
                .set_status(&job.printer_name, PrinterStatus::Online)?;
        }

        self.notifier.notify(JobEvent::Terminated {
            job_id: *job_id,
            reason: reason.to_string(),
        });

        self.manager
            .get_job(job_id)?
            .ok_or(PrintdeskError::JobNotFound(*job_id))
    }
}
