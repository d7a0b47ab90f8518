// SPDX-License-Identifier: MIT
//
// The queue processor — a long-lived cooperative dispatch loop.
//
// Each cycle takes the single head-of-line pending entry, hands it to the
// OS spooler, and waits (bounded) for the printer to drain before anything
// else is dispatched to that printer.  Printer exclusivity is therefore
// structural: a second job cannot start on a device until the monitor has
// resolved the first.
//
// Every failure inside a cycle is local recovery: the job is marked
// failed, its ledger slot is freed with renumbering, the printer returns
// to online, and the loop keeps going.  `stop()` is non-preemptive — an
// in-flight dispatch finishes, no new one is scheduled.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use printdesk_core::QueueConfig;
use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{PrinterStatus, ProcessorState};
use printdesk_spool::{PrinterRegistry, QueueManager};

use crate::monitor::PrinterJobMonitor;
use crate::notify::{JobEvent, Notifier};
use crate::spooler::SpoolerClient;

/// Everything a dispatch cycle needs, shared with the loop task.
#[derive(Clone)]
pub struct DispatchContext {
    pub manager: QueueManager,
    pub registry: PrinterRegistry,
    pub monitor: PrinterJobMonitor,
    pub spooler: Arc<dyn SpoolerClient>,
    pub notifier: Arc<dyn Notifier>,
    pub config: QueueConfig,
}

/// Snapshot of the processor's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorStatus {
    pub state: ProcessorState,
    pub last_poll: Option<DateTime<Utc>>,
}

/// The dispatch loop handle.
///
/// Constructed once at process start and owned explicitly — there is no
/// ambient global processor state.
pub struct QueueProcessor {
    ctx: Arc<DispatchContext>,
    state: ProcessorState,
    /// Signals the loop task to exit after its current cycle.
    shutdown: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    last_poll: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl QueueProcessor {
    /// Create a processor in `Stopped` state.
    pub fn new(ctx: DispatchContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            state: ProcessorState::Stopped,
            shutdown: Arc::new(Notify::new()),
            task_handle: None,
            last_poll: Arc::new(Mutex::new(None)),
        }
    }

    /// Current lifecycle state plus the time of the last poll cycle.
    pub fn status(&self) -> ProcessorStatus {
        ProcessorStatus {
            state: self.state,
            last_poll: *self.last_poll.lock().expect("last_poll lock poisoned"),
        }
    }

    /// Start the dispatch loop.  Idempotent while running.
    pub fn start(&mut self) {
        if self.state == ProcessorState::Running {
            debug!("dispatch loop already running");
            return;
        }

        let ctx = Arc::clone(&self.ctx);
        let shutdown = Arc::clone(&self.shutdown);
        let last_poll = Arc::clone(&self.last_poll);

        let handle = tokio::spawn(async move {
            run_loop(ctx, shutdown, last_poll).await;
        });

        self.task_handle = Some(handle);
        self.state = ProcessorState::Running;
        info!("dispatch loop started");
    }

    /// Stop the dispatch loop.
    ///
    /// Signals the task to exit and awaits it; an in-flight dispatch
    /// (including its bounded idle wait) is allowed to finish.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state != ProcessorState::Running {
            return Ok(());
        }

        self.shutdown.notify_one();
        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| PrintdeskError::Dispatch(format!("task join: {e}")))?;
        }

        self.state = ProcessorState::Stopped;
        info!("dispatch loop stopped");
        Ok(())
    }
}

/// The loop body: sleep, poll, dispatch, repeat until shutdown.
async fn run_loop(
    ctx: Arc<DispatchContext>,
    shutdown: Arc<Notify>,
    last_poll: Arc<Mutex<Option<DateTime<Utc>>>>,
) {
    let interval = ctx.config.poll_interval();

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("dispatch loop received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(interval) => {
                *last_poll.lock().expect("last_poll lock poisoned") = Some(Utc::now());
                if let Err(e) = run_cycle(&ctx).await {
                    // Cycle-level errors are logged and the loop carries
                    // on; per-job failures are already resolved inside.
                    warn!(error = %e, "dispatch cycle error");
                }
            }
        }
    }
}

/// One dispatch cycle: at most one job leaves the queue.
async fn run_cycle(ctx: &DispatchContext) -> Result<()> {
    let Some(entry) = ctx.manager.next_job()? else {
        return Ok(());
    };

    let printer = ctx
        .registry
        .get(&entry.printer_name)?
        .ok_or_else(|| PrintdeskError::PrinterNotFound(entry.printer_name.clone()))?;
    if printer.status != PrinterStatus::Online {
        debug!(
            printer = %printer.name,
            status = ?printer.status,
            "head-of-line printer not online — waiting"
        );
        return Ok(());
    }

    // Promotes the entry, marks the job printing, and flips the printer
    // to busy, all in one ledger transaction.
    ctx.manager.mark_printing(&entry.job_id)?;
    let job = ctx
        .manager
        .get_job(&entry.job_id)?
        .ok_or(PrintdeskError::JobNotFound(entry.job_id))?;

    if let Err(e) = ctx.spooler.submit(&job) {
        // Local recovery: free the slot, restore the printer, move on.
        let reason = format!("spooler submission failed: {e}");
        warn!(job_id = %job.id, printer = %job.printer_name, error = %e, "submission failed");
        resolve_failed(ctx, &job.id, &job.printer_name, reason)?;
        return Ok(());
    }

    let wait = ctx
        .monitor
        .wait_for_idle(
            &job.printer_name,
            ctx.config.monitor_max_wait(),
            ctx.config.monitor_poll_interval(),
        )
        .await;

    match wait {
        Ok(wait) if wait.finished => {
            ctx.manager.complete(&job.id)?;
            ctx.registry
                .set_status(&job.printer_name, PrinterStatus::Online)?;
            info!(job_id = %job.id, printer = %job.printer_name, "job completed");
            ctx.notifier.notify(JobEvent::Completed { job_id: job.id });
        }
        Ok(wait) => {
            // The physical printer may or may not have finished — record
            // the uncertainty rather than leak a stuck ledger slot.
            let reason = format!(
                "printer did not go idle within {}ms ({} job(s) still reported)",
                wait.waited.as_millis(),
                wait.final_job_count
            );
            resolve_failed(ctx, &job.id, &job.printer_name, reason)?;
        }
        Err(e) => {
            let reason = format!("completion probe failed: {e}");
            resolve_failed(ctx, &job.id, &job.printer_name, reason)?;
        }
    }

    Ok(())
}

/// Shared failure path: job failed with a diagnostic, ledger slot freed
/// (with renumbering), printer restored, user notified.
fn resolve_failed(
    ctx: &DispatchContext,
    job_id: &printdesk_core::JobId,
    printer_name: &str,
    reason: String,
) -> Result<()> {
    ctx.manager.fail(job_id, &reason)?;
    ctx.registry.set_status(printer_name, PrinterStatus::Online)?;
    ctx.notifier.notify(JobEvent::Failed {
        job_id: *job_id,
        reason,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{ProbeSnapshot, SpoolerProbe};
    use printdesk_core::types::{JobId, JobSpec, JobStatus, PrintJob, PrintSettings, Printer, Priority};
    use printdesk_spool::LedgerStore;

    struct FixedProbe {
        count: u32,
    }

    impl SpoolerProbe for FixedProbe {
        fn snapshot(&self, _printer_name: &str) -> Result<ProbeSnapshot> {
            Ok(ProbeSnapshot {
                job_count: self.count,
                raw: String::new(),
            })
        }
    }

    struct FakeSpooler {
        fail: bool,
        submissions: Mutex<Vec<JobId>>,
    }

    impl FakeSpooler {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                submissions: Mutex::new(Vec::new()),
            })
        }
    }

    impl SpoolerClient for FakeSpooler {
        fn submit(&self, job: &PrintJob) -> Result<String> {
            self.submissions.lock().expect("lock").push(job.id);
            if self.fail {
                Err(PrintdeskError::Spooler("device rejected the file".into()))
            } else {
                Ok(format!("{}-1", job.printer_name))
            }
        }

        fn cancel_printer(&self, _printer_name: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<JobEvent>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: JobEvent) {
            self.events.lock().expect("lock").push(event);
        }
    }

    fn context(
        spooler: Arc<FakeSpooler>,
        probe_count: u32,
        notifier: Arc<RecordingNotifier>,
    ) -> DispatchContext {
        let store = Arc::new(Mutex::new(LedgerStore::open_in_memory().expect("open")));
        let manager = QueueManager::new(Arc::clone(&store));
        let registry = PrinterRegistry::new(store);
        registry
            .register(&Printer {
                name: "lib-1".into(),
                location: "library".into(),
                status: PrinterStatus::Online,
                supports_color: true,
                supports_duplex: true,
            })
            .expect("printer");

        DispatchContext {
            manager,
            registry,
            monitor: PrinterJobMonitor::new(Arc::new(FixedProbe { count: probe_count })),
            spooler,
            notifier,
            config: QueueConfig {
                poll_interval_secs: 1,
                monitor_max_wait_ms: 200,
                monitor_poll_interval_ms: 50,
                queue_view_limit: 50,
            },
        }
    }

    fn enqueue_job(ctx: &DispatchContext) -> PrintJob {
        let job = ctx
            .manager
            .create_job(JobSpec {
                user_ref: "u-1".into(),
                printer_name: "lib-1".into(),
                file_ref: "store/slides.pdf".into(),
                settings: PrintSettings::default(),
                cost_cents: 80,
                fee_exempt: true,
                priority: Priority::Normal,
            })
            .expect("create");
        ctx.manager.enqueue(&job.id).expect("enqueue");
        job
    }

    #[tokio::test(start_paused = true)]
    async fn loop_dispatches_and_completes_jobs() {
        let spooler = FakeSpooler::new(false);
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(Arc::clone(&spooler), 0, Arc::clone(&notifier));
        let j1 = enqueue_job(&ctx);
        let j2 = enqueue_job(&ctx);

        let mut processor = QueueProcessor::new(ctx.clone());
        processor.start();
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        processor.stop().await.expect("stop");

        for job in [&j1, &j2] {
            let found = ctx.manager.get_job(&job.id).expect("get").expect("found");
            assert_eq!(found.status, JobStatus::Completed);
            assert!(found.started_at.is_some());
            assert_eq!(ctx.manager.position_of(&job.id).expect("pos"), None);
        }
        assert_eq!(spooler.submissions.lock().expect("lock").len(), 2);
        assert_eq!(
            ctx.registry.get("lib-1").expect("get").expect("p").status,
            PrinterStatus::Online
        );

        let events = notifier.events.lock().expect("lock");
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, JobEvent::Completed { .. }))
                .count(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn submission_failure_is_local_recovery() {
        let spooler = FakeSpooler::new(true);
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(Arc::clone(&spooler), 0, Arc::clone(&notifier));
        let j1 = enqueue_job(&ctx);
        let j2 = enqueue_job(&ctx);

        let mut processor = QueueProcessor::new(ctx.clone());
        processor.start();
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        processor.stop().await.expect("stop");

        // Both jobs were attempted — the first failure did not wedge the
        // loop — and both resolved to Failed with the slot freed.
        assert_eq!(spooler.submissions.lock().expect("lock").len(), 2);
        for job in [&j1, &j2] {
            let found = ctx.manager.get_job(&job.id).expect("get").expect("found");
            assert_eq!(found.status, JobStatus::Failed);
            assert!(
                found
                    .failure_reason
                    .as_deref()
                    .expect("reason")
                    .contains("submission failed")
            );
        }
        assert_eq!(
            ctx.registry.get("lib-1").expect("get").expect("p").status,
            PrinterStatus::Online
        );
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_timeout_records_uncertainty() {
        // Probe always reports one outstanding job — the wait bound
        // expires and the job is failed with a diagnostic, never stuck.
        let spooler = FakeSpooler::new(false);
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(spooler, 1, Arc::clone(&notifier));
        let job = enqueue_job(&ctx);

        let mut processor = QueueProcessor::new(ctx.clone());
        processor.start();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        processor.stop().await.expect("stop");

        let found = ctx.manager.get_job(&job.id).expect("get").expect("found");
        assert_eq!(found.status, JobStatus::Failed);
        assert!(
            found
                .failure_reason
                .as_deref()
                .expect("reason")
                .contains("did not go idle")
        );
        assert_eq!(ctx.manager.position_of(&job.id).expect("pos"), None);
        assert_eq!(
            ctx.registry.get("lib-1").expect("get").expect("p").status,
            PrinterStatus::Online
        );
    }

    #[tokio::test(start_paused = true)]
    async fn offline_printer_defers_dispatch() {
        let spooler = FakeSpooler::new(false);
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(Arc::clone(&spooler), 0, notifier);
        let job = enqueue_job(&ctx);
        ctx.registry
            .set_status("lib-1", PrinterStatus::Offline)
            .expect("offline");

        let mut processor = QueueProcessor::new(ctx.clone());
        processor.start();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        processor.stop().await.expect("stop");

        assert!(spooler.submissions.lock().expect("lock").is_empty());
        assert_eq!(ctx.manager.position_of(&job.id).expect("pos"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn status_reflects_lifecycle() {
        let spooler = FakeSpooler::new(false);
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(spooler, 0, notifier);

        let mut processor = QueueProcessor::new(ctx);
        assert_eq!(processor.status().state, ProcessorState::Stopped);
        assert!(processor.status().last_poll.is_none());

        processor.start();
        assert_eq!(processor.status().state, ProcessorState::Running);

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        processor.stop().await.expect("stop");
        assert_eq!(processor.status().state, ProcessorState::Stopped);
        assert!(processor.status().last_poll.is_some());

        // Stopping twice is harmless.
        processor.stop().await.expect("second stop");
    }
}
