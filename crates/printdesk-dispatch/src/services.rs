// SPDX-License-Identifier: MIT
//
// Print-shop service facade.
//
// Wires the ledger store, queue manager, printer registry, job monitor,
// dispatch processor, and termination handler together over one data
// directory, and exposes the operations the counter UI and admin tools
// call.  All fields are cheaply cloneable (Arc-wrapped) so the struct can
// be passed into closures and async blocks without lifetime issues.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::info;

use printdesk_core::QueueConfig;
use printdesk_core::error::Result;
use printdesk_core::types::{
    JobId, JobSpec, PrintJob, Printer, PrinterStatus, QueueEntry, QueueView,
};
use printdesk_spool::{LedgerStore, PrinterRegistry, QueueManager, QueueStats};

use crate::monitor::{PrinterJobMonitor, SpoolQueueStatus};
use crate::notify::{JobEvent, LogNotifier, LogRefundSink, Notifier};
use crate::probe::LpstatProbe;
use crate::processor::{DispatchContext, ProcessorStatus, QueueProcessor};
use crate::spooler::LpSpooler;
use crate::terminate::TerminationHandler;

/// Shared services for the print shop subsystem.
#[derive(Clone)]
pub struct PrintShopServices {
    manager: QueueManager,
    registry: PrinterRegistry,
    monitor: PrinterJobMonitor,
    terminator: TerminationHandler,
    processor: Arc<tokio::sync::Mutex<QueueProcessor>>,
    notifier: Arc<dyn Notifier>,
    config: Arc<Mutex<QueueConfig>>,
    data_dir: PathBuf,
}

impl PrintShopServices {
    /// Initialise all services over a data directory.  Call once at
    /// startup.
    ///
    /// Creates the directory if needed, opens the SQLite ledger, and
    /// loads persisted configuration (or defaults).  The dispatch loop
    /// is prepared but not started.
    pub fn init(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = data_dir.into();
        std::fs::create_dir_all(&dir)?;
        info!(path = %dir.display(), "initialising print shop services");

        let store = LedgerStore::open(&dir.join("ledger.db"))?;
        let store = Arc::new(Mutex::new(store));
        let manager = QueueManager::new(Arc::clone(&store));
        let registry = PrinterRegistry::new(store);

        let config = load_config(&dir).unwrap_or_default();

        let monitor = PrinterJobMonitor::new(Arc::new(LpstatProbe));
        let spooler = Arc::new(LpSpooler);
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        let refunds = Arc::new(LogRefundSink);

        let terminator = TerminationHandler::new(
            manager.clone(),
            registry.clone(),
            spooler.clone(),
            refunds,
            Arc::clone(&notifier),
        );

        let processor = QueueProcessor::new(DispatchContext {
            manager: manager.clone(),
            registry: registry.clone(),
            monitor: monitor.clone(),
            spooler,
            notifier: Arc::clone(&notifier),
            config: config.clone(),
        });

        info!("print shop services initialised");

        Ok(Self {
            manager,
            registry,
            monitor,
            terminator,
            processor: Arc::new(tokio::sync::Mutex::new(processor)),
            notifier,
            config: Arc::new(Mutex::new(config)),
            data_dir: dir,
        })
    }

    // -- Jobs -----------------------------------------------------------------

    /// Record a new job submission (job starts in `Pending`).
    pub fn submit_job(&self, spec: JobSpec) -> Result<PrintJob> {
        self.manager.create_job(spec)
    }

    /// Look up a job by id.
    pub fn get_job(&self, job_id: &JobId) -> Result<Option<PrintJob>> {
        self.manager.get_job(job_id)
    }

    /// Record payment against a pending job.
    pub fn mark_paid(&self, job_id: &JobId) -> Result<()> {
        self.manager.mark_paid(job_id)
    }

    /// Admit a job into the queue and notify the submitter of its
    /// position.
    pub fn enqueue(&self, job_id: &JobId) -> Result<QueueEntry> {
        let entry = self.manager.enqueue(job_id)?;
        self.notifier.notify(JobEvent::Queued {
            job_id: *job_id,
            position: entry.position,
        });
        Ok(entry)
    }

    /// Cancel a job that has not started printing.
    pub fn cancel(&self, job_id: &JobId) -> Result<()> {
        self.manager.cancel(job_id)
    }

    /// Mark a job completed and free its ledger slot (idempotent).
    ///
    /// The dispatch loop calls this itself after a successful print; the
    /// pass-through exists for manual reconciliation at the counter.
    pub fn complete(&self, job_id: &JobId) -> Result<()> {
        self.manager.complete(job_id)
    }

    /// Force-remove a job from any non-terminal state, with OS
    /// cancellation and refund flagging as applicable.
    pub fn terminate(&self, job_id: &JobId, reason: &str) -> Result<PrintJob> {
        self.terminator.terminate(job_id, reason)
    }

    // -- Queue inspection -----------------------------------------------------

    /// The queue in position order, joined with job and printer
    /// summaries, capped at the configured listing limit.
    pub fn current_queue(&self) -> Result<Vec<QueueView>> {
        let limit = self.config().queue_view_limit;
        self.manager.current_queue(limit)
    }

    /// Entry counts by status and per printer.
    pub fn stats(&self) -> Result<QueueStats> {
        self.manager.stats()
    }

    /// The head-of-line pending entry, or `None`.
    pub fn next_job(&self) -> Result<Option<QueueEntry>> {
        self.manager.next_job()
    }

    /// A job's current queue position, if it holds an entry.
    pub fn position_of(&self, job_id: &JobId) -> Result<Option<i64>> {
        self.manager.position_of(job_id)
    }

    // -- Dispatch loop --------------------------------------------------------

    /// Start the background dispatch loop.
    pub async fn start_processor(&self) -> ProcessorStatus {
        let mut processor = self.processor.lock().await;
        processor.start();
        processor.status()
    }

    /// Stop the dispatch loop, letting any in-flight dispatch finish.
    pub async fn stop_processor(&self) -> Result<ProcessorStatus> {
        let mut processor = self.processor.lock().await;
        processor.stop().await?;
        Ok(processor.status())
    }

    /// Current processor lifecycle state and last poll time.
    pub async fn processor_status(&self) -> ProcessorStatus {
        self.processor.lock().await.status()
    }

    // -- Printers -------------------------------------------------------------

    /// Register a printer (or replace its record).
    pub fn register_printer(&self, printer: &Printer) -> Result<()> {
        self.registry.register(printer)
    }

    /// All registered printers.
    pub fn printers(&self) -> Result<Vec<Printer>> {
        self.registry.list()
    }

    /// Change a printer's availability (refused while it is printing).
    pub fn set_printer_status(&self, name: &str, status: PrinterStatus) -> Result<()> {
        self.registry.set_status(name, status)
    }

    /// Live OS spooler view of a printer's queue.
    pub fn spool_status(&self, printer_name: &str) -> Result<SpoolQueueStatus> {
        self.monitor.queue_status(printer_name)
    }

    // -- Configuration --------------------------------------------------------

    /// Current configuration snapshot.
    pub fn config(&self) -> QueueConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// Persist new configuration.
    ///
    /// Timing fields take effect for the dispatch loop on its next
    /// start; listing limits apply immediately.
    pub fn save_config(&self, new_config: QueueConfig) -> Result<()> {
        persist_config(&self.data_dir, &new_config)?;
        *self.config.lock().expect("config lock poisoned") = new_config;
        info!("configuration saved");
        Ok(())
    }

    /// The data directory backing the ledger and config.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Install the global tracing subscriber.  Call once from the embedding
/// process before `PrintShopServices::init`; respects `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

// -- Config file persistence -------------------------------------------------

const CONFIG_FILE: &str = "queue.json";

fn load_config(data_dir: &Path) -> Option<QueueConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&data).ok()
}

fn persist_config(data_dir: &Path, config: &QueueConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use printdesk_core::error::PrintdeskError;
    use printdesk_core::types::{
        EntryStatus, JobStatus, PaymentState, PrintSettings, ProcessorState, Priority,
    };

    fn services(dir: &Path) -> PrintShopServices {
        let services = PrintShopServices::init(dir).expect("init");
        services
            .register_printer(&Printer {
                name: "union-2".into(),
                location: "student union".into(),
                status: PrinterStatus::Online,
                supports_color: true,
                supports_duplex: false,
            })
            .expect("printer");
        services
    }

    fn spec() -> JobSpec {
        JobSpec {
            user_ref: "u-42".into(),
            printer_name: "union-2".into(),
            file_ref: "store/lab-report.pdf".into(),
            settings: PrintSettings::default(),
            cost_cents: 120,
            fee_exempt: false,
            priority: Priority::Normal,
        }
    }

    #[test]
    fn submit_pay_enqueue_inspect_cancel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = services(dir.path());

        let job = services.submit_job(spec()).expect("submit");
        assert_eq!(job.status, JobStatus::Pending);

        let err = services.enqueue(&job.id).expect_err("unpaid");
        assert!(matches!(err, PrintdeskError::PaymentRequired(_)));

        services.mark_paid(&job.id).expect("pay");
        let entry = services.enqueue(&job.id).expect("enqueue");
        assert_eq!(entry.position, 1);
        assert_eq!(entry.status, EntryStatus::Pending);

        let view = services.current_queue().expect("view");
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].job_id, job.id);
        assert_eq!(view[0].printer_name, "union-2");

        let stats = services.stats().expect("stats");
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.printing, 0);

        services.cancel(&job.id).expect("cancel");
        assert_eq!(services.position_of(&job.id).expect("pos"), None);
        assert_eq!(
            services.get_job(&job.id).expect("get").expect("found").status,
            JobStatus::Cancelled
        );
    }

    #[test]
    fn terminate_flags_refund_through_the_facade() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = services(dir.path());

        let job = services.submit_job(spec()).expect("submit");
        services.mark_paid(&job.id).expect("pay");
        services.enqueue(&job.id).expect("enqueue");

        let terminated = services
            .terminate(&job.id, "submitted to the wrong printer")
            .expect("terminate");
        assert_eq!(terminated.status, JobStatus::Terminated);
        assert_eq!(terminated.payment, PaymentState::Refunded);
    }

    #[test]
    fn ledger_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job_id = {
            let services = services(dir.path());
            let job = services.submit_job(spec()).expect("submit");
            services.mark_paid(&job.id).expect("pay");
            services.enqueue(&job.id).expect("enqueue");
            job.id
        };

        let services = PrintShopServices::init(dir.path()).expect("reopen");
        assert_eq!(services.position_of(&job_id).expect("pos"), Some(1));
        assert_eq!(services.printers().expect("printers").len(), 1);
    }

    #[test]
    fn config_round_trips_through_the_data_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let services = PrintShopServices::init(dir.path()).expect("init");
            assert_eq!(services.config().poll_interval_secs, 3);

            let mut config = services.config();
            config.poll_interval_secs = 7;
            config.queue_view_limit = 10;
            services.save_config(config).expect("save");
        }

        let services = PrintShopServices::init(dir.path()).expect("reopen");
        assert_eq!(services.config().poll_interval_secs, 7);
        assert_eq!(services.config().queue_view_limit, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn processor_lifecycle_through_the_facade() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = PrintShopServices::init(dir.path()).expect("init");

        assert_eq!(
            services.processor_status().await.state,
            ProcessorState::Stopped
        );

        let status = services.start_processor().await;
        assert_eq!(status.state, ProcessorState::Running);

        // Empty queue: cycles run without touching the OS spooler.
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;

        let status = services.stop_processor().await.expect("stop");
        assert_eq!(status.state, ProcessorState::Stopped);
        assert!(status.last_poll.is_some());
    }
}
