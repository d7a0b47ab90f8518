// SPDX-License-Identifier: MIT
//
// Printer job monitoring against the OS spooler.
//
// Physical printers emit no completion events the application can
// subscribe to; the only portable signal is the spooler's outstanding job
// count for the device.  The monitor polls that count through a
// platform-specific probe and exposes a bounded wait whose expiry is a
// normal, reported outcome — never an error — so the dispatch loop's
// state machine has no unhandled branch.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use printdesk_core::error::Result;

/// One reading from the platform probe.
#[derive(Debug, Clone)]
pub struct ProbeSnapshot {
    /// Jobs the OS reports as outstanding for the printer.
    pub job_count: u32,
    /// Raw probe output, kept for diagnostics.
    pub raw: String,
}

/// Platform-specific mechanism that reports a printer's outstanding OS
/// job count.  Implementations fail with `ProbeUnavailable` when the
/// underlying facility cannot be invoked.
pub trait SpoolerProbe: Send + Sync {
    fn snapshot(&self, printer_name: &str) -> Result<ProbeSnapshot>;
}

/// Observability view of a printer's spooler queue.
#[derive(Debug, Clone)]
pub struct SpoolQueueStatus {
    pub job_count: u32,
    pub busy: bool,
    pub raw: String,
}

/// Outcome of a bounded wait for a printer to drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleWait {
    /// Whether the job count reached zero before the bound elapsed.
    pub finished: bool,
    /// How long the wait actually took.
    pub waited: Duration,
    /// The last observed job count.
    pub final_job_count: u32,
}

/// Polls the OS spooler for a printer's outstanding job count.
#[derive(Clone)]
pub struct PrinterJobMonitor {
    probe: Arc<dyn SpoolerProbe>,
}

impl PrinterJobMonitor {
    pub fn new(probe: Arc<dyn SpoolerProbe>) -> Self {
        Self { probe }
    }

    /// Number of jobs the OS reports as outstanding for the printer.
    pub fn job_count(&self, printer_name: &str) -> Result<u32> {
        Ok(self.probe.snapshot(printer_name)?.job_count)
    }

    /// Whether the OS reports any outstanding jobs for the printer.
    pub fn is_busy(&self, printer_name: &str) -> Result<bool> {
        Ok(self.job_count(printer_name)? > 0)
    }

    /// Full spooler view for dashboards and diagnostics.
    pub fn queue_status(&self, printer_name: &str) -> Result<SpoolQueueStatus> {
        let snapshot = self.probe.snapshot(printer_name)?;
        Ok(SpoolQueueStatus {
            job_count: snapshot.job_count,
            busy: snapshot.job_count > 0,
            raw: snapshot.raw,
        })
    }

    /// Poll until the printer's job count reaches zero or `max_wait`
    /// elapses.
    ///
    /// Timeout is reported through `finished = false`, not an error; with
    /// `max_wait` of zero the first reading decides immediately.  Probe
    /// failures do propagate — the caller decides how to record the
    /// uncertainty.
    pub async fn wait_for_idle(
        &self,
        printer_name: &str,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Result<IdleWait> {
        let started = Instant::now();

        loop {
            let count = self.job_count(printer_name)?;
            let waited = started.elapsed();

            if count == 0 {
                debug!(printer = printer_name, waited_ms = waited.as_millis() as u64, "printer idle");
                return Ok(IdleWait {
                    finished: true,
                    waited,
                    final_job_count: 0,
                });
            }

            if waited >= max_wait {
                warn!(
                    printer = printer_name,
                    waited_ms = waited.as_millis() as u64,
                    job_count = count,
                    "printer did not go idle within the bound"
                );
                return Ok(IdleWait {
                    finished: false,
                    waited,
                    final_job_count: count,
                });
            }

            // Never sleep past the bound.
            let remaining = max_wait - waited;
            tokio::time::sleep(poll_interval.min(remaining)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printdesk_core::error::PrintdeskError;
    use std::sync::Mutex;

    /// Probe that replays a scripted sequence of job counts, holding the
    /// last value once the script is exhausted.
    struct ScriptedProbe {
        counts: Mutex<Vec<u32>>,
    }

    impl ScriptedProbe {
        fn new(counts: &[u32]) -> Arc<Self> {
            Arc::new(Self {
                counts: Mutex::new(counts.to_vec()),
            })
        }
    }

    impl SpoolerProbe for ScriptedProbe {
        fn snapshot(&self, _printer_name: &str) -> Result<ProbeSnapshot> {
            let mut counts = self.counts.lock().expect("script lock");
            let count = if counts.len() > 1 {
                counts.remove(0)
            } else {
                counts.first().copied().unwrap_or(0)
            };
            Ok(ProbeSnapshot {
                job_count: count,
                raw: format!("{count} job(s)"),
            })
        }
    }

    struct DeadProbe;

    impl SpoolerProbe for DeadProbe {
        fn snapshot(&self, _printer_name: &str) -> Result<ProbeSnapshot> {
            Err(PrintdeskError::ProbeUnavailable("lpstat missing".into()))
        }
    }

    #[test]
    fn queue_status_reports_busy() {
        let monitor = PrinterJobMonitor::new(ScriptedProbe::new(&[2]));
        let status = monitor.queue_status("lib-1").expect("status");
        assert_eq!(status.job_count, 2);
        assert!(status.busy);

        let monitor = PrinterJobMonitor::new(ScriptedProbe::new(&[0]));
        assert!(!monitor.is_busy("lib-1").expect("busy"));
    }

    #[test]
    fn probe_failure_surfaces_as_unavailable() {
        let monitor = PrinterJobMonitor::new(Arc::new(DeadProbe));
        let err = monitor.job_count("lib-1").expect_err("should fail");
        assert!(matches!(err, PrintdeskError::ProbeUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_idle_observes_drain() {
        // Counts 2, 2, 1, 0 at successive polls — idle on the fourth
        // reading, 1500ms in at a 500ms poll interval.
        let monitor = PrinterJobMonitor::new(ScriptedProbe::new(&[2, 2, 1, 0]));
        let wait = monitor
            .wait_for_idle(
                "lib-1",
                Duration::from_millis(3000),
                Duration::from_millis(500),
            )
            .await
            .expect("wait");

        assert!(wait.finished);
        assert_eq!(wait.final_job_count, 0);
        assert_eq!(wait.waited, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_idle_times_out_as_an_outcome() {
        let monitor = PrinterJobMonitor::new(ScriptedProbe::new(&[3]));
        let wait = monitor
            .wait_for_idle(
                "lib-1",
                Duration::from_millis(1000),
                Duration::from_millis(400),
            )
            .await
            .expect("wait");

        assert!(!wait.finished);
        assert_eq!(wait.final_job_count, 3);
        assert!(wait.waited >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn zero_bound_returns_immediately() {
        let monitor = PrinterJobMonitor::new(ScriptedProbe::new(&[5]));
        let wait = monitor
            .wait_for_idle("lib-1", Duration::ZERO, Duration::from_millis(100))
            .await
            .expect("wait");
        assert!(!wait.finished);
        assert_eq!(wait.final_job_count, 5);

        let monitor = PrinterJobMonitor::new(ScriptedProbe::new(&[0]));
        let wait = monitor
            .wait_for_idle("lib-1", Duration::ZERO, Duration::from_millis(100))
            .await
            .expect("wait");
        assert!(wait.finished);
    }
}
