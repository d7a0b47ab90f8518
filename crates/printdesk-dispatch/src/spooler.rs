// SPDX-License-Identifier: MIT
//
// OS spooler client.
//
// The dispatch loop only needs two things from the OS: submit a rendered
// file to a named queue (synchronous success/failure) and best-effort
// cancellation of a printer's outstanding work.  Completion is never
// observed here — that is the job monitor's probe.

use std::process::Command;

use tracing::{debug, info};

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::PrintJob;

/// Narrow interface to the OS print spooler.
pub trait SpoolerClient: Send + Sync {
    /// Submit a job's file to its target printer.  Returns the spooler's
    /// request identifier when one is reported.
    fn submit(&self, job: &PrintJob) -> Result<String>;

    /// Best-effort cancellation of all outstanding OS jobs on a printer.
    fn cancel_printer(&self, printer_name: &str) -> Result<()>;
}

/// CUPS command-line spooler client (`lp` / `cancel`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LpSpooler;

impl SpoolerClient for LpSpooler {
    fn submit(&self, job: &PrintJob) -> Result<String> {
        let mut cmd = Command::new("lp");
        cmd.arg("-d")
            .arg(&job.printer_name)
            .arg("-n")
            .arg(job.settings.copies.to_string())
            .arg("-o")
            .arg(format!("media={}", job.settings.paper_type));
        if job.settings.duplex {
            cmd.arg("-o").arg("sides=two-sided-long-edge");
        }
        if !job.settings.color {
            cmd.arg("-o").arg("print-color-mode=monochrome");
        }
        cmd.arg(&job.file_ref);

        debug!(job_id = %job.id, printer = %job.printer_name, "submitting to lp");
        let output = cmd
            .output()
            .map_err(|e| PrintdeskError::Spooler(format!("spawn lp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintdeskError::Spooler(format!(
                "lp -d {}: {}",
                job.printer_name,
                stderr.trim()
            )));
        }

        // lp reports e.g. "request id is lib-1-42 (1 file(s))".
        let request_id = String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .nth(3)
            .unwrap_or("unknown")
            .to_string();

        info!(job_id = %job.id, printer = %job.printer_name, request_id = %request_id, "job submitted to spooler");
        Ok(request_id)
    }

    fn cancel_printer(&self, printer_name: &str) -> Result<()> {
        let output = Command::new("cancel")
            .arg("-a")
            .arg(printer_name)
            .output()
            .map_err(|e| PrintdeskError::Spooler(format!("spawn cancel: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintdeskError::Spooler(format!(
                "cancel -a {printer_name}: {}",
                stderr.trim()
            )));
        }

        info!(printer = printer_name, "outstanding OS jobs cancelled");
        Ok(())
    }
}
