// SPDX-License-Identifier: MIT
//
// CUPS-backed spooler probe.
//
// `lpstat -o <printer>` prints one line per outstanding job on the named
// queue and nothing when the queue is empty.  Counting those lines is the
// portable completion signal available on the print shop's CUPS servers.

use std::process::Command;

use tracing::debug;

use printdesk_core::error::{PrintdeskError, Result};

use crate::monitor::{ProbeSnapshot, SpoolerProbe};

/// Probe that shells out to the CUPS `lpstat` tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LpstatProbe;

impl SpoolerProbe for LpstatProbe {
    fn snapshot(&self, printer_name: &str) -> Result<ProbeSnapshot> {
        let output = Command::new("lpstat")
            .arg("-o")
            .arg(printer_name)
            .output()
            .map_err(|e| PrintdeskError::ProbeUnavailable(format!("spawn lpstat: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintdeskError::ProbeUnavailable(format!(
                "lpstat -o {printer_name}: {}",
                stderr.trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout).to_string();
        let job_count = raw.lines().filter(|line| !line.trim().is_empty()).count() as u32;

        debug!(printer = printer_name, job_count, "lpstat probe");
        Ok(ProbeSnapshot { job_count, raw })
    }
}
