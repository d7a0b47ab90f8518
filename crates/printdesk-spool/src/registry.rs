// SPDX-License-Identifier: MIT
//
// The printer resource registry.
//
// Leaf dependency for the rest of the subsystem: identity, location,
// availability state, and capability flags per physical printer.  The
// busy/online flag is driven by the dispatch loop and the termination
// handler; manual status changes are refused while a job is actively
// printing on the device.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use printdesk_core::error::{PrintdeskError, Result};
use printdesk_core::types::{Printer, PrinterStatus};

use crate::store::LedgerStore;

/// Registry over the shared ledger store.  Cheaply cloneable.
#[derive(Clone)]
pub struct PrinterRegistry {
    store: Arc<Mutex<LedgerStore>>,
}

impl PrinterRegistry {
    pub fn new(store: Arc<Mutex<LedgerStore>>) -> Self {
        Self { store }
    }

    /// Register a printer (or replace its record).
    pub fn register(&self, printer: &Printer) -> Result<()> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.upsert_printer(printer)
    }

    /// Look up a printer by name.
    pub fn get(&self, name: &str) -> Result<Option<Printer>> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.get_printer(name)
    }

    /// All registered printers.
    pub fn list(&self) -> Result<Vec<Printer>> {
        let store = self.store.lock().expect("ledger lock poisoned");
        store.list_printers()
    }

    /// Change a printer's availability status.
    ///
    /// Refused with `PrinterBusy` while a ledger entry is printing on the
    /// device — the admin toggle must not yank a printer out from under an
    /// in-flight dispatch.  The dispatch loop and termination handler call
    /// this only after the printing entry has been removed.
    pub fn set_status(&self, name: &str, status: PrinterStatus) -> Result<()> {
        let store = self.store.lock().expect("ledger lock poisoned");

        if let Some(entry) = store.printing_entry_for(name)? {
            warn!(
                printer = name,
                job_id = %entry.job_id,
                "status change refused while printing"
            );
            return Err(PrintdeskError::PrinterBusy(name.to_string()));
        }

        store.set_printer_status(name, status)?;
        info!(printer = name, status = ?status, "printer status changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::QueueManager;
    use printdesk_core::types::{JobSpec, PrintSettings, Priority};

    fn registry_and_manager() -> (PrinterRegistry, QueueManager) {
        let store = Arc::new(Mutex::new(LedgerStore::open_in_memory().expect("open")));
        (
            PrinterRegistry::new(Arc::clone(&store)),
            QueueManager::new(store),
        )
    }

    fn online_printer(name: &str) -> Printer {
        Printer {
            name: name.into(),
            location: "union".into(),
            status: PrinterStatus::Online,
            supports_color: false,
            supports_duplex: true,
        }
    }

    #[test]
    fn register_and_list() {
        let (registry, _) = registry_and_manager();
        registry.register(&online_printer("union-1")).expect("register");
        registry.register(&online_printer("union-2")).expect("register");

        let printers = registry.list().expect("list");
        assert_eq!(printers.len(), 2);
        assert_eq!(printers[0].name, "union-1");
    }

    #[test]
    fn set_status_refused_while_printing() {
        let (registry, mgr) = registry_and_manager();
        registry.register(&online_printer("union-1")).expect("register");

        let job = mgr
            .create_job(JobSpec {
                user_ref: "u-1".into(),
                printer_name: "union-1".into(),
                file_ref: "store/notes.pdf".into(),
                settings: PrintSettings::default(),
                cost_cents: 40,
                fee_exempt: true,
                priority: Priority::Normal,
            })
            .expect("create");
        mgr.enqueue(&job.id).expect("enqueue");
        mgr.mark_printing(&job.id).expect("mark printing");

        let err = registry
            .set_status("union-1", PrinterStatus::Offline)
            .expect_err("should refuse");
        assert!(matches!(err, PrintdeskError::PrinterBusy(_)));

        // Once the job resolves the toggle goes through.
        mgr.complete(&job.id).expect("complete");
        registry
            .set_status("union-1", PrinterStatus::Offline)
            .expect("offline after completion");
    }
}
