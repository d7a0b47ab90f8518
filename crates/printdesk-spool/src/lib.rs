// SPDX-License-Identifier: MIT
//
// Printdesk Spool — the queue ledger (SQLite-backed), the queue manager
// that is its sole mutator, and the printer resource registry.  This crate
// owns every ordering invariant: dense 1-based positions for pending
// entries, priority-before-admission-order placement, one active entry per
// job, and one printing entry per printer.

pub mod manager;
pub mod registry;
pub mod store;

pub use manager::QueueManager;
pub use registry::PrinterRegistry;
pub use store::{LedgerStore, QueueStats};
