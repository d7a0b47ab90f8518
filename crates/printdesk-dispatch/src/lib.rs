// SPDX-License-Identifier: MIT
//
// Printdesk Dispatch — the background loop that hands queued jobs to the
// OS print spooler one printer at a time, the polling monitor that detects
// physical completion, the administrative termination handler, and the
// service wiring that binds the subsystem together for an embedding
// process (HTTP layer or any RPC layer).

pub mod monitor;
pub mod notify;
pub mod probe;
pub mod processor;
pub mod services;
pub mod spooler;
pub mod terminate;

pub use monitor::{IdleWait, PrinterJobMonitor, ProbeSnapshot, SpoolerProbe};
pub use notify::{JobEvent, LogNotifier, LogRefundSink, Notifier, RefundSink};
pub use probe::LpstatProbe;
pub use processor::{DispatchContext, ProcessorStatus, QueueProcessor};
pub use services::{PrintShopServices, init_tracing};
pub use spooler::{LpSpooler, SpoolerClient};
pub use terminate::TerminationHandler;
