// SPDX-License-Identifier: MIT
//
// Unified error types for Printdesk.

use thiserror::Error;

/// Top-level error type for all Printdesk operations.
#[derive(Debug, Error)]
pub enum PrintdeskError {
    // -- Admission errors (rejected synchronously, no state mutation) --
    #[error("job {0} not found")]
    JobNotFound(crate::types::JobId),

    #[error("job {0} already holds a queue entry")]
    DuplicateEntry(crate::types::JobId),

    #[error("job {0} is not admissible from status {1:?}")]
    NotAdmissible(crate::types::JobId, crate::types::JobStatus),

    #[error("job {0} is unpaid and not fee-exempt")]
    PaymentRequired(crate::types::JobId),

    #[error("printer {0} not found")]
    PrinterNotFound(String),

    #[error("printer {name} is {status:?} and cannot accept work")]
    PrinterUnavailable {
        name: String,
        status: crate::types::PrinterStatus,
    },

    // -- Removal / override errors --
    #[error("job {0} is already printing and can only be terminated")]
    NotCancellable(crate::types::JobId),

    #[error("job {id} is already terminal ({status:?})")]
    AlreadyTerminal {
        id: crate::types::JobId,
        status: crate::types::JobStatus,
    },

    // -- Dispatch / resource errors --
    #[error("printer {0} already has a printing entry")]
    PrinterBusy(String),

    #[error("spooler submission failed: {0}")]
    Spooler(String),

    #[error("dispatch loop error: {0}")]
    Dispatch(String),

    // -- Monitoring --
    #[error("spooler probe unavailable: {0}")]
    ProbeUnavailable(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintdeskError>;
