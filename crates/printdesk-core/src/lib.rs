// SPDX-License-Identifier: MIT
//
// Printdesk — core types, errors, and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::QueueConfig;
pub use error::PrintdeskError;
pub use types::*;
