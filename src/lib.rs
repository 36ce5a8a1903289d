//! Batch removal of stubborn directory trees.
//!
//! Each directory is first deleted in-process; if that fails, a fixed
//! remediation chain (take ownership, grant full control, clear attributes,
//! forced delete) runs through external commands before moving on.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod ui;
