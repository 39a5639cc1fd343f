//! Process lifecycle integration.
//!
//! # Data Flow
//! ```text
//! Listening transition → readiness.rs (one-shot signal to a supervisor)
//! SIGTERM/SIGINT → signals.rs → caller runs Server::close
//! ```
//!
//! # Design Decisions
//! - The readiness signal is emitted exactly once per process
//! - Signal handling lives with the binary; the library never installs
//!   process-global handlers on its own

pub mod readiness;
pub mod signals;
