//! Utilities for inspecting warnings and other non-fatal diagnostics.
//!
//! Story content is authored by hand and loaded in bulk, so almost every
//! problem is reported here instead of aborting the load or the playthrough:
//! the offending line is skipped, the requirement evaluates false, the call
//! becomes a no-op. Hosts should drain the [`Logger`] after loading a batch
//! and after each story execution.

mod logger;
mod message;

pub use logger::Logger;
pub use message::{LogMessage, MessageKind, Warning};
