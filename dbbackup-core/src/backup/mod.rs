//! Backup pipeline.
//!
//! - `dump`: dump tool argument construction and process execution
//! - `orchestrator`: per-server dump → encrypt → cleanup state machine
//!
//! # Security
//! - Dump files are created owner-only and streamed to disk, not memory
//! - Plaintext is removed after encryption, and on any failure after the
//!   dump started
//! - The password argument is redacted before the command is logged

mod dump;
mod orchestrator;

pub use dump::{CommandDumpTool, DumpTool, dump_arguments, redact_arguments};
pub use orchestrator::{BackupFiles, BackupOrchestrator, TIMESTAMP_FORMAT, file_timestamp};
