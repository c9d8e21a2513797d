//! Audit trail for the Latchkey door controller.
//!
//! Every status check of the controller produces an [`AuditRecord`] which is
//! handed to an [`AuditSink`]. The production sink appends CSV lines to a
//! file; the in-memory sink backs tests and dry runs.
//!
//! [`AuditRecord`]: latchkey_core::AuditRecord

pub mod csv_sink;
pub mod error;
pub mod memory;
pub mod sink;

pub use csv_sink::{CsvAuditSink, decode_record, encode_record, read_records};
pub use error::{AuditError, AuditResult};
pub use memory::MemoryAuditSink;
pub use sink::{AnyAuditSink, AuditSink};
