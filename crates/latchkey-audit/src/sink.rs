//! Audit sink abstraction.

#![allow(async_fn_in_trait)]

use latchkey_core::AuditRecord;

use crate::csv_sink::CsvAuditSink;
use crate::error::AuditResult;
use crate::memory::MemoryAuditSink;

/// Append-only destination for audit records.
///
/// Implementations report failures through the returned `Result`; callers
/// decide whether a failed append matters. The lock controller logs it and
/// moves on.
pub trait AuditSink: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be persisted.
    async fn append(&mut self, record: &AuditRecord) -> AuditResult<()>;
}

/// Enum wrapper for sink dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyAuditSink {
    /// CSV trail file.
    Csv(CsvAuditSink),

    /// In-memory trail, for tests and dry runs.
    Memory(MemoryAuditSink),
}

impl AuditSink for AnyAuditSink {
    async fn append(&mut self, record: &AuditRecord) -> AuditResult<()> {
        match self {
            Self::Csv(sink) => sink.append(record).await,
            Self::Memory(sink) => sink.append(record).await,
        }
    }
}

impl From<CsvAuditSink> for AnyAuditSink {
    fn from(sink: CsvAuditSink) -> Self {
        Self::Csv(sink)
    }
}

impl From<MemoryAuditSink> for AnyAuditSink {
    fn from(sink: MemoryAuditSink) -> Self {
        Self::Memory(sink)
    }
}
