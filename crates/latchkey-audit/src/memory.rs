//! In-memory audit trail.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use latchkey_core::AuditRecord;

use crate::error::{AuditError, AuditResult};
use crate::sink::AuditSink;

/// Audit sink keeping records in memory.
///
/// Clones share the same trail, so a test can hand one clone to the
/// controller and inspect the other.
///
/// # Examples
///
/// ```
/// use latchkey_audit::{AuditSink, MemoryAuditSink};
/// use latchkey_core::{AuditRecord, LockState};
///
/// # #[tokio::main]
/// # async fn main() -> latchkey_audit::AuditResult<()> {
/// let trail = MemoryAuditSink::new();
/// let mut sink = trail.clone();
/// sink.append(&AuditRecord::now(None, LockState::Locked)).await?;
/// assert_eq!(trail.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail with `AuditError::Closed`.
    pub fn fail_appends(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// Copy of every record appended so far, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Most recent record, if any.
    pub fn last(&self) -> Option<AuditRecord> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditSink for MemoryAuditSink {
    async fn append(&mut self, record: &AuditRecord) -> AuditResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Closed);
        }
        self.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_core::{LockState, TagId};

    #[tokio::test]
    async fn test_memory_sink_shared_between_clones() {
        let trail = MemoryAuditSink::new();
        let mut sink = trail.clone();

        sink.append(&AuditRecord::now(None, LockState::Locked))
            .await
            .unwrap();
        sink.append(&AuditRecord::now(
            Some(TagId::new("4742006").unwrap()),
            LockState::Unlocked,
        ))
        .await
        .unwrap();

        assert_eq!(trail.len(), 2);
        assert_eq!(trail.last().unwrap().lock_state, LockState::Unlocked);
    }

    #[tokio::test]
    async fn test_memory_sink_failure() {
        let trail = MemoryAuditSink::new();
        let mut sink = trail.clone();
        trail.fail_appends(true);

        let result = sink.append(&AuditRecord::now(None, LockState::Locked)).await;
        assert!(matches!(result, Err(AuditError::Closed)));
        assert!(trail.is_empty());
    }
}
