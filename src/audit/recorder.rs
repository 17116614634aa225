//! Post-commit audit trail writer.
//!
//! Domain operations hand finished mutations to [`AuditRecorder::record`], which
//! enqueues without waiting. A single background task drains the queue into the
//! store. Queue overflow and write failures are logged and never reach the
//! caller, so the primary operation's result cannot depend on the audit trail.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::repo_types::{AuditAction, AuditEntity, NewAuditEntry};
use crate::db::Store;

enum AuditMessage {
    Entry(NewAuditEntry),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<AuditMessage>,
}

impl AuditRecorder {
    /// Starts the writer task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn Store>, buffer: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(run_writer(store, rx));
        (Self { tx }, handle)
    }

    pub fn record(
        &self,
        actor_id: Uuid,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Uuid,
        details: impl Into<String>,
    ) {
        let entry = NewAuditEntry {
            actor_id,
            action,
            entity,
            entity_id,
            details: details.into(),
        };
        if let Err(e) = self.tx.try_send(AuditMessage::Entry(entry)) {
            let entry = match e {
                mpsc::error::TrySendError::Full(AuditMessage::Entry(entry))
                | mpsc::error::TrySendError::Closed(AuditMessage::Entry(entry)) => Some(entry),
                _ => None,
            };
            if let Some(entry) = entry {
                warn!(
                    action = entry.action.as_str(),
                    entity = entry.entity.as_str(),
                    entity_id = %entry.entity_id,
                    "audit queue unavailable; entry dropped"
                );
            }
        }
    }

    /// Resolves once every entry queued before the call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(AuditMessage::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run_writer(store: Arc<dyn Store>, mut rx: mpsc::Receiver<AuditMessage>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            AuditMessage::Entry(entry) => match store.insert_audit(&entry).await {
                Ok(()) => debug!(
                    action = entry.action.as_str(),
                    entity = entry.entity.as_str(),
                    entity_id = %entry.entity_id,
                    "audit entry written"
                ),
                Err(e) => error!(
                    error = %e,
                    action = entry.action.as_str(),
                    entity_id = %entry.entity_id,
                    "failed to write audit entry"
                ),
            },
            AuditMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("audit writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::repo::AuditRepo;
    use crate::db::memory::MemoryStore;

    #[tokio::test]
    async fn entries_are_persisted_in_order() {
        let store = Arc::new(MemoryStore::default());
        let (audit, _h) = AuditRecorder::spawn(store.clone(), 8);
        let actor = Uuid::new_v4();
        audit.record(actor, AuditAction::Create, AuditEntity::Course, Uuid::new_v4(), "first");
        audit.record(actor, AuditAction::Delete, AuditEntity::Course, Uuid::new_v4(), "second");
        audit.flush().await;

        let rows = store.list_audit(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].details, "second");
        assert_eq!(rows[1].action, "CREATE");
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::default());
        store.fail_audit_writes(true);
        let (audit, _h) = AuditRecorder::spawn(store.clone(), 8);
        audit.record(
            Uuid::new_v4(),
            AuditAction::Upload,
            AuditEntity::CourseMaterial,
            Uuid::new_v4(),
            "lost",
        );
        audit.flush().await;
        assert!(store.list_audit(10).await.unwrap().is_empty());
    }
}
