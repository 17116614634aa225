use std::sync::Arc;

use crate::audit::AuditRecorder;
use crate::config::AppConfig;
use crate::db::{PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub audit: AuditRecorder,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store = PgStore::connect(&config).await?;
        store.migrate().await?;

        Ok(Self::from_parts(Arc::new(store), Arc::new(config)))
    }

    /// Wires a store and config together and starts the audit writer.
    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        let (audit, _writer) = AuditRecorder::spawn(store.clone(), config.audit_buffer);
        Self {
            store,
            config,
            audit,
        }
    }

    #[cfg(test)]
    pub fn fake() -> (Self, Arc<crate::db::memory::MemoryStore>) {
        let memory = Arc::new(crate::db::memory::MemoryStore::default());
        let state = Self::from_parts(memory.clone(), Arc::new(AppConfig::for_tests()));
        (state, memory)
    }
}
