use crate::core::config::MapConfig;
use crate::input::capability::InputCapability;
use crate::{MapError, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Shared "unmounted" flag. Every async step checks it after resuming.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(MapError::Aborted)` once aborted
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(MapError::Aborted)
        } else {
            Ok(())
        }
    }
}

/// Everything scoped to one mounted map
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: u64,
    pub config: MapConfig,
    /// Decided once per mount from the host's device hints
    pub capability: InputCapability,
    abort: AbortHandle,
}

impl SessionContext {
    pub fn new(config: MapConfig) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            capability: InputCapability::Pointer,
            abort: AbortHandle::new(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_is_shared_between_clones() {
        let session = SessionContext::new(MapConfig::default());
        let handle = session.abort_handle();
        assert!(handle.check().is_ok());

        handle.abort();
        assert!(session.is_aborted());
        assert!(matches!(session.abort_handle().check(), Err(MapError::Aborted)));
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let a = SessionContext::new(MapConfig::default());
        let b = SessionContext::new(MapConfig::default());
        assert_ne!(a.id, b.id);
    }
}
