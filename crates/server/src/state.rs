use std::sync::{Arc, PoisonError, RwLock};

use sentinel_agent::AnalystService;
use sentinel_core::SentinelPipeline;

use crate::bootstrap::AssetSource;

/// Publishes immutable pipeline snapshots. Readers clone the `Arc` and keep
/// it for the whole request; a reload swaps the pointer and never mutates a
/// snapshot in place.
pub struct AssetHandle {
    current: RwLock<Arc<SentinelPipeline>>,
}

impl AssetHandle {
    pub fn new(pipeline: SentinelPipeline) -> Self {
        Self { current: RwLock::new(Arc::new(pipeline)) }
    }

    pub fn snapshot(&self) -> Arc<SentinelPipeline> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the snapshot that was replaced.
    pub fn publish(&self, pipeline: SentinelPipeline) -> Arc<SentinelPipeline> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(pipeline))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub assets: Arc<AssetHandle>,
    pub analyst: Arc<AnalystService>,
    pub source: Arc<AssetSource>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sentinel_core::config::PipelineConfig;
    use sentinel_core::{
        CostBasisStore, ModelRegistry, PolicyTables, PriceHistoryStore, SentinelPipeline,
    };

    use super::AssetHandle;

    fn pipeline(history_limit: usize) -> SentinelPipeline {
        let settings = PipelineConfig { history_limit, ..PipelineConfig::default() };
        SentinelPipeline::new(
            &PolicyTables::default(),
            settings,
            CostBasisStore::default(),
            PriceHistoryStore::default(),
            ModelRegistry::new(),
        )
    }

    #[test]
    fn in_flight_snapshot_survives_publication() {
        let handle = AssetHandle::new(pipeline(180));
        let held = handle.snapshot();

        let replaced = handle.publish(pipeline(30));

        assert!(Arc::ptr_eq(&held, &replaced));
        assert_eq!(held.settings().history_limit, 180);
        assert_eq!(handle.snapshot().settings().history_limit, 30);
    }
}
