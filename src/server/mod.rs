//! Server module containing the AbleMindServer implementation

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::actions::Actions;
use crate::assessment::{AssessmentRun, RunSettings};
use crate::clients::{GuardedModel, LanguageModel};
use crate::config::Config;
use crate::error::{AbleMindError, Result};
use crate::store::SessionStore;

// Submodules
pub mod db;
pub mod router;

/// An active run plus its token, so a run can be cancelled while another
/// task holds its lock
#[derive(Clone)]
pub struct RunHandle {
    pub run: Arc<Mutex<AssessmentRun>>,
    pub cancel: CancellationToken,
}

/// Main AbleMind server implementation
#[derive(Clone)]
pub struct AbleMindServer {
    pub store: Arc<dyn SessionStore>,
    pub model: GuardedModel,
    pub actions: Actions,
    pub runs: Arc<Mutex<LruCache<Uuid, RunHandle>>>, // Bounded set of active runs (LRU)
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AbleMindServer {
    pub fn new(config: Arc<Config>, model: GuardedModel, store: Arc<dyn SessionStore>) -> Self {
        let settings = RunSettings::from_config(&config);
        let shared: Arc<dyn LanguageModel> = Arc::new(model.clone());
        let cache_max =
            NonZeroUsize::new(config.runtime.run_cache_max).unwrap_or(NonZeroUsize::MIN);
        Self {
            actions: Actions::new(shared, store.clone(), &settings),
            store,
            model,
            runs: Arc::new(Mutex::new(LruCache::new(cache_max))),
            config,
            started_at: Instant::now(),
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings::from_config(&self.config)
    }

    /// Register a fresh run; the least recently used run is cancelled when
    /// the cache is full
    pub async fn register_run(&self, run: AssessmentRun) -> (Uuid, RunHandle) {
        let id = run.id();
        let handle = RunHandle {
            cancel: run.cancellation_token(),
            run: Arc::new(Mutex::new(run)),
        };
        let evicted = self.runs.lock().await.push(id, handle.clone());
        if let Some((old_id, old)) = evicted
            && old_id != id
        {
            info!("Run cache full, abandoning run {}", old_id);
            old.cancel.cancel();
        }
        (id, handle)
    }

    pub async fn lookup_run(&self, id: &Uuid) -> Result<RunHandle> {
        self.runs
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AbleMindError::NotFound {
                message: format!("no active run {}", id),
            })
    }

    pub async fn forget_run(&self, id: &Uuid) {
        self.runs.lock().await.pop(id);
    }

    pub async fn active_runs(&self) -> usize {
        self.runs.lock().await.len()
    }
}
