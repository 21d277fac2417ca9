use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::clients::traits::{LanguageModel, ModelError, ModelRequest, ModelResponse};

/// Wraps a model handle with a hard deadline and a cancellation token so a
/// hung provider cannot stall an assessment run.
#[derive(Clone)]
pub struct GuardedModel {
    inner: Arc<dyn LanguageModel>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl GuardedModel {
    pub fn new(inner: Arc<dyn LanguageModel>, timeout_ms: u64) -> Self {
        Self {
            inner,
            timeout: Duration::from_millis(timeout_ms),
            cancel: CancellationToken::new(),
        }
    }

    /// Same inner model and deadline, bound to a different token
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            inner: self.inner.clone(),
            timeout: self.timeout,
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[async_trait]
impl LanguageModel for GuardedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        if self.cancel.is_cancelled() {
            return Err(ModelError::Cancelled);
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ModelError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.inner.generate(request)) => match res {
                Ok(inner) => inner,
                Err(_) => Err(ModelError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }),
            },
        }
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}
