//! In-process model doubles for unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::{LanguageModel, ModelError, ModelRequest, ModelResponse};

/// Replies with a fixed text, or fails, and records every request
pub(crate) struct CannedModel {
    reply: Result<String, String>,
    delay: Option<Duration>,
    pub(crate) seen: Mutex<Vec<ModelRequest>>,
}

impl CannedModel {
    pub(crate) fn ok(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            reply: Err("connection refused".to_string()),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        self.seen.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(ModelResponse {
                text: text.clone(),
                model: "canned".into(),
                latency_ms: 1,
            }),
            Err(e) => Err(ModelError::Transport(e.clone())),
        }
    }

    fn name(&self) -> String {
        "canned".into()
    }
}

/// Routes by prompt kind so a whole run can be driven by one double
pub(crate) struct RoutedModel {
    pub(crate) challenge: String,
    pub(crate) difficulty: String,
    pub(crate) report: String,
}

impl RoutedModel {
    pub(crate) fn healthy() -> Self {
        Self {
            challenge: r#"{"challengeText": "Which source do you check first?", "options": ["docs", "forum", "colleague"]}"#.into(),
            difficulty: r#"{"newDifficulty": 6, "reason": "Strong answer."}"#.into(),
            report: r#"{"strengths": ["Focus", "Recall", "Speed"], "weaknesses": ["Planning"], "insights": "Steady."}"#.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for RoutedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let text = if request.prompt.contains("newDifficulty") {
            &self.difficulty
        } else if request.prompt.contains("strengths") {
            &self.report
        } else {
            &self.challenge
        };
        Ok(ModelResponse {
            text: text.clone(),
            model: "routed".into(),
            latency_ms: 1,
        })
    }

    fn name(&self) -> String {
        "routed".into()
    }
}

/// Holds every call open for a while and records the most calls seen in
/// flight at once
pub(crate) struct OverlapModel {
    inner: RoutedModel,
    hold: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl OverlapModel {
    pub(crate) fn new(hold: Duration) -> Self {
        Self {
            inner: RoutedModel::healthy(),
            hold,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for OverlapModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        let res = self.inner.generate(request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }

    fn name(&self) -> String {
        "overlap".into()
    }
}
