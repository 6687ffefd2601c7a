//! Inputs of [`super::Orchestrator`]: settings, fallback credentials, per-call options and
//! cancellation.

use crate::context::{DEFAULT_EXCERPT_BUDGET, DEFAULT_TARGET_COLUMNS};
use crate::providers::ProviderId;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

/// Per-call timeout applied when neither configuration nor the caller picks one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Provider used when the caller names none.
    pub default_provider: ProviderId,
    /// Per-excerpt character budget.
    pub excerpt_budget: usize,
    /// Column names eligible for deterministic ordering.
    pub target_columns: Vec<String>,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Base URL overrides keyed by provider.
    pub base_urls: HashMap<ProviderId, String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            default_provider: ProviderId::Perplexity,
            excerpt_budget: DEFAULT_EXCERPT_BUDGET,
            target_columns: DEFAULT_TARGET_COLUMNS.iter().map(|c| c.to_string()).collect(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            base_urls: HashMap::new(),
        }
    }
}

/// Process-wide credentials used when the caller brings no key.
#[derive(Clone, Default)]
pub struct FallbackCredentials {
    keys: HashMap<ProviderId, String>,
}

impl FallbackCredentials {
    /// Empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Self::insert`].
    pub fn with_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.insert(provider, key);
        self
    }

    /// Register the fallback key for `provider`. Blank keys are ignored.
    pub fn insert(&mut self, provider: ProviderId, key: impl Into<String>) {
        let key = key.into();
        let key = key.trim();
        if !key.is_empty() {
            self.keys.insert(provider, key.to_string());
        }
    }

    /// Fallback key for `provider`, if any.
    pub fn get(&self, provider: ProviderId) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// Whether a fallback key exists for `provider`.
    pub fn contains(&self, provider: ProviderId) -> bool {
        self.keys.contains_key(&provider)
    }
}

impl fmt::Debug for FallbackCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<&str> = self.keys.keys().map(|id| id.as_str()).collect();
        providers.sort_unstable();
        f.debug_struct("FallbackCredentials")
            .field("providers", &providers)
            .finish()
    }
}

/// Per-call overrides. Blank strings count as absent.
#[derive(Clone, Default)]
pub struct AnswerOptions {
    /// Provider identifier; the configured default when absent.
    pub provider: Option<String>,
    /// Model identifier; the descriptor default when absent.
    pub model: Option<String>,
    /// Caller key; takes precedence over the fallback credential.
    pub credential: Option<String>,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// Cancellation signal observed before and during dispatch.
    pub cancel: Option<CancelSignal>,
}

impl fmt::Debug for AnswerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerOptions")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Fires a [`CancelSignal`].
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// Observes cancellation requested through a [`CancelHandle`].
///
/// Dropping the handle without cancelling leaves the signal un-fired forever.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

/// Create a connected handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender }, CancelSignal { receiver })
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Another signal connected to this handle.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl CancelSignal {
    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
