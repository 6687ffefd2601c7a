//! The single `answer` operation: order, assemble, prompt, dispatch, normalize.

use super::prompt::Prompt;
use super::types::{AnswerOptions, CancelSignal, FallbackCredentials, OrchestratorSettings};
use crate::config::Config;
use crate::context::{Excerpt, apply_ordering, assemble_context};
use crate::errors::AnswerError;
use crate::normalize::strip_reasoning;
use crate::providers::{
    CatalogSource, ModelCatalog, ProviderId, ReqwestTransport, Transport, TransportError,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Fully resolved input of one network call.
#[derive(Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Resolved backend.
    pub provider: ProviderId,
    /// Resolved model identifier.
    pub model: String,
    /// Prompt to send.
    pub prompt: Prompt,
    /// The one credential used for this call.
    pub credential: String,
}

impl std::fmt::Debug for DispatchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRequest")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// Abstraction over the orchestrator used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Produce one answer for `message` grounded in `excerpts`.
    async fn answer(
        &self,
        message: &str,
        excerpts: Vec<Excerpt>,
        options: AnswerOptions,
    ) -> Result<String, AnswerError>;

    /// Models available for `provider`, live when the backend lists them.
    async fn list_models(&self, provider: ProviderId, credential: Option<String>) -> ModelCatalog;

    /// Provider used when the caller names none.
    fn default_provider(&self) -> ProviderId;
}

/// Turns a message plus document excerpts into one answer from one backend.
///
/// Holds only read-only state; share it behind an `Arc` and call it concurrently.
pub struct Orchestrator {
    settings: OrchestratorSettings,
    credentials: FallbackCredentials,
    transport: Arc<dyn Transport>,
}

#[derive(Debug, Clone, Copy)]
enum CredentialSource {
    Caller,
    Fallback,
}

impl CredentialSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::Caller => "caller",
            Self::Fallback => "fallback",
        }
    }
}

impl Orchestrator {
    /// Build an orchestrator from explicit parts.
    pub fn new(
        settings: OrchestratorSettings,
        credentials: FallbackCredentials,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            settings,
            credentials,
            transport,
        }
    }

    /// Build an orchestrator with a `reqwest` transport from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let settings = OrchestratorSettings {
            default_provider: config.default_provider,
            excerpt_budget: config.excerpt_char_budget,
            target_columns: config.sort_target_columns.clone(),
            timeout: config.request_timeout,
            base_urls: config.base_urls.clone(),
        };
        tracing::debug!(
            default_provider = %settings.default_provider,
            excerpt_budget = settings.excerpt_budget,
            timeout_secs = settings.timeout.as_secs(),
            fallback = ?config.fallback_credentials,
            "Initializing orchestrator"
        );
        Ok(Self::new(
            settings,
            config.fallback_credentials.clone(),
            Arc::new(ReqwestTransport::new()?),
        ))
    }

    /// Answer `message` using `excerpts` as grounding context.
    ///
    /// Performs at most one network call and never retries. Failures are classified into
    /// [`AnswerError`] and returned unchanged.
    pub async fn answer(
        &self,
        message: &str,
        excerpts: Vec<Excerpt>,
        options: AnswerOptions,
    ) -> Result<String, AnswerError> {
        let span = tracing::info_span!(
            "answer",
            request_id = %Uuid::new_v4(),
            provider = tracing::field::Empty,
            model = tracing::field::Empty,
        );
        self.answer_in_span(message, excerpts, options)
            .instrument(span)
            .await
    }

    async fn answer_in_span(
        &self,
        message: &str,
        excerpts: Vec<Excerpt>,
        options: AnswerOptions,
    ) -> Result<String, AnswerError> {
        let AnswerOptions {
            provider,
            model,
            credential,
            timeout,
            cancel,
        } = options;

        let request = self.prepare(message, excerpts, provider, model, credential)?;
        let span = tracing::Span::current();
        span.record("provider", request.provider.as_str());
        span.record("model", request.model.as_str());

        let timeout = timeout.unwrap_or(self.settings.timeout);
        self.dispatch(request, timeout, cancel.as_ref()).await
    }

    /// Resolve everything needed for dispatch without touching the network.
    pub fn prepare(
        &self,
        message: &str,
        excerpts: Vec<Excerpt>,
        provider: Option<String>,
        model: Option<String>,
        credential: Option<String>,
    ) -> Result<DispatchRequest, AnswerError> {
        let excerpt_count = excerpts.len();
        let excerpts = apply_ordering(message, excerpts, &self.settings.target_columns);
        let sorted = excerpts
            .iter()
            .filter(|excerpt| excerpt.derived_order.is_some())
            .count();
        let context_block = assemble_context(&excerpts, self.settings.excerpt_budget);
        tracing::debug!(
            excerpts = excerpt_count,
            sorted,
            context_chars = context_block.chars().count(),
            "Assembled context"
        );
        let prompt = Prompt::new(context_block, message);

        let provider = match non_blank(provider) {
            Some(requested) => requested.parse::<ProviderId>()?,
            None => self.settings.default_provider,
        };
        let (credential, source) = self.resolve_credential(provider, credential)?;
        let model = non_blank(model)
            .unwrap_or_else(|| provider.descriptor().default_model.to_string());
        tracing::debug!(
            %provider,
            model = %model,
            credential_source = source.as_str(),
            "Resolved dispatch target"
        );

        Ok(DispatchRequest {
            provider,
            model,
            prompt,
            credential,
        })
    }

    /// Models available for `provider`.
    ///
    /// Backends with a listing endpoint get one `GET` with the caller's key, else the fallback
    /// key. A missing key, a failed or timed-out call, or an empty listing all yield the built-in
    /// catalog.
    pub async fn list_models(
        &self,
        provider: ProviderId,
        credential: Option<String>,
    ) -> ModelCatalog {
        let descriptor = provider.descriptor();
        if descriptor.listing.is_none() {
            return ModelCatalog::fallback(provider);
        }
        let Ok((credential, source)) = self.resolve_credential(provider, credential) else {
            tracing::debug!(%provider, "No credential for live model listing");
            return ModelCatalog::fallback(provider);
        };

        let base_url = self.settings.base_urls.get(&provider).map(String::as_str);
        let request = match descriptor.build_list_request(base_url, &credential) {
            Ok(Some(request)) => request,
            Ok(None) => return ModelCatalog::fallback(provider),
            Err(error) => {
                tracing::warn!(%provider, error = %error, "Cannot build model listing request");
                return ModelCatalog::fallback(provider);
            }
        };

        let timeout = self.settings.timeout;
        let response = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(Ok(response)) if response.is_success() => response,
            Ok(Ok(response)) => {
                tracing::warn!(%provider, status = response.status, "Model listing rejected");
                return ModelCatalog::fallback(provider);
            }
            Ok(Err(error)) => {
                tracing::warn!(%provider, error = %error, "Model listing failed");
                return ModelCatalog::fallback(provider);
            }
            Err(_) => {
                tracing::warn!(%provider, timeout_secs = timeout.as_secs_f64(), "Model listing timed out");
                return ModelCatalog::fallback(provider);
            }
        };

        match descriptor.parse_model_list(&response.body) {
            Some(models) => {
                tracing::debug!(
                    %provider,
                    models = models.len(),
                    credential_source = source.as_str(),
                    "Fetched live model list"
                );
                ModelCatalog {
                    provider,
                    source: CatalogSource::Live,
                    models,
                }
            }
            None => {
                tracing::debug!(%provider, "Live model list empty or undecodable");
                ModelCatalog::fallback(provider)
            }
        }
    }

    fn resolve_credential(
        &self,
        provider: ProviderId,
        caller: Option<String>,
    ) -> Result<(String, CredentialSource), AnswerError> {
        if let Some(key) = non_blank(caller) {
            return Ok((key, CredentialSource::Caller));
        }
        self.credentials
            .get(provider)
            .map(|key| (key.to_string(), CredentialSource::Fallback))
            .ok_or(AnswerError::MissingCredential(provider))
    }

    async fn dispatch(
        &self,
        request: DispatchRequest,
        timeout: Duration,
        cancel: Option<&CancelSignal>,
    ) -> Result<String, AnswerError> {
        let DispatchRequest {
            provider,
            model,
            prompt,
            credential,
        } = request;
        let descriptor = provider.descriptor();
        let base_url = self.settings.base_urls.get(&provider).map(String::as_str);
        let outbound = descriptor.build_request(
            base_url,
            &model,
            prompt.system_instruction,
            &prompt.user_turn(),
            &credential,
        )?;

        if cancel.is_some_and(CancelSignal::is_cancelled) {
            tracing::info!("Request cancelled before dispatch");
            return Err(AnswerError::Cancelled { provider });
        }

        let started = Instant::now();
        let send = tokio::time::timeout(timeout, self.transport.send(outbound));
        let outcome = match cancel {
            Some(signal) => tokio::select! {
                biased;
                () = signal.cancelled() => {
                    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Request cancelled in flight");
                    return Err(AnswerError::Cancelled { provider });
                }
                outcome = send => outcome,
            },
            None => send.await,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let response = match outcome {
            Err(_) => {
                tracing::warn!(elapsed_ms, timeout_secs = timeout.as_secs_f64(), "Backend timed out");
                return Err(AnswerError::Timeout { provider, timeout });
            }
            Ok(Err(error)) => {
                tracing::warn!(elapsed_ms, error = %error, "Transport failure");
                return Err(AnswerError::UpstreamError {
                    provider,
                    status: None,
                    message: error.to_string(),
                });
            }
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            let error = descriptor.classify_failure(response.status, &response.body);
            tracing::warn!(
                elapsed_ms,
                status = response.status,
                kind = ?error.kind(),
                "Backend returned an error"
            );
            return Err(error);
        }

        let raw = descriptor.extract_answer(&response.body).inspect_err(|error| {
            tracing::warn!(elapsed_ms, error = %error, "Unusable success payload");
        })?;
        let answer = strip_reasoning(&raw);
        if answer.trim().is_empty() {
            return Err(AnswerError::MalformedResponse {
                provider,
                reason: "answer contained only reasoning".into(),
            });
        }
        tracing::info!(
            elapsed_ms,
            answer_chars = answer.chars().count(),
            stripped = answer.len() != raw.len(),
            "Answer received"
        );
        Ok(answer.into_owned())
    }
}

#[async_trait]
impl ChatApi for Orchestrator {
    async fn answer(
        &self,
        message: &str,
        excerpts: Vec<Excerpt>,
        options: AnswerOptions,
    ) -> Result<String, AnswerError> {
        Orchestrator::answer(self, message, excerpts, options).await
    }

    async fn list_models(&self, provider: ProviderId, credential: Option<String>) -> ModelCatalog {
        Orchestrator::list_models(self, provider, credential).await
    }

    fn default_provider(&self) -> ProviderId {
        self.settings.default_provider
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
