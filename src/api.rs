//! HTTP surface for askdocs.
//!
//! - `POST /chat` – Answer a message grounded in uploaded document text. Accepts
//!   `{ message, file_contents: [{ name, content }], provider?, model?, use_own_key? }`; the
//!   `X-User-API-Key`, `X-AI-Provider` and `X-AI-Model` headers override the body.
//! - `GET /providers` – Registered backends with their default model and auth style.
//! - `GET /models?provider=<id>` – Model catalog for one backend; live for OpenAI and Gemini when
//!   `X-API-Key` (or a configured key) is available, else the built-in list.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Handlers only translate between HTTP and [`ChatApi`]; all behavior lives in the orchestrator.

use crate::context::Excerpt;
use crate::errors::{AnswerError, ErrorKind};
use crate::orchestrator::{AnswerOptions, ChatApi};
use crate::providers::{AuthScheme, ModelCatalog, ProviderId, descriptors};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Header carrying the caller's own API key.
pub const USER_API_KEY_HEADER: &str = "x-user-api-key";
/// Header selecting the provider.
pub const PROVIDER_HEADER: &str = "x-ai-provider";
/// Header selecting the model.
pub const MODEL_HEADER: &str = "x-ai-model";
/// Header carrying the key used for live model listings.
pub const LISTING_API_KEY_HEADER: &str = "x-api-key";

/// Build the HTTP router around a [`ChatApi`] implementation.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ChatApi + 'static,
{
    Router::new()
        .route("/chat", post(chat::<S>))
        .route("/providers", get(list_providers::<S>))
        .route("/models", get(list_models::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// One uploaded document, already converted to text.
#[derive(Deserialize)]
struct FileContent {
    name: String,
    content: String,
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    file_contents: Vec<FileContent>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
    /// When set, the request must carry `X-User-API-Key`.
    #[serde(default)]
    use_own_key: bool,
}

#[derive(Serialize)]
struct ChatResponse {
    success: bool,
    response: String,
}

/// Answer a message with the selected backend.
async fn chat<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError>
where
    S: ChatApi,
{
    let ChatRequest {
        message,
        file_contents,
        provider,
        model,
        use_own_key,
    } = request;

    if message.trim().is_empty() {
        return Err(AppError::BadRequest("No message provided".into()));
    }
    let credential = header_value(&headers, USER_API_KEY_HEADER);
    if use_own_key && credential.is_none() {
        return Err(AppError::BadRequest(
            "API key required when using your own key".into(),
        ));
    }

    let options = AnswerOptions {
        provider: header_value(&headers, PROVIDER_HEADER).or(provider),
        model: header_value(&headers, MODEL_HEADER).or(model),
        credential,
        ..AnswerOptions::default()
    };
    tracing::info!(
        provider = ?options.provider,
        model = ?options.model,
        own_key = options.credential.is_some(),
        files = file_contents.len(),
        "Chat request received"
    );

    let excerpts = file_contents
        .into_iter()
        .map(|file| Excerpt::new(file.name, file.content))
        .collect();
    let response = service.answer(&message, excerpts, options).await?;
    Ok(Json(ChatResponse {
        success: true,
        response,
    }))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Serialize)]
struct ProviderSummary {
    id: ProviderId,
    default_model: &'static str,
    auth: &'static str,
}

#[derive(Serialize)]
struct ProvidersResponse {
    default_provider: ProviderId,
    providers: Vec<ProviderSummary>,
}

/// List registered backends.
async fn list_providers<S>(State(service): State<Arc<S>>) -> Json<ProvidersResponse>
where
    S: ChatApi,
{
    let providers = descriptors()
        .map(|descriptor| ProviderSummary {
            id: descriptor.id,
            default_model: descriptor.default_model,
            auth: match descriptor.auth {
                AuthScheme::Bearer => "bearer",
                AuthScheme::QueryKey { .. } => "query_key",
            },
        })
        .collect();
    Json(ProvidersResponse {
        default_provider: service.default_provider(),
        providers,
    })
}

#[derive(Deserialize)]
struct ModelsQuery {
    #[serde(default)]
    provider: Option<String>,
}

/// Return the model catalog for one backend.
async fn list_models<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Query(query): Query<ModelsQuery>,
) -> Result<Json<ModelCatalog>, AppError>
where
    S: ChatApi,
{
    let requested = query
        .provider
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Provider parameter required".into()))?;
    let provider: ProviderId = requested.parse()?;
    let credential = header_value(&headers, LISTING_API_KEY_HEADER)
        .or_else(|| header_value(&headers, USER_API_KEY_HEADER));
    Ok(Json(service.list_models(provider, credential).await))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/chat",
                description: "Answer a message grounded in the supplied document text. Response returns { \"success\": true, \"response\": string }.",
                request_example: Some(json!({
                    "message": "Sort the students by GPA from highest to lowest",
                    "file_contents": [
                        { "name": "grades.csv", "content": "name,GPA\nAda,3.9\nLin,3.2" }
                    ],
                    "provider": "openai",
                    "model": "gpt-4o-mini",
                    "use_own_key": false
                })),
            },
            CommandDescriptor {
                name: "providers",
                method: "GET",
                path: "/providers",
                description: "List registered backends with their default model and authentication style.",
                request_example: None,
            },
            CommandDescriptor {
                name: "models",
                method: "GET",
                path: "/models?provider=<id>",
                description: "Return the models for one backend. Response returns { \"provider\", \"source\": \"live\" | \"static\", \"models\": [{ \"id\", \"name\" }] }.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Answer(AnswerError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Answer(error) => match error.kind() {
                ErrorKind::InvalidCredential => StatusCode::UNAUTHORIZED,
                ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::UnknownProvider | ErrorKind::MissingCredential => {
                    StatusCode::BAD_REQUEST
                }
                ErrorKind::UpstreamError | ErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
                ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::BadRequest(message) => json!({ "error": message, "kind": "bad_request" }),
            Self::Answer(error) => {
                tracing::warn!(kind = ?error.kind(), error = %error, "Chat request failed");
                json!({ "error": error.to_string(), "kind": error.kind() })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<AnswerError> for AppError {
    fn from(inner: AnswerError) -> Self {
        Self::Answer(inner)
    }
}
