//! Backend descriptors: one value per provider owning request building, answer extraction and
//! failure classification.

use super::registry::ProviderId;
use super::transport::OutboundRequest;
use super::wire::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Content, GeminiModelListResponse,
    GenerateContentRequest, GenerateContentResponse, GenerationConfig, MAX_OUTPUT_TOKENS,
    ModelListResponse, Part, TEMPERATURE,
};
use crate::errors::AnswerError;
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;

/// How the credential travels with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>` header.
    Bearer,
    /// Query-string parameter on the request URL.
    QueryKey {
        /// Name of the query parameter.
        param: &'static str,
    },
}

/// Request payload family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// OpenAI-style `messages` array with system + user turns.
    ChatCompletions {
        /// Whether the payload carries an explicit `"stream": false`.
        stream_flag: bool,
    },
    /// Gemini-style `contents` with a separate `systemInstruction`.
    GenerateContent,
}

/// Success envelope family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `choices[0].message.content`.
    ChatChoices,
    /// `candidates[0].content.parts[*].text`.
    Candidates,
}

/// Live model listing endpoint and its payload family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelListing {
    /// `{ data: [{ id }] }`; chat-capable GPT models are kept.
    OpenAiModels {
        /// Path appended to the base URL.
        path: &'static str,
    },
    /// `{ models: [{ name, displayName, supportedGenerationMethods }] }`.
    GeminiModels {
        /// Path appended to the base URL.
        path: &'static str,
    },
}

impl ModelListing {
    fn path(self) -> &'static str {
        match self {
            Self::OpenAiModels { path } | Self::GeminiModels { path } => path,
        }
    }
}

/// Model known to work with a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Identifier sent to the backend.
    pub id: Cow<'static, str>,
    /// Human-readable name.
    pub name: Cow<'static, str>,
}

impl ModelInfo {
    pub(crate) const fn new(id: &'static str, name: &'static str) -> Self {
        Self {
            id: Cow::Borrowed(id),
            name: Cow::Borrowed(name),
        }
    }
}

/// Where a model list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Fetched from the backend's listing endpoint.
    Live,
    /// The descriptor's built-in catalog.
    Static,
}

/// Models offered for one backend.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalog {
    /// Backend the list belongs to.
    pub provider: ProviderId,
    /// Live listing or built-in fallback.
    pub source: CatalogSource,
    /// Models in display order.
    pub models: Vec<ModelInfo>,
}

impl ModelCatalog {
    /// The built-in catalog for `provider`.
    pub fn fallback(provider: ProviderId) -> Self {
        Self {
            provider,
            source: CatalogSource::Static,
            models: provider.descriptor().models.to_vec(),
        }
    }
}

/// Static, read-only description of one backend.
#[derive(Debug)]
pub struct BackendDescriptor {
    /// Provider this descriptor is registered under.
    pub id: ProviderId,
    /// Default scheme + host, overridable per deployment.
    pub base_url: &'static str,
    /// Path appended to the base URL; `{model}` is substituted.
    pub path_template: &'static str,
    /// Model used when the caller does not pick one.
    pub default_model: &'static str,
    /// Credential placement.
    pub auth: AuthScheme,
    /// Request payload family.
    pub request: RequestShape,
    /// Success envelope family.
    pub response: ResponseShape,
    /// Static model catalog.
    pub models: &'static [ModelInfo],
    /// Live listing endpoint, when the backend offers one.
    pub listing: Option<ModelListing>,
}

impl BackendDescriptor {
    /// Build the authenticated request for one prompt.
    ///
    /// `base_url` overrides the descriptor default when present.
    pub fn build_request(
        &self,
        base_url: Option<&str>,
        model: &str,
        system: &str,
        user: &str,
        credential: &str,
    ) -> Result<OutboundRequest, AnswerError> {
        let encoded = encode_model(model).ok_or_else(|| AnswerError::UpstreamError {
            provider: self.id,
            status: None,
            message: format!("invalid model identifier: {model:?}"),
        })?;
        let url = self.endpoint(base_url, &self.path_template.replace("{model}", &encoded))?;
        let (url, headers) = self.authorize(url, credential);

        let body = match self.request {
            RequestShape::ChatCompletions { stream_flag } => {
                serde_json::to_value(ChatCompletionRequest {
                    model,
                    messages: [
                        ChatMessage {
                            role: "system",
                            content: system,
                        },
                        ChatMessage {
                            role: "user",
                            content: user,
                        },
                    ],
                    max_tokens: MAX_OUTPUT_TOKENS,
                    temperature: TEMPERATURE,
                    stream: stream_flag.then_some(false),
                })
            }
            RequestShape::GenerateContent => serde_json::to_value(GenerateContentRequest {
                system_instruction: Content {
                    role: None,
                    parts: [Part { text: system }],
                },
                contents: [Content {
                    role: Some("user"),
                    parts: [Part { text: user }],
                }],
                generation_config: GenerationConfig {
                    temperature: TEMPERATURE,
                    max_output_tokens: MAX_OUTPUT_TOKENS,
                },
            }),
        }
        .map_err(|error| AnswerError::UpstreamError {
            provider: self.id,
            status: None,
            message: format!("failed to encode request: {error}"),
        })?;

        Ok(OutboundRequest {
            method: Method::POST,
            url,
            headers,
            body: Some(body),
        })
    }

    /// Build the authenticated `GET` for the live model listing, if the backend has one.
    pub fn build_list_request(
        &self,
        base_url: Option<&str>,
        credential: &str,
    ) -> Result<Option<OutboundRequest>, AnswerError> {
        let Some(listing) = self.listing else {
            return Ok(None);
        };
        let url = self.endpoint(base_url, listing.path())?;
        let (url, headers) = self.authorize(url, credential);
        Ok(Some(OutboundRequest {
            method: Method::GET,
            url,
            headers,
            body: None,
        }))
    }

    /// Parse a listing payload into catalog entries.
    ///
    /// OpenAI keeps ids containing `gpt` but not `instruct`, newest id first. Gemini keeps
    /// `gemini` models that support `generateContent`. Returns `None` when the payload does not
    /// decode or nothing survives the filter.
    pub fn parse_model_list(&self, body: &str) -> Option<Vec<ModelInfo>> {
        let models = match self.listing? {
            ModelListing::OpenAiModels { .. } => {
                let parsed: ModelListResponse = serde_json::from_str(body).ok()?;
                let mut models: Vec<ModelInfo> = parsed
                    .data
                    .into_iter()
                    .map(|model| model.id)
                    .filter(|id| id.contains("gpt") && !id.contains("instruct"))
                    .map(|id| ModelInfo {
                        name: Cow::Owned(id.to_uppercase().replace('-', " ")),
                        id: Cow::Owned(id),
                    })
                    .collect();
                models.sort_by(|a, b| b.id.cmp(&a.id));
                models
            }
            ModelListing::GeminiModels { .. } => {
                let parsed: GeminiModelListResponse = serde_json::from_str(body).ok()?;
                parsed
                    .models
                    .into_iter()
                    .filter(|model| {
                        model.name.contains("gemini")
                            && model
                                .supported_generation_methods
                                .iter()
                                .any(|method| method == "generateContent")
                    })
                    .map(|model| {
                        let id = model
                            .name
                            .strip_prefix("models/")
                            .unwrap_or(&model.name)
                            .to_string();
                        let name = model
                            .display_name
                            .filter(|name| !name.trim().is_empty())
                            .unwrap_or_else(|| id.clone());
                        ModelInfo {
                            id: Cow::Owned(id),
                            name: Cow::Owned(name),
                        }
                    })
                    .collect()
            }
        };
        (!models.is_empty()).then_some(models)
    }

    fn endpoint(&self, base_url: Option<&str>, path: &str) -> Result<Url, AnswerError> {
        let base = base_url.unwrap_or(self.base_url).trim_end_matches('/');
        Url::parse(&format!("{base}{path}")).map_err(|error| AnswerError::UpstreamError {
            provider: self.id,
            status: None,
            message: format!("invalid endpoint for {}: {error}", self.id),
        })
    }

    fn authorize(&self, mut url: Url, credential: &str) -> (Url, Vec<(&'static str, String)>) {
        let mut headers = Vec::new();
        match self.auth {
            AuthScheme::Bearer => {
                headers.push(("Authorization", format!("Bearer {credential}")));
            }
            AuthScheme::QueryKey { param } => {
                url.query_pairs_mut().append_pair(param, credential);
            }
        }
        (url, headers)
    }

    /// Extract the answer text from a success payload.
    pub fn extract_answer(&self, body: &str) -> Result<String, AnswerError> {
        let malformed = |reason: String| AnswerError::MalformedResponse {
            provider: self.id,
            reason,
        };

        let answer = match self.response {
            ResponseShape::ChatChoices => {
                let parsed: ChatCompletionResponse = serde_json::from_str(body)
                    .map_err(|error| malformed(format!("undecodable payload: {error}")))?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message)
                    .and_then(|message| message.content)
            }
            ResponseShape::Candidates => {
                let parsed: GenerateContentResponse = serde_json::from_str(body)
                    .map_err(|error| malformed(format!("undecodable payload: {error}")))?;
                parsed
                    .candidates
                    .into_iter()
                    .next()
                    .and_then(|candidate| candidate.content)
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .filter_map(|part| part.text)
                            .collect::<String>()
                    })
            }
        };

        match answer {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(malformed("answer text is empty".into())),
            None => Err(malformed("no answer in payload".into())),
        }
    }

    /// Classify a non-success response.
    pub fn classify_failure(&self, status: u16, body: &str) -> AnswerError {
        let message = upstream_message(body);
        match status {
            401 | 403 => AnswerError::InvalidCredential { provider: self.id },
            429 => AnswerError::RateLimited { provider: self.id },
            _ if self.rejects_credential(status, body) => {
                AnswerError::InvalidCredential { provider: self.id }
            }
            _ => AnswerError::UpstreamError {
                provider: self.id,
                status: Some(status),
                message,
            },
        }
    }

    // Gemini answers a bad key with 400 INVALID_ARGUMENT rather than 401.
    fn rejects_credential(&self, status: u16, body: &str) -> bool {
        match self.response {
            ResponseShape::Candidates => status == 400 && body.contains("API_KEY_INVALID"),
            ResponseShape::ChatChoices => false,
        }
    }
}

/// Percent-encode each `/`-separated segment of a model id for use in a URL path.
///
/// Returns `None` for empty or dot segments, which URL parsing would collapse.
fn encode_model(model: &str) -> Option<String> {
    let segments = model
        .split('/')
        .map(|segment| match segment {
            "" | "." | ".." => None,
            _ => Some(encode_segment(segment)),
        })
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Pull a human-readable message out of an error payload, falling back to the raw body.
fn upstream_message(body: &str) -> String {
    let extracted = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| value.get("message").and_then(Value::as_str))
            .or_else(|| value.get("error").and_then(Value::as_str))
            .map(str::to_string)
    });
    extracted.unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header<'a>(request: &'a OutboundRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn chat_completion_request_uses_bearer_header() {
        let request = ProviderId::OpenAi
            .descriptor()
            .build_request(None, "gpt-4o-mini", "system text", "user text", "sk-test")
            .expect("request");

        assert_eq!(
            request.url.as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(request.method, Method::POST);
        assert_eq!(header(&request, "authorization"), Some("Bearer sk-test"));
        let body = request.body.expect("json body");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user text");
        assert_eq!(body["max_tokens"], 4096);
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn huggingface_request_embeds_model_in_path_and_disables_streaming() {
        let request = ProviderId::HuggingFace
            .descriptor()
            .build_request(None, "Qwen/Qwen2.5-72B-Instruct", "s", "u", "hf-key")
            .expect("request");

        assert_eq!(
            request.url.path(),
            "/models/Qwen/Qwen2.5-72B-Instruct/v1/chat/completions"
        );
        assert_eq!(request.body.expect("json body")["stream"], json!(false));
    }

    #[test]
    fn gemini_request_carries_key_in_url_only() {
        let request = ProviderId::Gemini
            .descriptor()
            .build_request(
                Some("http://127.0.0.1:9999/"),
                "gemini-1.5-flash",
                "system text",
                "user text",
                "g-key",
            )
            .expect("request");

        assert_eq!(
            request.url.as_str(),
            "http://127.0.0.1:9999/v1beta/models/gemini-1.5-flash:generateContent?key=g-key"
        );
        assert!(header(&request, "authorization").is_none());
        let body = request.body.expect("json body");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "system text");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "user text");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn model_ids_are_escaped_inside_the_path() {
        let request = ProviderId::Gemini
            .descriptor()
            .build_request(None, "evil?x#y", "s", "u", "g-key")
            .expect("request");
        assert_eq!(
            request.url.path(),
            "/v1beta/models/evil%3Fx%23y:generateContent"
        );
        assert_eq!(request.url.query(), Some("key=g-key"));
        assert!(request.url.fragment().is_none());

        let spaced = ProviderId::HuggingFace
            .descriptor()
            .build_request(None, "org/My Model", "s", "u", "hf")
            .expect("request");
        assert_eq!(spaced.url.path(), "/models/org/My%20Model/v1/chat/completions");
    }

    #[test]
    fn dot_segments_in_model_ids_are_rejected() {
        for model in ["../admin", "org//x", "a/./b", ""] {
            let error = ProviderId::HuggingFace
                .descriptor()
                .build_request(None, model, "s", "u", "hf")
                .unwrap_err();
            assert!(
                matches!(error, AnswerError::UpstreamError { status: None, .. }),
                "{model:?}"
            );
        }
    }

    #[test]
    fn list_requests_follow_backend_auth() {
        let openai = ProviderId::OpenAi
            .descriptor()
            .build_list_request(Some("http://127.0.0.1:9999"), "sk")
            .expect("request")
            .expect("openai lists models");
        assert_eq!(openai.method, Method::GET);
        assert_eq!(openai.url.as_str(), "http://127.0.0.1:9999/v1/models");
        assert_eq!(header(&openai, "authorization"), Some("Bearer sk"));
        assert!(openai.body.is_none());

        let gemini = ProviderId::Gemini
            .descriptor()
            .build_list_request(None, "g-key")
            .expect("request")
            .expect("gemini lists models");
        assert_eq!(
            gemini.url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models?key=g-key"
        );

        for id in [ProviderId::Perplexity, ProviderId::HuggingFace, ProviderId::DeepSeek] {
            assert!(id.descriptor().build_list_request(None, "k").expect("ok").is_none());
        }
    }

    #[test]
    fn openai_listing_keeps_chat_gpt_models_newest_first() {
        let body = json!({
            "data": [
                { "id": "gpt-4o-mini" },
                { "id": "gpt-3.5-turbo-instruct" },
                { "id": "whisper-1" },
                { "id": "gpt-4o" },
                { "id": "text-embedding-3-small" }
            ]
        })
        .to_string();
        let models = ProviderId::OpenAi
            .descriptor()
            .parse_model_list(&body)
            .expect("models");
        let pairs: Vec<(&str, &str)> = models
            .iter()
            .map(|model| (&*model.id, &*model.name))
            .collect();
        assert_eq!(pairs, vec![("gpt-4o-mini", "GPT 4O MINI"), ("gpt-4o", "GPT 4O")]);

        let only_others = json!({ "data": [{ "id": "dall-e-3" }] }).to_string();
        assert!(ProviderId::OpenAi.descriptor().parse_model_list(&only_others).is_none());
        assert!(ProviderId::OpenAi.descriptor().parse_model_list("nope").is_none());
    }

    #[test]
    fn gemini_listing_keeps_generate_content_models() {
        let body = json!({
            "models": [
                {
                    "name": "models/gemini-1.5-pro",
                    "displayName": "Gemini 1.5 Pro",
                    "supportedGenerationMethods": ["generateContent", "countTokens"]
                },
                {
                    "name": "models/text-embedding-004",
                    "displayName": "Text Embedding 004",
                    "supportedGenerationMethods": ["embedContent"]
                },
                {
                    "name": "models/gemini-embedding-exp",
                    "supportedGenerationMethods": ["embedContent"]
                },
                {
                    "name": "models/gemini-2.0-flash",
                    "supportedGenerationMethods": ["generateContent"]
                }
            ]
        })
        .to_string();
        let models = ProviderId::Gemini
            .descriptor()
            .parse_model_list(&body)
            .expect("models");
        assert_eq!(
            models,
            vec![
                ModelInfo::new("gemini-1.5-pro", "Gemini 1.5 Pro"),
                ModelInfo::new("gemini-2.0-flash", "gemini-2.0-flash"),
            ]
        );
    }

    #[test]
    fn invalid_base_url_is_reported_without_panicking() {
        let error = ProviderId::DeepSeek
            .descriptor()
            .build_request(Some("not a url"), "deepseek-chat", "s", "u", "k")
            .unwrap_err();
        assert!(matches!(error, AnswerError::UpstreamError { status: None, .. }));
    }

    #[test]
    fn extracts_chat_choice_content() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello" } }],
            "usage": { "total_tokens": 3 }
        })
        .to_string();
        let answer = ProviderId::Perplexity
            .descriptor()
            .extract_answer(&body)
            .expect("answer");
        assert_eq!(answer, "Hello");
    }

    #[test]
    fn extracts_and_joins_candidate_parts() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hel" }, { "text": "lo" }] } }]
        })
        .to_string();
        let answer = ProviderId::Gemini
            .descriptor()
            .extract_answer(&body)
            .expect("answer");
        assert_eq!(answer, "Hello");
    }

    #[test]
    fn missing_or_blank_answers_are_malformed() {
        let openai = ProviderId::OpenAi.descriptor();
        for body in [
            json!({ "choices": [] }).to_string(),
            json!({ "choices": [{ "message": { "content": "   " } }] }).to_string(),
            json!({ "id": "x" }).to_string(),
            "not json".to_string(),
        ] {
            let error = openai.extract_answer(&body).unwrap_err();
            assert!(
                matches!(error, AnswerError::MalformedResponse { .. }),
                "{body} should be malformed"
            );
        }

        let gemini = ProviderId::Gemini.descriptor();
        let error = gemini
            .extract_answer(&json!({ "candidates": [{ "finishReason": "SAFETY" }] }).to_string())
            .unwrap_err();
        assert!(matches!(error, AnswerError::MalformedResponse { .. }));
    }

    #[test]
    fn status_classification_is_uniform_across_descriptors() {
        for id in ProviderId::ALL {
            let descriptor = id.descriptor();
            assert!(matches!(
                descriptor.classify_failure(401, "{}"),
                AnswerError::InvalidCredential { provider } if provider == id
            ));
            assert!(matches!(
                descriptor.classify_failure(403, ""),
                AnswerError::InvalidCredential { .. }
            ));
            assert!(matches!(
                descriptor.classify_failure(429, "slow down"),
                AnswerError::RateLimited { .. }
            ));
            assert!(matches!(
                descriptor.classify_failure(500, "boom"),
                AnswerError::UpstreamError { status: Some(500), .. }
            ));
            assert!(matches!(
                descriptor.classify_failure(400, "bad request"),
                AnswerError::UpstreamError { status: Some(400), .. }
            ));
        }
    }

    #[test]
    fn gemini_key_rejection_payload_is_invalid_credential() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{ "reason": "API_KEY_INVALID" }]
            }
        })
        .to_string();
        assert!(matches!(
            ProviderId::Gemini.descriptor().classify_failure(400, &body),
            AnswerError::InvalidCredential { .. }
        ));
        assert!(matches!(
            ProviderId::OpenAi.descriptor().classify_failure(400, &body),
            AnswerError::UpstreamError { .. }
        ));
    }

    #[test]
    fn upstream_message_prefers_structured_fields() {
        assert_eq!(
            upstream_message(r#"{"error":{"message":"model not found"}}"#),
            "model not found"
        );
        assert_eq!(upstream_message(r#"{"message":"quota"}"#), "quota");
        assert_eq!(upstream_message(r#"{"error":"Model is loading"}"#), "Model is loading");
        assert_eq!(upstream_message("  plain text  "), "plain text");
    }
}
