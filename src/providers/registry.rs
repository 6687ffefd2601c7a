//! Static registry of supported backends.
//!
//! Each backend is one [`BackendDescriptor`] value. Adding a backend means adding a
//! [`ProviderId`] variant and its descriptor here; nothing else branches on the provider.

use super::descriptor::{
    AuthScheme, BackendDescriptor, ModelInfo, ModelListing, RequestShape, ResponseShape,
};
use crate::errors::AnswerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a registered backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Perplexity chat completions.
    Perplexity,
    /// OpenAI chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini `generateContent`.
    Gemini,
    /// Hugging Face inference router (OpenAI-compatible route).
    #[serde(rename = "huggingface")]
    HuggingFace,
    /// DeepSeek chat completions.
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl ProviderId {
    /// Every registered provider, in display order.
    pub const ALL: [ProviderId; 5] = [
        Self::Perplexity,
        Self::OpenAi,
        Self::Gemini,
        Self::HuggingFace,
        Self::DeepSeek,
    ];

    /// Canonical lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Perplexity => "perplexity",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::HuggingFace => "huggingface",
            Self::DeepSeek => "deepseek",
        }
    }

    /// Descriptor owning this backend's protocol details.
    pub fn descriptor(self) -> &'static BackendDescriptor {
        match self {
            Self::Perplexity => &PERPLEXITY,
            Self::OpenAi => &OPENAI,
            Self::Gemini => &GEMINI,
            Self::HuggingFace => &HUGGINGFACE,
            Self::DeepSeek => &DEEPSEEK,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = AnswerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| AnswerError::UnknownProvider(s.trim().to_string()))
    }
}

/// All registered descriptors, in display order.
pub fn descriptors() -> impl Iterator<Item = &'static BackendDescriptor> {
    ProviderId::ALL.into_iter().map(ProviderId::descriptor)
}

static PERPLEXITY: BackendDescriptor = BackendDescriptor {
    id: ProviderId::Perplexity,
    base_url: "https://api.perplexity.ai",
    path_template: "/chat/completions",
    default_model: "sonar-pro",
    auth: AuthScheme::Bearer,
    request: RequestShape::ChatCompletions { stream_flag: false },
    response: ResponseShape::ChatChoices,
    models: &[
        ModelInfo::new("sonar-pro", "Sonar Pro"),
        ModelInfo::new("sonar-reasoning", "sonar-reasoning-pro"),
        ModelInfo::new("llama-3.1-sonar-small-128k-online", "Sonar Small (Online)"),
        ModelInfo::new("llama-3.1-sonar-large-128k-online", "Sonar Large (Online)"),
        ModelInfo::new("llama-3.1-sonar-huge-128k-online", "Sonar Huge (Online)"),
    ],
    listing: None,
};

static OPENAI: BackendDescriptor = BackendDescriptor {
    id: ProviderId::OpenAi,
    base_url: "https://api.openai.com",
    path_template: "/v1/chat/completions",
    default_model: "gpt-4o",
    auth: AuthScheme::Bearer,
    request: RequestShape::ChatCompletions { stream_flag: false },
    response: ResponseShape::ChatChoices,
    models: &[
        ModelInfo::new("gpt-4o", "GPT-4o"),
        ModelInfo::new("gpt-4o-mini", "GPT-4o Mini"),
        ModelInfo::new("gpt-4-turbo", "GPT-4 Turbo"),
        ModelInfo::new("gpt-3.5-turbo", "GPT-3.5 Turbo"),
    ],
    listing: Some(ModelListing::OpenAiModels { path: "/v1/models" }),
};

static GEMINI: BackendDescriptor = BackendDescriptor {
    id: ProviderId::Gemini,
    base_url: "https://generativelanguage.googleapis.com",
    path_template: "/v1beta/models/{model}:generateContent",
    default_model: "gemini-2.0-flash-exp",
    auth: AuthScheme::QueryKey { param: "key" },
    request: RequestShape::GenerateContent,
    response: ResponseShape::Candidates,
    models: &[
        ModelInfo::new("gemini-2.0-flash-exp", "Gemini 2.0 Flash"),
        ModelInfo::new("gemini-1.5-pro", "Gemini 1.5 Pro"),
        ModelInfo::new("gemini-1.5-flash", "Gemini 1.5 Flash"),
        ModelInfo::new("gemini-1.5-flash-8b", "Gemini 1.5 Flash-8B"),
    ],
    listing: Some(ModelListing::GeminiModels { path: "/v1beta/models" }),
};

static HUGGINGFACE: BackendDescriptor = BackendDescriptor {
    id: ProviderId::HuggingFace,
    base_url: "https://api-inference.huggingface.co",
    path_template: "/models/{model}/v1/chat/completions",
    default_model: "Qwen/Qwen2.5-72B-Instruct",
    auth: AuthScheme::Bearer,
    request: RequestShape::ChatCompletions { stream_flag: true },
    response: ResponseShape::ChatChoices,
    models: &[
        ModelInfo::new("Qwen/Qwen2.5-72B-Instruct", "Qwen 2.5 72B"),
        ModelInfo::new("Qwen/Qwen2.5-7B-Instruct", "Qwen 2.5 7B"),
        ModelInfo::new("meta-llama/Llama-3.1-70B-Instruct", "Llama 3.1 70B"),
        ModelInfo::new("meta-llama/Llama-3.1-8B-Instruct", "Llama 3.1 8B"),
        ModelInfo::new("mistralai/Mixtral-8x7B-Instruct-v0.1", "Mixtral 8x7B"),
        ModelInfo::new("mistralai/Mistral-7B-Instruct-v0.3", "Mistral 7B"),
    ],
    listing: None,
};

static DEEPSEEK: BackendDescriptor = BackendDescriptor {
    id: ProviderId::DeepSeek,
    base_url: "https://api.deepseek.com",
    path_template: "/v1/chat/completions",
    default_model: "deepseek-chat",
    auth: AuthScheme::Bearer,
    request: RequestShape::ChatCompletions { stream_flag: false },
    response: ResponseShape::ChatChoices,
    models: &[
        ModelInfo::new("deepseek-chat", "DeepSeek Chat"),
        ModelInfo::new("deepseek-reasoner", "DeepSeek Reasoner (R1)"),
    ],
    listing: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identifiers_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderId>().unwrap(), ProviderId::OpenAi);
        assert_eq!(
            " huggingface ".parse::<ProviderId>().unwrap(),
            ProviderId::HuggingFace
        );
    }

    #[test]
    fn rejects_unregistered_identifier() {
        let error = "anthropic".parse::<ProviderId>().unwrap_err();
        assert!(matches!(error, AnswerError::UnknownProvider(name) if name == "anthropic"));
    }

    #[test]
    fn every_descriptor_is_keyed_by_its_own_id() {
        for id in ProviderId::ALL {
            let descriptor = id.descriptor();
            assert_eq!(descriptor.id, id);
            assert!(
                descriptor
                    .models
                    .iter()
                    .any(|model| model.id == descriptor.default_model),
                "{id} default model missing from catalog"
            );
        }
        assert_eq!(descriptors().count(), ProviderId::ALL.len());
    }

    #[test]
    fn static_catalogs_list_known_models() {
        let catalog = |id: ProviderId| -> Vec<(String, String)> {
            id.descriptor()
                .models
                .iter()
                .map(|model| (model.id.to_string(), model.name.to_string()))
                .collect()
        };
        let pairs = |items: &[(&str, &str)]| -> Vec<(String, String)> {
            items
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect()
        };

        assert_eq!(
            catalog(ProviderId::HuggingFace),
            pairs(&[
                ("Qwen/Qwen2.5-72B-Instruct", "Qwen 2.5 72B"),
                ("Qwen/Qwen2.5-7B-Instruct", "Qwen 2.5 7B"),
                ("meta-llama/Llama-3.1-70B-Instruct", "Llama 3.1 70B"),
                ("meta-llama/Llama-3.1-8B-Instruct", "Llama 3.1 8B"),
                ("mistralai/Mixtral-8x7B-Instruct-v0.1", "Mixtral 8x7B"),
                ("mistralai/Mistral-7B-Instruct-v0.3", "Mistral 7B"),
            ])
        );
        assert_eq!(
            catalog(ProviderId::Gemini),
            pairs(&[
                ("gemini-2.0-flash-exp", "Gemini 2.0 Flash"),
                ("gemini-1.5-pro", "Gemini 1.5 Pro"),
                ("gemini-1.5-flash", "Gemini 1.5 Flash"),
                ("gemini-1.5-flash-8b", "Gemini 1.5 Flash-8B"),
            ])
        );
        assert_eq!(
            catalog(ProviderId::DeepSeek),
            pairs(&[
                ("deepseek-chat", "DeepSeek Chat"),
                ("deepseek-reasoner", "DeepSeek Reasoner (R1)"),
            ])
        );
        assert!(
            catalog(ProviderId::Perplexity)
                .contains(&("sonar-reasoning".to_string(), "sonar-reasoning-pro".to_string()))
        );
    }

    #[test]
    fn only_gemini_carries_key_in_url() {
        let url_keyed: Vec<ProviderId> = descriptors()
            .filter(|d| matches!(d.auth, AuthScheme::QueryKey { .. }))
            .map(|d| d.id)
            .collect();
        assert_eq!(url_keyed, vec![ProviderId::Gemini]);
    }

    #[test]
    fn serde_uses_canonical_identifiers() {
        for id in ProviderId::ALL {
            assert_eq!(
                serde_json::to_value(id).expect("serialize"),
                serde_json::json!(id.as_str())
            );
        }
    }
}
