//! Query orchestration: context preparation, provider and credential resolution, a single
//! dispatch, and response normalization.

mod prompt;
mod service;
mod types;

pub use prompt::{Prompt, SYSTEM_INSTRUCTION};
pub use service::{ChatApi, DispatchRequest, Orchestrator};
pub use types::{
    AnswerOptions, CancelHandle, CancelSignal, DEFAULT_REQUEST_TIMEOUT, FallbackCredentials,
    OrchestratorSettings, cancel_pair,
};
