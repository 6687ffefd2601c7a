//! Error taxonomy surfaced to callers of [`crate::orchestrator::Orchestrator::answer`].
//!
//! Upstream payloads never leak through these variants except as the diagnostic `message` of
//! [`AnswerError::UpstreamError`]. Callers that need a stable discriminant use [`ErrorKind`].

use crate::providers::ProviderId;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Classified failure of a single `answer` call.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Backend rejected the credential (401/403 or an equivalent payload).
    #[error("{provider} rejected the API key")]
    InvalidCredential {
        /// Backend that rejected the key.
        provider: ProviderId,
    },
    /// Backend throttled the request (429).
    #[error("{provider} rate limit exceeded; retry later")]
    RateLimited {
        /// Backend that throttled the request.
        provider: ProviderId,
    },
    /// Requested provider identifier is not registered.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    /// Neither a caller key nor a process-wide fallback key exists for the provider.
    #[error("No API key available for {0}")]
    MissingCredential(ProviderId),
    /// Any other non-success response, or a transport failure before a response arrived.
    #[error("{provider} request failed: {message}")]
    UpstreamError {
        /// Backend that failed.
        provider: ProviderId,
        /// HTTP status, absent when no response was received.
        status: Option<u16>,
        /// Diagnostic message extracted from the upstream payload.
        message: String,
    },
    /// Success status whose payload carried no extractable answer.
    #[error("{provider} returned a malformed response: {reason}")]
    MalformedResponse {
        /// Backend that answered.
        provider: ProviderId,
        /// Why extraction failed.
        reason: String,
    },
    /// Per-call timeout elapsed before the backend answered.
    #[error("{provider} did not answer within {timeout:?}")]
    Timeout {
        /// Backend that was called.
        provider: ProviderId,
        /// Timeout that applied to the call.
        timeout: Duration,
    },
    /// Caller cancelled the request.
    #[error("Request to {provider} was cancelled")]
    Cancelled {
        /// Backend that was (or would have been) called.
        provider: ProviderId,
    },
}

/// Stable discriminant of [`AnswerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`AnswerError::InvalidCredential`].
    InvalidCredential,
    /// See [`AnswerError::RateLimited`].
    RateLimited,
    /// See [`AnswerError::UnknownProvider`].
    UnknownProvider,
    /// See [`AnswerError::MissingCredential`].
    MissingCredential,
    /// See [`AnswerError::UpstreamError`].
    UpstreamError,
    /// See [`AnswerError::MalformedResponse`].
    MalformedResponse,
    /// See [`AnswerError::Timeout`].
    Timeout,
    /// See [`AnswerError::Cancelled`].
    Cancelled,
}

impl AnswerError {
    /// Stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredential { .. } => ErrorKind::InvalidCredential,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::UnknownProvider(_) => ErrorKind::UnknownProvider,
            Self::MissingCredential(_) => ErrorKind::MissingCredential,
            Self::UpstreamError { .. } => ErrorKind::UpstreamError,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}
