//! Typed fetch pipeline: one HTTP call in, one classified [`Outcome`] out.

use std::{fmt, sync::Arc};

use serde::de::DeserializeOwned;
use shared::error::ErrorSignal;
use tracing::{debug, warn};

use crate::transport::{RequestDescriptor, Transport, TransportError};

/// Result of one pipeline invocation. Exactly one stage decides it.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    NetworkFailure(TransportError),
    BodyReadFailure(TransportError),
    /// The trimmed body text that failed to parse.
    ParseFailure(String),
    ApplicationError(String),
    Success(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    NetworkFailure,
    BodyReadFailure,
    ParseFailure,
    ApplicationError,
    Success,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NetworkFailure => "network_failure",
            Self::BodyReadFailure => "body_read_failure",
            Self::ParseFailure => "parse_failure",
            Self::ApplicationError => "application_error",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> Outcome<T> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::NetworkFailure(_) => OutcomeKind::NetworkFailure,
            Self::BodyReadFailure(_) => OutcomeKind::BodyReadFailure,
            Self::ParseFailure(_) => OutcomeKind::ParseFailure,
            Self::ApplicationError(_) => OutcomeKind::ApplicationError,
            Self::Success(_) => OutcomeKind::Success,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::NetworkFailure(cause) => Outcome::NetworkFailure(cause),
            Self::BodyReadFailure(cause) => Outcome::BodyReadFailure(cause),
            Self::ParseFailure(raw) => Outcome::ParseFailure(raw),
            Self::ApplicationError(message) => Outcome::ApplicationError(message),
            Self::Success(value) => Outcome::Success(f(value)),
        }
    }
}

/// Parses trimmed body text and applies the error-signal check.
pub fn classify_body<T>(text: &str) -> Outcome<T>
where
    T: DeserializeOwned + ErrorSignal,
{
    let trimmed = text.trim();
    let value: T = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => return Outcome::ParseFailure(trimmed.to_string()),
    };

    if let Some(message) = value.error_message() {
        return Outcome::ApplicationError(message.to_string());
    }
    Outcome::Success(value)
}

#[derive(Clone)]
pub struct FetchPipeline {
    transport: Arc<dyn Transport>,
}

impl FetchPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Runs the call and classifies it. Never retries, never panics on a bad
    /// response, and emits exactly one diagnostic event.
    pub async fn execute<T>(&self, descriptor: RequestDescriptor) -> Outcome<T>
    where
        T: DeserializeOwned + ErrorSignal,
    {
        let (status, outcome) = self.run(&descriptor).await;
        record(&descriptor, status, &outcome);
        outcome
    }

    async fn run<T>(&self, descriptor: &RequestDescriptor) -> (Option<u16>, Outcome<T>)
    where
        T: DeserializeOwned + ErrorSignal,
    {
        let response = match self.transport.send(descriptor).await {
            Ok(response) => response,
            Err(cause) => return (None, Outcome::NetworkFailure(cause)),
        };

        let status = Some(response.status);
        let text = match response.body.await {
            Ok(text) => text,
            // An expired timeout is a network failure wherever it fires.
            Err(cause @ TransportError::Timeout(_)) => {
                return (status, Outcome::NetworkFailure(cause))
            }
            Err(cause) => return (status, Outcome::BodyReadFailure(cause)),
        };

        (status, classify_body(&text))
    }
}

fn record<T>(descriptor: &RequestDescriptor, status: Option<u16>, outcome: &Outcome<T>) {
    let method = descriptor.method().as_str();
    let endpoint = descriptor.endpoint();
    let kind = outcome.kind().as_str();

    match outcome {
        Outcome::NetworkFailure(cause) | Outcome::BodyReadFailure(cause) => warn!(
            method,
            endpoint,
            status,
            outcome = kind,
            error = %cause,
            "request failed"
        ),
        Outcome::ParseFailure(raw) => warn!(
            method,
            endpoint,
            status,
            outcome = kind,
            raw = %raw,
            "response body is not valid json for the expected shape"
        ),
        Outcome::ApplicationError(message) => warn!(
            method,
            endpoint,
            status,
            outcome = kind,
            message = %message,
            "server reported an application error"
        ),
        Outcome::Success(_) => debug!(method, endpoint, status, outcome = kind, "request succeeded"),
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
