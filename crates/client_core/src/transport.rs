//! HTTP transport seam: request descriptors and the reqwest-backed sender.
//!
//! The transport only moves bytes. Sending and reading the body are separate
//! steps so the pipeline can tell a connection failure from a truncated body.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use reqwest::{cookie::Jar, Client};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    None,
    /// `application/x-www-form-urlencoded` pairs, sent in order.
    Form(Vec<(String, String)>),
}

/// Whether the session cookie travels with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    Include,
    Omit,
}

/// One HTTP call, built fresh per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: Method,
    endpoint: String,
    body: RequestBody,
    credentials: Credentials,
}

impl RequestDescriptor {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            endpoint: endpoint.into(),
            body: RequestBody::None,
            credentials: Credentials::Include,
        }
    }

    pub fn post_form<I, K, V>(endpoint: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: Method::Post,
            endpoint: endpoint.into(),
            body: RequestBody::Form(
                fields
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
            credentials: Credentials::Include,
        }
    }

    pub fn post_empty(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            endpoint: endpoint.into(),
            body: RequestBody::None,
            credentials: Credentials::Include,
        }
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        Self {
            credentials,
            ..self
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid request url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request could not be completed: {0}")]
    Send(String),
    #[error("response body could not be read: {0}")]
    Read(String),
    /// The configured request timeout expired, before or after the response head.
    #[error("request timed out: {0}")]
    Timeout(String),
}

impl TransportError {
    fn from_reqwest(error: reqwest::Error, otherwise: fn(String) -> Self) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else {
            otherwise(error.to_string())
        }
    }
}

/// Response head plus a body that has not been read yet.
pub struct TransportResponse {
    pub status: u16,
    pub body: BoxFuture<'static, Result<String, TransportError>>,
}

impl TransportResponse {
    pub fn new(
        status: u16,
        body: impl std::future::Future<Output = Result<String, TransportError>> + Send + 'static,
    ) -> Self {
        Self {
            status,
            body: body.boxed(),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, TransportError>;
}

/// Transport over reqwest. Requests with [`Credentials::Include`] share one
/// cookie jar so the session established by login is sent on later calls.
pub struct ReqwestTransport {
    base_url: String,
    session: Client,
    anonymous: Client,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let parsed = Url::parse(base_url).map_err(|error| TransportError::InvalidUrl {
            url: base_url.to_string(),
            reason: error.to_string(),
        })?;

        let jar = Arc::new(Jar::default());
        let mut session = Client::builder().cookie_provider(jar);
        let mut anonymous = Client::builder();
        if let Some(timeout) = timeout {
            session = session.timeout(timeout);
            anonymous = anonymous.timeout(timeout);
        }

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            session: session
                .build()
                .map_err(|error| TransportError::Send(error.to_string()))?,
            anonymous: anonymous
                .build()
                .map_err(|error| TransportError::Send(error.to_string()))?,
        })
    }

    fn url_for(&self, endpoint: &str) -> Result<Url, TransportError> {
        let joined = if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        };
        Url::parse(&joined).map_err(|error| TransportError::InvalidUrl {
            url: joined.clone(),
            reason: error.to_string(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let url = self.url_for(request.endpoint())?;
        let client = match request.credentials() {
            Credentials::Include => &self.session,
            Credentials::Omit => &self.anonymous,
        };

        let builder = match request.method() {
            Method::Get => client.get(url),
            Method::Post => client.post(url),
        };
        let builder = match request.body() {
            RequestBody::None => builder,
            RequestBody::Form(fields) => builder.form(fields),
        };

        let response = builder
            .send()
            .await
            .map_err(|error| TransportError::from_reqwest(error, TransportError::Send))?;
        let status = response.status().as_u16();

        Ok(TransportResponse::new(status, async move {
            response
                .text()
                .await
                .map_err(|error| TransportError::from_reqwest(error, TransportError::Read))
        }))
    }
}
