use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method as HttpMethod, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use futures::{stream, StreamExt};
use tokio::net::TcpListener;

use crate::transport::{RequestDescriptor, Transport, TransportError, TransportResponse};

#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: String,
    set_cookie: Option<String>,
    delay: Option<Duration>,
    stall: Option<(usize, Duration)>,
}

impl Reply {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
            set_cookie: None,
            delay: None,
            stall: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.set_cookie = Some(cookie.into());
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sends the head and the first `at` bytes at once, the rest after `pause`.
    pub fn stalled_body(mut self, at: usize, pause: Duration) -> Self {
        self.stall = Some((at, pause));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub body: String,
    pub cookie: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Clone)]
struct MockState {
    routes: Arc<HashMap<String, Reply>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// In-process HTTP server answering canned replies under `/api`.
pub struct MockServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub async fn start(routes: Vec<(&str, Reply)>) -> Result<Self> {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            routes: Arc::new(
                routes
                    .into_iter()
                    .map(|(path, reply)| (path.to_string(), reply))
                    .collect(),
            ),
            requests: Arc::clone(&requests),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new().fallback(respond).with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}/api"),
            requests,
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.path_and_query.split('?').next() == Some(path))
            .count()
    }
}

async fn respond(
    State(state): State<MockState>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().strip_prefix("/api").unwrap_or(uri.path()).to_string();
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.clone(),
    };
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            method: method.to_string(),
            path_and_query,
            body,
            cookie: header_value(header::COOKIE),
            content_type: header_value(header::CONTENT_TYPE),
        });

    let Some(reply) = state.routes.get(&path).cloned() else {
        return (StatusCode::NOT_FOUND, r#"{"error":"Not found"}"#).into_response();
    };
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let body = match reply.stall {
        Some((at, pause)) => {
            let (head, tail) = reply.body.split_at(at.min(reply.body.len()));
            let (head, tail) = (Bytes::from(head.to_string()), Bytes::from(tail.to_string()));
            let chunks = stream::once(async move { Ok::<_, std::io::Error>(head) }).chain(
                stream::once(async move {
                    tokio::time::sleep(pause).await;
                    Ok(tail)
                }),
            );
            Body::from_stream(chunks)
        }
        None => Body::from(reply.body),
    };
    let mut response = (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response();
    if let Some(cookie) = reply.set_cookie {
        response.headers_mut().insert(
            header::SET_COOKIE,
            cookie.parse().expect("cookie header value"),
        );
    }
    response
}

/// A base URL nothing listens on.
pub async fn unreachable_base_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api"))
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Refuse,
    BrokenBody,
    Body(String),
}

/// Transport double keyed by endpoint, for failures a real server cannot
/// produce on demand.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, Scripted>,
    sent: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, endpoint: &str, reply: Scripted) -> Self {
        self.replies.insert(endpoint.to_string(), reply);
        self
    }

    pub fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, TransportError> {
        self.sent.lock().expect("sent lock").push(request.clone());
        match self.replies.get(request.endpoint()).cloned() {
            None | Some(Scripted::Refuse) => {
                Err(TransportError::Send("connection refused".to_string()))
            }
            Some(Scripted::BrokenBody) => Ok(TransportResponse::new(200, async {
                Err(TransportError::Read("connection reset mid-body".to_string()))
            })),
            Some(Scripted::Body(text)) => Ok(TransportResponse::new(200, async move { Ok(text) })),
        }
    }
}
