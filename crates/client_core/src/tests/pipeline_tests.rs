use std::time::Duration;

use super::*;
use axum::http::StatusCode;
use shared::protocol::{AuthResponse, LoadResponse};

use crate::{
    test_support::{unreachable_base_url, MockServer, Reply, Scripted, ScriptedTransport},
    transport::{Credentials, ReqwestTransport},
};

fn reqwest_pipeline(base_url: &str) -> FetchPipeline {
    let transport = ReqwestTransport::new(base_url, None).expect("transport");
    FetchPipeline::new(Arc::new(transport))
}

fn timed_pipeline(base_url: &str, timeout: Duration) -> FetchPipeline {
    let transport = ReqwestTransport::new(base_url, Some(timeout)).expect("transport");
    FetchPipeline::new(Arc::new(transport))
}

#[test]
fn classify_trims_before_parsing() {
    let outcome = classify_body::<AuthResponse>("  \n{}\n  ");
    assert_eq!(outcome, Outcome::Success(AuthResponse::default()));
}

#[test]
fn classify_keeps_trimmed_raw_text_on_parse_failure() {
    let outcome = classify_body::<AuthResponse>("  <html>Internal Server Error</html>\n");
    assert_eq!(
        outcome,
        Outcome::ParseFailure("<html>Internal Server Error</html>".to_string())
    );
}

#[test]
fn classify_surfaces_error_field_as_application_error() {
    let outcome = classify_body::<AuthResponse>(r#"{"error":"invalid credentials"}"#);
    assert_eq!(
        outcome,
        Outcome::ApplicationError("invalid credentials".to_string())
    );
}

#[test]
fn classify_treats_empty_error_as_success() {
    let outcome = classify_body::<AuthResponse>(r#"{"error":""}"#);
    assert_eq!(outcome.kind(), OutcomeKind::Success);
}

#[test]
fn classify_rejects_wrong_shape_as_parse_failure() {
    let outcome = classify_body::<LoadResponse>(r#"{"load1":"high"}"#);
    assert_eq!(outcome.kind(), OutcomeKind::ParseFailure);
}

#[test]
fn outcome_map_preserves_failures() {
    let failure: Outcome<u8> = Outcome::ParseFailure("x".to_string());
    assert_eq!(failure.map(|v| v + 1), Outcome::ParseFailure("x".to_string()));
    assert_eq!(Outcome::Success(1_u8).map(|v| v + 1).success(), Some(2));
}

#[tokio::test]
async fn execute_returns_typed_success() {
    let server = MockServer::start(vec![(
        "/load",
        Reply::json(r#"{"load1":0.1,"load5":0.2,"load15":0.3}"#),
    )])
    .await
    .expect("server");
    let pipeline = reqwest_pipeline(&server.base_url);

    let outcome = pipeline
        .execute::<LoadResponse>(RequestDescriptor::get("/load"))
        .await;

    let value = outcome.success().expect("success");
    assert_eq!(value.load1, Some(0.1));
    assert_eq!(value.load15, Some(0.3));
}

#[tokio::test]
async fn status_code_does_not_override_body_classification() {
    let server = MockServer::start(vec![
        (
            "/user-profile",
            Reply::json(r#"{"error":"Not authenticated"}"#).with_status(StatusCode::UNAUTHORIZED),
        ),
        (
            "/uptime",
            Reply::json(r#"{"uptime":1.5}"#).with_status(StatusCode::INTERNAL_SERVER_ERROR),
        ),
    ])
    .await
    .expect("server");
    let pipeline = reqwest_pipeline(&server.base_url);

    let profile = pipeline
        .execute::<AuthResponse>(RequestDescriptor::get("/user-profile"))
        .await;
    assert_eq!(
        profile,
        Outcome::ApplicationError("Not authenticated".to_string())
    );

    let uptime = pipeline
        .execute::<shared::protocol::UptimeResponse>(RequestDescriptor::get("/uptime"))
        .await;
    assert!(uptime.is_success());
}

#[tokio::test]
async fn execute_reports_parse_failure_with_raw_body() {
    let server = MockServer::start(vec![("/mem", Reply::json("  mem_total=oops \n"))])
        .await
        .expect("server");
    let pipeline = reqwest_pipeline(&server.base_url);

    let outcome = pipeline
        .execute::<AuthResponse>(RequestDescriptor::get("/mem"))
        .await;
    assert_eq!(outcome, Outcome::ParseFailure("mem_total=oops".to_string()));
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    let base_url = unreachable_base_url().await.expect("base url");
    let pipeline = reqwest_pipeline(&base_url);

    let outcome = pipeline
        .execute::<AuthResponse>(RequestDescriptor::post_empty("/logout"))
        .await;
    assert_eq!(outcome.kind(), OutcomeKind::NetworkFailure);
}

#[tokio::test]
async fn broken_body_is_a_body_read_failure() {
    let transport = ScriptedTransport::new().reply("/cpu", Scripted::BrokenBody);
    let pipeline = FetchPipeline::new(Arc::new(transport));

    let outcome = pipeline
        .execute::<AuthResponse>(RequestDescriptor::get("/cpu"))
        .await;
    assert!(matches!(
        outcome,
        Outcome::BodyReadFailure(TransportError::Read(_))
    ));
}

#[tokio::test]
async fn form_body_is_url_encoded_in_field_order() {
    let server = MockServer::start(vec![("/login", Reply::json("{}"))])
        .await
        .expect("server");
    let pipeline = reqwest_pipeline(&server.base_url);

    let descriptor = RequestDescriptor::post_form(
        "/login",
        [("username", "alice"), ("password", "p@ss word")],
    );
    let outcome = pipeline.execute::<AuthResponse>(descriptor).await;
    assert!(outcome.is_success());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].body, "username=alice&password=p%40ss+word");
    assert_eq!(
        requests[0].content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
}

#[tokio::test]
async fn session_cookie_only_travels_with_included_credentials() {
    let server = MockServer::start(vec![
        ("/login", Reply::json("{}").with_cookie("sid=abc123; Path=/")),
        ("/documents", Reply::json(r#"{"documents":[]}"#)),
    ])
    .await
    .expect("server");
    let pipeline = reqwest_pipeline(&server.base_url);

    pipeline
        .execute::<AuthResponse>(RequestDescriptor::post_form("/login", [("username", "a")]))
        .await;
    pipeline
        .execute::<AuthResponse>(RequestDescriptor::get("/documents"))
        .await;
    pipeline
        .execute::<AuthResponse>(
            RequestDescriptor::get("/documents").with_credentials(Credentials::Omit),
        )
        .await;

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].cookie.as_deref(), Some("sid=abc123"));
    assert_eq!(requests[2].cookie, None);
}

#[tokio::test]
async fn timeout_before_response_head_is_a_network_failure() {
    let server = MockServer::start(vec![(
        "/uptime",
        Reply::json(r#"{"uptime":1}"#).delayed(Duration::from_millis(600)),
    )])
    .await
    .expect("server");
    let pipeline = timed_pipeline(&server.base_url, Duration::from_millis(200));

    let outcome = pipeline
        .execute::<shared::protocol::UptimeResponse>(RequestDescriptor::get("/uptime"))
        .await;
    assert!(matches!(
        outcome,
        Outcome::NetworkFailure(TransportError::Timeout(_))
    ));
}

#[tokio::test]
async fn timeout_while_reading_body_is_a_network_failure() {
    let server = MockServer::start(vec![(
        "/uptime",
        Reply::json(r#"{"uptime":1}"#).stalled_body(1, Duration::from_millis(600)),
    )])
    .await
    .expect("server");
    let pipeline = timed_pipeline(&server.base_url, Duration::from_millis(200));

    let outcome = pipeline
        .execute::<shared::protocol::UptimeResponse>(RequestDescriptor::get("/uptime"))
        .await;
    assert_eq!(outcome.kind(), OutcomeKind::NetworkFailure);
    assert!(matches!(
        outcome,
        Outcome::NetworkFailure(TransportError::Timeout(_))
    ));
}

#[tokio::test]
async fn slow_replies_succeed_without_a_configured_timeout() {
    let server = MockServer::start(vec![
        (
            "/uptime",
            Reply::json(r#"{"uptime":1}"#).delayed(Duration::from_millis(400)),
        ),
        (
            "/load",
            Reply::json(r#"{"load1":0.1,"load5":0.2,"load15":0.3}"#)
                .stalled_body(3, Duration::from_millis(400)),
        ),
    ])
    .await
    .expect("server");
    let pipeline = reqwest_pipeline(&server.base_url);

    let uptime = pipeline
        .execute::<shared::protocol::UptimeResponse>(RequestDescriptor::get("/uptime"))
        .await;
    assert!(uptime.is_success());

    let load = pipeline
        .execute::<LoadResponse>(RequestDescriptor::get("/load"))
        .await;
    assert_eq!(load.success().and_then(|value| value.load5), Some(0.2));
}
