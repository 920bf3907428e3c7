use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;
use tokio::net::TcpListener;

use assess_core::model::{
    ActivityDefinition, ActivityId, ActivityKind, AttemptId, ScoringParams, Unit, UnitId,
};
use assess_core::Ledger;
use services::content::{ContentFormat, ContentSource, HttpContentSource};
use services::scoring::{HttpScoringClient, ScoringClient, SubmissionPayload};
use services::{ContentError, ScoringError, ServiceConfig};

const LESSON: &str = r#"{"id":"l1","title":"Git basics","kind":"lesson",
    "points":["p1","p2","p3","p4","p5","p6","p7","p8","p9"]}"#;

fn config(server: &Server) -> ServiceConfig {
    ServiceConfig::new(&server.url()).unwrap()
}

fn content(config: ServiceConfig) -> HttpContentSource {
    HttpContentSource::new(config).unwrap()
}

fn scoring(config: ServiceConfig) -> HttpScoringClient {
    HttpScoringClient::new(config).unwrap()
}

fn puzzle_payload() -> SubmissionPayload {
    let definition = ActivityDefinition::new(
        ActivityId::new("puzzle-1"),
        "Release steps",
        ActivityKind::Puzzle,
        ["b", "a"]
            .into_iter()
            .map(|id| Unit::step(UnitId::new(id), format!("step {id}")))
            .collect(),
        ScoringParams::default(),
        None,
    )
    .unwrap();
    let ledger = Ledger::for_definition(&definition).unwrap();
    SubmissionPayload::from_ledger(&ledger).unwrap()
}

/// Accepts connections and never answers them.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn fetch_sends_version_hint_and_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/activities/l1")
        .match_query(Matcher::UrlEncoded("version".into(), "points".into()))
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(LESSON)
        .create_async()
        .await;

    let source = content(config(&server).with_auth_token("secret"));
    let definition = source
        .fetch_activity(&ActivityId::new("l1"), Some(ContentFormat::Points))
        .await
        .unwrap();

    assert_eq!(definition.id(), &ActivityId::new("l1"));
    assert_eq!(definition.units().len(), 3);
    mock.assert_async().await;
}

#[tokio::test]
async fn fetch_without_token_sends_no_authorization() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/activities/l1")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(LESSON)
        .create_async()
        .await;

    content(config(&server))
        .fetch_activity(&ActivityId::new("l1"), None)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_credentials_are_unauthorized() {
    let mut server = Server::new_async().await;
    let mut mocks = Vec::new();
    for (id, status) in [("l1", 401), ("l2", 403)] {
        let mock = server
            .mock("GET", format!("/activities/{id}").as_str())
            .with_status(status)
            .with_body(r#"{"message":"token expired"}"#)
            .create_async()
            .await;
        mocks.push(mock);
    }

    let source = content(config(&server));
    for id in ["l1", "l2"] {
        let err = source
            .fetch_activity(&ActivityId::new(id), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Unauthorized), "{id}: {err:?}");
    }
}

#[tokio::test]
async fn error_status_carries_the_server_message() {
    let mut server = Server::new_async().await;
    let _gone = server
        .mock("GET", "/activities/gone")
        .with_status(404)
        .with_body(r#"{"message":"activity retired"}"#)
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/activities/broken")
        .with_status(502)
        .with_body(r#"{"error":"upstream down"}"#)
        .create_async()
        .await;
    let _silent = server
        .mock("GET", "/activities/silent")
        .with_status(500)
        .create_async()
        .await;

    let source = content(config(&server));
    let fetch = |id: &'static str| {
        let source = source.clone();
        async move {
            source
                .fetch_activity(&ActivityId::new(id), None)
                .await
                .unwrap_err()
        }
    };

    assert!(matches!(
        fetch("gone").await,
        ContentError::Status { status: 404, message: Some(ref m) } if m == "activity retired"
    ));
    assert!(matches!(
        fetch("broken").await,
        ContentError::Status { status: 502, message: Some(ref m) } if m == "upstream down"
    ));
    assert!(matches!(
        fetch("silent").await,
        ContentError::Status { status: 500, message: None }
    ));
}

#[tokio::test]
async fn payload_for_another_activity_is_malformed() {
    let mut server = Server::new_async().await;
    let _other = server
        .mock("GET", "/activities/l2")
        .with_status(200)
        .with_body(LESSON)
        .create_async()
        .await;

    let err = content(config(&server))
        .fetch_activity(&ActivityId::new("l2"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::Malformed(ref m) if m.contains("l1")), "{err:?}");
}

#[tokio::test]
async fn slow_content_service_times_out() {
    let base = silent_server().await;
    let config = ServiceConfig::new(&base)
        .unwrap()
        .with_timeout(Duration::from_millis(200));

    let err = content(config)
        .fetch_activity(&ActivityId::new("l1"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::Http(ref e) if e.is_timeout()), "{err:?}");
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn attempt_is_posted_as_json_and_verdict_decoded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/activities/puzzle-1/attempts")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::Json(json!({"order": ["b", "a"]})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"attempt_id":"att-1","score":2,"max_score":2,"passed":true}"#)
        .create_async()
        .await;

    let client = scoring(config(&server).with_auth_token("secret"));
    let result = client
        .submit_attempt(&ActivityId::new("puzzle-1"), &puzzle_payload())
        .await
        .unwrap();

    assert_eq!(result.attempt_id(), &AttemptId::new("att-1"));
    assert_eq!(result.score(), Some(2));
    assert!(result.passed());
    mock.assert_async().await;
}

#[tokio::test]
async fn scorer_refusals_map_to_scoring_errors() {
    let mut server = Server::new_async().await;
    let _locked = server
        .mock("POST", "/activities/locked/attempts")
        .with_status(403)
        .create_async()
        .await;
    let _closed = server
        .mock("POST", "/activities/closed/attempts")
        .with_status(422)
        .with_body(r#"{"error":"attempt window closed"}"#)
        .create_async()
        .await;
    let _garbled = server
        .mock("POST", "/activities/garbled/attempts")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let client = scoring(config(&server));
    let payload = puzzle_payload();
    let submit = |id: &'static str| {
        let client = client.clone();
        let payload = payload.clone();
        async move {
            client
                .submit_attempt(&ActivityId::new(id), &payload)
                .await
                .unwrap_err()
        }
    };

    assert!(matches!(submit("locked").await, ScoringError::Unauthorized));
    assert!(matches!(
        submit("closed").await,
        ScoringError::Status { status: 422, message: Some(ref m) } if m == "attempt window closed"
    ));
    assert!(matches!(submit("garbled").await, ScoringError::Malformed(_)));
}

#[tokio::test]
async fn slow_scorer_times_out() {
    let base = silent_server().await;
    let config = ServiceConfig::new(&base)
        .unwrap()
        .with_timeout(Duration::from_millis(200));

    let err = scoring(config)
        .submit_attempt(&ActivityId::new("puzzle-1"), &puzzle_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::Http(ref e) if e.is_timeout()), "{err:?}");
}
