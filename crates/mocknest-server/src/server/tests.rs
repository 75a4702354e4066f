use super::handler::{
    error_response, execute_mock_request, preflight_response, split_project_path, ExecErrorCode,
    ExecutionContext,
};
use crate::model::{Mock, MockRequest, Project, ResponseDef, ResponseType};
use crate::request_log::RequestLogWriter;
use crate::store::InMemoryStore;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Response;
use std::sync::Arc;
use std::time::Duration;

fn project(id: &str, slug: &str) -> Project {
    Project {
        id: id.to_string(),
        slug: slug.to_string(),
        user_id: Some("u1".to_string()),
        organization_id: None,
    }
}

fn mock(id: &str, path: &str, method: &str) -> Mock {
    Mock {
        id: id.to_string(),
        project_id: "p1".to_string(),
        path: path.to_string(),
        method: method.to_string(),
        is_active: true,
        response_type: ResponseType::Json,
        response_delay_ms: 0,
    }
}

fn response(id: &str, mock_id: &str, body: &str) -> ResponseDef {
    ResponseDef {
        id: id.to_string(),
        mock_id: mock_id.to_string(),
        status_code: 200,
        headers: None,
        body: body.to_string(),
        is_default: false,
        weight: 100,
        conditions: None,
    }
}

fn get_request(path: &str) -> MockRequest {
    MockRequest {
        method: "GET".to_string(),
        path: path.to_string(),
        client_ip: "127.0.0.1".to_string(),
        ..MockRequest::default()
    }
}

fn context(store: Arc<InMemoryStore>) -> ExecutionContext {
    let log_writer = RequestLogWriter::spawn(store.clone(), 64);
    ExecutionContext { store, log_writer }
}

async fn body_string(response: Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn wait_for_logs(store: &InMemoryStore, count: usize) {
    for _ in 0..50 {
        if store.logs().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_matched_mock_returns_body_with_cors() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    store.insert_mock(mock("m1", "/hello", "GET"));
    store.insert_response(response("r1", "m1", r#"{"message":"hi"}"#));
    let ctx = context(store.clone());

    let resp = execute_mock_request(&ctx, "acme", get_request("/hello")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Origin").unwrap(),
        "*"
    );
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/json"
    );
    assert_eq!(body_string(resp).await, r#"{"message":"hi"}"#);

    wait_for_logs(&store, 1).await;
    let logs = store.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].mock_id.as_deref(), Some("m1"));
    assert_eq!(logs[0].response_status, 200);
}

#[tokio::test]
async fn test_unknown_slug_is_project_not_found_without_log() {
    let store = Arc::new(InMemoryStore::new());
    let ctx = context(store.clone());

    let resp = execute_mock_request(&ctx, "nope", get_request("/hello")).await;
    assert_eq!(resp.status(), 404);
    let body = body_string(resp).await;
    assert!(body.contains("PROJECT_NOT_FOUND"), "body: {body}");

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(store.logs().is_empty());
}

#[tokio::test]
async fn test_unmatched_path_is_mock_not_found_with_log() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    store.insert_mock(mock("m1", "/users/{id}", "GET"));
    store.insert_response(response("r1", "m1", "found"));
    let ctx = context(store.clone());

    // Template needs exactly two segments; `/users` alone must miss.
    let resp = execute_mock_request(&ctx, "acme", get_request("/users")).await;
    assert_eq!(resp.status(), 404);
    let body = body_string(resp).await;
    assert!(body.contains("MOCK_NOT_FOUND"), "body: {body}");

    wait_for_logs(&store, 1).await;
    let logs = store.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].project_id.as_deref(), Some("p1"));
    assert!(logs[0].mock_id.is_none());
    assert_eq!(logs[0].response_status, 404);
}

#[tokio::test]
async fn test_mock_without_responses_is_no_response_defined_without_log() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    store.insert_mock(mock("m1", "/hello", "GET"));
    let ctx = context(store.clone());

    let resp = execute_mock_request(&ctx, "acme", get_request("/hello")).await;
    assert_eq!(resp.status(), 404);
    let body = body_string(resp).await;
    assert!(body.contains("NO_RESPONSE_DEFINED"), "body: {body}");

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(store.logs().is_empty());
}

#[tokio::test]
async fn test_template_match_serves_and_conditions_see_params() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    store.insert_mock(mock("m1", "/users/{id}", "GET"));
    let mut numeric = response("r1", "m1", "numeric id");
    numeric.conditions =
        Some(r#"[{"type":"path","field":"id","operator":"regex","value":"^\\d+$"}]"#.to_string());
    store.insert_response(numeric);
    store.insert_response(response("r2", "m1", "generic"));
    let ctx = context(store.clone());

    let resp = execute_mock_request(&ctx, "acme", get_request("/users/42")).await;
    assert_eq!(body_string(resp).await, "numeric id");

    let resp = execute_mock_request(&ctx, "acme", get_request("/users/alice")).await;
    assert_eq!(body_string(resp).await, "generic");
}

#[tokio::test]
async fn test_content_type_follows_response_type_unless_overridden() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    let mut xml_mock = mock("m1", "/feed", "GET");
    xml_mock.response_type = ResponseType::Xml;
    store.insert_mock(xml_mock);
    store.insert_response(response("r1", "m1", "<feed/>"));

    let mut override_mock = mock("m2", "/csv", "GET");
    override_mock.response_type = ResponseType::Json;
    store.insert_mock(override_mock);
    let mut csv = response("r2", "m2", "a,b");
    csv.headers = Some(r#"{"content-type":"text/csv"}"#.to_string());
    store.insert_response(csv);
    let ctx = context(store);

    let resp = execute_mock_request(&ctx, "acme", get_request("/feed")).await;
    assert_eq!(resp.headers().get("Content-Type").unwrap(), "application/xml");

    let resp = execute_mock_request(&ctx, "acme", get_request("/csv")).await;
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/csv");
}

#[tokio::test]
async fn test_custom_status_and_headers_applied() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    store.insert_mock(mock("m1", "/teapot", "GET"));
    let mut teapot = response("r1", "m1", "short and stout");
    teapot.status_code = 418;
    teapot.headers = Some(r#"{"X-Env":"staging"}"#.to_string());
    store.insert_response(teapot);
    let ctx = context(store);

    let resp = execute_mock_request(&ctx, "acme", get_request("/teapot")).await;
    assert_eq!(resp.status(), 418);
    assert_eq!(resp.headers().get("X-Env").unwrap(), "staging");
}

#[tokio::test]
async fn test_invalid_stored_header_skipped_without_losing_status_or_cors() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    store.insert_mock(mock("m1", "/flaky", "GET"));
    let mut flaky = response("r1", "m1", "unavailable");
    flaky.status_code = 503;
    // "X Bad Header" is valid JSON but not a valid HTTP header name.
    flaky.headers = Some(r#"{"X Bad Header":"v","X-Env":"staging"}"#.to_string());
    store.insert_response(flaky);
    let ctx = context(store);

    let resp = execute_mock_request(&ctx, "acme", get_request("/flaky")).await;
    assert_eq!(resp.status(), 503);
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Origin").unwrap(),
        "*"
    );
    assert!(resp.headers().get("X Bad Header").is_none());
    assert_eq!(resp.headers().get("X-Env").unwrap(), "staging");
    assert_eq!(body_string(resp).await, "unavailable");
}

#[tokio::test]
async fn test_invalid_stored_status_code_falls_back_to_200() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    store.insert_mock(mock("m1", "/odd", "GET"));
    let mut odd = response("r1", "m1", "ok");
    odd.status_code = 99; // outside the valid HTTP range
    store.insert_response(odd);
    let ctx = context(store);

    let resp = execute_mock_request(&ctx, "acme", get_request("/odd")).await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_response_delay_is_applied() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_project(project("p1", "acme"));
    let mut slow = mock("m1", "/slow", "GET");
    slow.response_delay_ms = 50;
    store.insert_mock(slow);
    store.insert_response(response("r1", "m1", "eventually"));
    let ctx = context(store);

    let started = std::time::Instant::now();
    let resp = execute_mock_request(&ctx, "acme", get_request("/slow")).await;
    assert_eq!(resp.status(), 200);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_split_project_path() {
    assert_eq!(
        split_project_path("/acme/users/42"),
        ("acme".to_string(), "/users/42".to_string())
    );
    assert_eq!(
        split_project_path("/acme"),
        ("acme".to_string(), "/".to_string())
    );
    assert_eq!(
        split_project_path("/acme/"),
        ("acme".to_string(), "/".to_string())
    );
    assert_eq!(split_project_path("/"), ("".to_string(), "/".to_string()));
}

#[test]
fn test_preflight_is_204_with_cors() {
    let resp = preflight_response();
    assert_eq!(resp.status(), 204);
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Origin").unwrap(),
        "*"
    );
    assert!(resp
        .headers()
        .get("Access-Control-Allow-Methods")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("OPTIONS"));
}

#[tokio::test]
async fn test_error_envelope_shape() {
    let resp = error_response(ExecErrorCode::MockNotFound);
    assert_eq!(resp.status(), 404);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/json"
    );
    let body = body_string(resp).await;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["error"]["code"], "MOCK_NOT_FOUND");
    assert!(parsed["error"]["message"].is_string());

    assert_eq!(ExecErrorCode::InternalError.status(), 500);
}
