/*
 * server_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Router tests driven through tower's oneshot with a fake executor.
 */

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use pretty_assertions::assert_eq;
use sqlforge_core::{Error as CoreError, QueryExecutor};
use sqlforge_hub::{HubConfig, HubContext, build_router};
use sqlforge_tabular::Row;
use tower::ServiceExt;

const BOUNDARY: &str = "sqlforge-test-boundary";

/// Returns fixed rows (or fails) and records every query it was given.
struct FakeExecutor {
    rows: Vec<Row>,
    fail: bool,
    seen: Mutex<Vec<String>>,
}

impl FakeExecutor {
    fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows,
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            rows: Vec::new(),
            fail: true,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute(&self, sql: &str) -> sqlforge_core::Result<Vec<Row>> {
        self.seen.lock().unwrap().push(sql.to_string());
        if self.fail {
            return Err(CoreError::Io(std::io::Error::other("database unavailable")));
        }
        Ok(self.rows.clone())
    }
}

fn people() -> Vec<Row> {
    vec![
        [("name", "ann"), ("id", "1")].into_iter().collect(),
        [("name", "cid"), ("id", "3")].into_iter().collect(),
    ]
}

fn app_with(executor: Arc<FakeExecutor>, config: &HubConfig) -> Router {
    build_router(Arc::new(HubContext::new(executor)), config)
}

fn app(executor: Arc<FakeExecutor>) -> Router {
    app_with(executor, &HubConfig::default())
}

/// (field name, file name, content)
fn multipart_body(parts: &[(&str, &str, &str)]) -> String {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        body.push_str(&format!(
            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
        ));
        body.push_str("Content-Type: application/octet-stream\r\n\r\n");
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn query_request(parts: &[(&str, &str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/query")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

const LOOKUP: &str =
    "SELECT id, name FROM people WHERE name IN ({{ range $i, $r := .Rows }}{{ if $i }}, {{ end }}'{{ $r.name }}'{{ end }})";

#[tokio::test]
async fn test_health() {
    let response = app(Arc::new(FakeExecutor::returning(Vec::new())))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_query_streams_csv() {
    let executor = Arc::new(FakeExecutor::returning(people()));
    let response = app(executor.clone())
        .oneshot(query_request(&[
            ("sql_file", "lookup.sql", LOOKUP),
            ("values_file", "names.csv", "name\nann\ncid\n"),
            ("config", "config.yaml", "output: result.csv\n"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(body_text(response).await, "id,name\n1,ann\n3,cid\n");
    assert_eq!(
        *executor.seen.lock().unwrap(),
        vec!["SELECT id, name FROM people WHERE name IN ('ann', 'cid')".to_string()]
    );
}

#[tokio::test]
async fn test_query_defaults_to_text_table() {
    let response = app(Arc::new(FakeExecutor::returning(people())))
        .oneshot(query_request(&[("sql_file", "q.sql", "SELECT id, name FROM people")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    let text = body_text(response).await;
    assert!(text.starts_with("id"));
    assert!(text.contains("--------"));
}

#[tokio::test]
async fn test_query_xlsx_json_config() {
    let response = app(Arc::new(FakeExecutor::returning(people())))
        .oneshot(query_request(&[
            ("sql_file", "q.sql", "SELECT id, name FROM people"),
            ("config", "config.json", r#"{"output": "out.xlsx", "sheet": "People"}"#),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..2], b"PK");
}

#[tokio::test]
async fn test_missing_fields_is_bad_request() {
    let executor = Arc::new(FakeExecutor::returning(people()));
    let response = app(executor.clone())
        .oneshot(query_request(&[
            ("sql_file", "q.sql", "{{ range .Rows }}{{ .email }}{{ end }}"),
            ("values_file", "names.csv", "name\nann\n"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("\"email\""));
    assert!(executor.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_sql_file() {
    let response = app(Arc::new(FakeExecutor::returning(people())))
        .oneshot(query_request(&[("config", "c.yaml", "output: a.csv\n")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Missing sql_file");
}

#[tokio::test]
async fn test_unsupported_values_file() {
    let response = app(Arc::new(FakeExecutor::returning(people())))
        .oneshot(query_request(&[
            ("sql_file", "q.sql", "SELECT 1"),
            ("values_file", "values.json", "{}"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "unsupported file format: values.json");
}

#[tokio::test]
async fn test_unsupported_output_skips_database() {
    let executor = Arc::new(FakeExecutor::returning(people()));
    let response = app(executor.clone())
        .oneshot(query_request(&[
            ("sql_file", "q.sql", "DELETE FROM people"),
            ("config", "c.yaml", "output: result.parquet\n"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "unsupported file format: result.parquet"
    );
    assert!(executor.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_template_syntax_error() {
    let response = app(Arc::new(FakeExecutor::returning(people())))
        .oneshot(query_request(&[("sql_file", "q.sql", "SELECT {{ if }}")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_database_failure_is_server_error() {
    let response = app(Arc::new(FakeExecutor::failing()))
        .oneshot(query_request(&[("sql_file", "q.sql", "SELECT 1")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("database unavailable"));
}

#[tokio::test]
async fn test_empty_result_for_csv() {
    let response = app(Arc::new(FakeExecutor::returning(Vec::new())))
        .oneshot(query_request(&[
            ("sql_file", "q.sql", "SELECT 1 WHERE 0"),
            ("config", "c.yaml", "output: a.csv\n"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "no data to generate");
}

#[tokio::test]
async fn test_bad_config() {
    let response = app(Arc::new(FakeExecutor::returning(people())))
        .oneshot(query_request(&[
            ("sql_file", "q.sql", "SELECT 1"),
            ("config", "c.yaml", "sheet-index-in: [not, a, number]\n"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_limit() {
    let config = HubConfig {
        max_upload_bytes: 64,
        ..Default::default()
    };
    let big = "x".repeat(1024);
    let response = app_with(Arc::new(FakeExecutor::returning(people())), &config)
        .oneshot(query_request(&[("sql_file", "q.sql", &big)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_static_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>sqlforge</h1>").unwrap();
    let config = HubConfig {
        static_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };

    let app = app_with(Arc::new(FakeExecutor::returning(Vec::new())), &config);
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "<h1>sqlforge</h1>");

    let response = app
        .oneshot(Request::builder().uri("/missing.txt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_without_static_dir() {
    let response = app(Arc::new(FakeExecutor::returning(Vec::new())))
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
