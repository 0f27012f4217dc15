use axum::body::Body;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use vulnboard::server::{AppState, build_router};
use vulnboard::storage::Database;

fn create_test_state() -> AppState {
    let db = Database::new(":memory:").unwrap();
    AppState::new(db)
}

fn app(state: &AppState) -> axum::Router {
    build_router(state.clone())
}

fn make_request(method: &str, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_text(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

fn vulnerability(id: &str, severity: &str, status: &str, package: &str) -> Value {
    json!({
        "id": id,
        "severity": severity,
        "cvss": 7.5,
        "status": status,
        "package_name": package,
        "current_version": "1.0.0",
        "fixed_version": "1.0.1",
        "description": format!("{id} in {package}"),
        "published_date": (Utc::now() - Duration::hours(1)).to_rfc3339(),
        "link": format!("https://nvd.nist.gov/vuln/detail/{id}"),
        "risk_factors": ["Remote Code Execution"]
    })
}

fn scan(scan_id: &str, timestamp: &str, vulnerabilities: Vec<Value>) -> Value {
    json!({
        "scan_id": scan_id,
        "timestamp": timestamp,
        "scan_status": "completed",
        "resource_type": "container",
        "resource_name": "payment-processor:latest",
        "vulnerabilities": vulnerabilities,
        "summary": {}
    })
}

async fn seed(state: &AppState) {
    let batch = json!([
        scan(
            "scan-1",
            "2025-01-01T10:00:00Z",
            vec![
                vulnerability("CVE-2025-0001", "HIGH", "active", "openssl"),
                vulnerability("CVE-2025-0002", "LOW", "fixed", "zlib"),
            ],
        ),
        scan(
            "scan-2",
            "2025-01-02T10:00:00Z",
            vec![vulnerability("CVE-2025-0003", "HIGH", "fixed", "openssl")],
        ),
    ]);

    let response = app(state)
        .oneshot(make_request("POST", "/api/scan", Some(batch)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_state();
    let response = app(&state)
        .oneshot(make_request("GET", "/api/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_submit_scan_created() {
    let state = create_test_state();
    let batch = json!([scan(
        "scan-1",
        "2025-01-01T10:00:00Z",
        vec![vulnerability("CVE-2025-0001", "CRITICAL", "active", "openssl")],
    )]);

    let response = app(&state)
        .oneshot(make_request("POST", "/api/scan", Some(batch)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["message"], "Scan results processed successfully");
}

#[tokio::test]
async fn test_submit_scan_malformed_json() {
    let state = create_test_state();
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/scan")
        .header("content-type", "application/json")
        .body(Body::from("[{\"scan_id\": "))
        .unwrap();

    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["error"], "Invalid request payload");
}

#[tokio::test]
async fn test_submit_scan_wrong_shape() {
    let state = create_test_state();
    let response = app(&state)
        .oneshot(make_request("POST", "/api/scan", Some(json!({"scan_id": "x"}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_empty_batch_is_server_error() {
    let state = create_test_state();
    let response = app(&state)
        .oneshot(make_request("POST", "/api/scan", Some(json!([]))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response_json(response).await;
    assert_eq!(body["error"], "no scan results provided");
}

#[tokio::test]
async fn test_submit_rolls_back_on_invalid_row() {
    let state = create_test_state();
    let mut bad = vulnerability("CVE-2025-0009", "HIGH", "active", "curl");
    bad["cvss"] = json!(42.0);
    let batch = json!([
        scan("scan-ok", "2025-01-01T10:00:00Z", vec![]),
        scan("scan-bad", "2025-01-01T11:00:00Z", vec![bad]),
    ]);

    let response = app(&state)
        .oneshot(make_request("POST", "/api/scan", Some(batch)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/stats", None))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["total_scans"], 0);
}

#[tokio::test]
async fn test_list_vulnerabilities_with_filters() {
    let state = create_test_state();
    seed(&state).await;

    let response = app(&state)
        .oneshot(make_request("GET", "/api/vulnerabilities", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let response = app(&state)
        .oneshot(make_request(
            "GET",
            "/api/vulnerabilities?severity=HIGH&status=active",
            None,
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "CVE-2025-0001");
    assert_eq!(items[0]["risk_factors"], json!(["Remote Code Execution"]));

    let response = app(&state)
        .oneshot(make_request("GET", "/api/vulnerabilities?package=openssl", None))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_vulnerability() {
    let state = create_test_state();
    seed(&state).await;

    let response = app(&state)
        .oneshot(make_request("GET", "/api/vulnerabilities/CVE-2025-0002", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["id"], "CVE-2025-0002");
    assert_eq!(body["severity"], "LOW");
    assert_eq!(body["package_name"], "zlib");
    assert_eq!(body["scan_id"], "scan-1");
}

#[tokio::test]
async fn test_get_unknown_vulnerability_not_found() {
    let state = create_test_state();
    let response = app(&state)
        .oneshot(make_request("GET", "/api/vulnerabilities/CVE-0000-0000", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response_json(response).await;
    assert_eq!(body["error"], "Vulnerability not found");
}

#[tokio::test]
async fn test_stats() {
    let state = create_test_state();
    seed(&state).await;

    let response = app(&state)
        .oneshot(make_request("GET", "/api/stats", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["total_scans"], 2);
    assert_eq!(body["vulnerabilities_by_severity"]["HIGH"], 2);
    assert_eq!(body["vulnerabilities_by_severity"]["LOW"], 1);
    assert_eq!(body["active_vulnerabilities"], 1);
    assert_eq!(body["fixed_vulnerabilities"], 2);
}

#[tokio::test]
async fn test_recent_scans_limit() {
    let state = create_test_state();
    seed(&state).await;

    let response = app(&state)
        .oneshot(make_request("GET", "/api/scans?limit=1", None))
        .await
        .unwrap();
    let body = response_json(response).await;
    let scans = body.as_array().unwrap();
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0]["scan_id"], "scan-2");
    assert_eq!(scans[0]["summary"]["total_vulnerabilities"], 1);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/scans?limit=abc", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_scan() {
    let state = create_test_state();
    seed(&state).await;

    let response = app(&state)
        .oneshot(make_request("GET", "/api/scans/scan-1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["scan_id"], "scan-1");
    assert_eq!(body["vulnerabilities"].as_array().unwrap().len(), 2);
    assert_eq!(body["summary"]["total_vulnerabilities"], 2);
    assert_eq!(body["summary"]["compliant"], false);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/scans/missing", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trends() {
    let state = create_test_state();
    seed(&state).await;

    let response = app(&state)
        .oneshot(make_request("GET", "/api/trends?days=7", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let high = body["HIGH"].as_array().unwrap();
    assert_eq!(high.len(), 7);
    let total: i64 = high.iter().map(|v| v.as_i64().unwrap()).sum();
    assert_eq!(total, 2);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/trends?days=soon", None))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["LOW"].as_array().unwrap().len(), 30);
}

#[tokio::test]
async fn test_metrics_after_ingest() {
    let state = create_test_state();
    seed(&state).await;

    let response = app(&state)
        .oneshot(make_request("GET", "/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_text(response).await;
    assert!(body.contains(r#"vulnboard_ingest_batches_total{result="success"} 1"#));
    assert!(body.contains("vulnboard_ingested_scans_total 2"));
    assert!(body.contains("vulnboard_ingested_vulnerabilities_total 3"));
}

#[tokio::test]
async fn test_openapi_document() {
    let state = create_test_state();
    let response = app(&state)
        .oneshot(make_request("GET", "/api-docs/openapi.json", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["paths"]["/api/scan"].is_object());
    assert!(body["paths"]["/api/vulnerabilities/{id}"].is_object());
}
