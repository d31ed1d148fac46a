//! End-to-end API tests over an in-memory database
//!
//! Drives the full flow through the router: register, upload, poll,
//! detail, export, delete.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use salesforge_common::{auth::JwtManager, config::AppConfig, db::test_utils::setup_test_db, Repository};
use salesforge_gateway::{create_router, AppState};
use salesforge_ingestion::JobQueue;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

const CSV_HEADER: &str = "ORDERNUMBER,PRODUCTCODE,QUANTITYORDERED,PRICEEACH,ORDERDATE,SALES,STATUS,MONTH_ID,YEAR_ID,PRODUCTLINE,CUSTOMERNAME,COUNTRY,DEALSIZE";

fn sample_csv() -> String {
    format!(
        "{}\n{}\n{}\n{}\n",
        CSV_HEADER,
        "10100,S18_1749,30,100.0,2/24/2003 0:00,3000.0,Shipped,2,2003,Classic Cars,Land of Toys Inc.,USA,Medium",
        "10100,S18_1749,99,100.0,2/24/2003 0:00,9900.0,Shipped,2,2003,Classic Cars,Land of Toys Inc.,USA,Medium",
        "10101,S18_2248,50,55.0,5/7/2003 0:00,2750.0,Resolved,5,2003,Vintage Cars,Blauer See Auto Co.,Germany,Small",
    )
}

async fn app() -> Router {
    let repo = Repository::new(setup_test_db().await);
    let queue = JobQueue::start(repo.clone());
    let jwt = Arc::new(JwtManager::new("test-secret", 3600));

    let mut config = AppConfig::default();
    config.auth.jwt_secret = "test-secret".to_string();

    create_router(AppState {
        config: Arc::new(config),
        repo,
        queue,
        jwt,
    })
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn csv_upload(uri: &str, token: &str, csv: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv.to_string()))
        .unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn register(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/register",
            None,
            json!({ "email": email, "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["token"].as_str().unwrap().to_string()
}

/// Upload a CSV and wait for the materialization job to finish
async fn upload_and_wait(app: &Router, token: &str, csv: &str) -> String {
    let response = app
        .clone()
        .oneshot(csv_upload("/api/upload?filename=sales.csv", token, csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let stats = body_json(response).await;
    assert_eq!(stats["status"], "processing");
    assert_eq!(stats["row_count"], 0);
    let dataset_id = stats["dataset_id"].as_str().unwrap().to_string();

    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let response = app
            .clone()
            .oneshot(get(&format!("/api/datasets/{}/status", dataset_id), token))
            .await
            .unwrap();
        let summary = body_json(response).await;
        if summary["status"] != "processing" {
            break;
        }
    }

    dataset_id
}

#[tokio::test]
async fn test_upload_to_ready_flow() {
    let app = app().await;
    let token = register(&app, "alice@example.com").await;

    let dataset_id = upload_and_wait(&app, &token, &sample_csv()).await;

    // Status endpoint shows final counts
    let response = app
        .clone()
        .oneshot(get(&format!("/api/datasets/{}/status", dataset_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["status"], "ready");
    assert_eq!(summary["row_count"], 2);
    assert_eq!(summary["rows_dropped"], 1);

    // Detail view: aggregates plus the first page of records
    let response = app
        .clone()
        .oneshot(get(&format!("/api/datasets/{}", dataset_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    assert_eq!(detail["records"].as_array().unwrap().len(), 2);
    assert_eq!(detail["total_records"], 2);
    assert_eq!(detail["page"], 1);

    let aggregates = &detail["aggregates"];
    assert_eq!(aggregates["total_orders"], 2);
    assert_eq!(
        aggregates["total_sales"].as_f64().unwrap(),
        30.0 * 100.0 + 50.0 * 55.0
    );
    assert_eq!(aggregates["sales_by_country"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_detail_filters_and_pagination() {
    let app = app().await;
    let token = register(&app, "alice@example.com").await;
    let dataset_id = upload_and_wait(&app, &token, &sample_csv()).await;

    // A status filter narrows the page but not the aggregates
    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/datasets/{}?status_filter=Resolved", dataset_id),
            &token,
        ))
        .await
        .unwrap();
    let detail = body_json(response).await;
    assert_eq!(detail["total_records"], 1);
    let records = detail["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "Resolved");
    assert_eq!(records[0]["order_number"], 10101);
    assert_eq!(detail["aggregates"]["total_orders"], 2);

    // Page two of size one holds the remaining record
    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/datasets/{}?page=2&page_size=1", dataset_id),
            &token,
        ))
        .await
        .unwrap();
    let detail = body_json(response).await;
    assert_eq!(detail["records"].as_array().unwrap().len(), 1);
    assert_eq!(detail["total_records"], 2);

    // Unknown sort keys silently fall back instead of erroring
    let response = app
        .clone()
        .oneshot(get(
            &format!("/api/datasets/{}?sort_by=bogus", dataset_id),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_export_ordered_by_order_number() {
    let app = app().await;
    let token = register(&app, "alice@example.com").await;
    let dataset_id = upload_and_wait(&app, &token, &sample_csv()).await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/datasets/{}/export", dataset_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap(),
        "attachment; filename=\"sales.csv\""
    );

    let text = body_text(response).await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("order_number,quantity_ordered"));
    // Internal identity columns are excluded
    assert!(!lines[0].contains("dataset_id"));
    assert!(lines[1].starts_with("10100,"));
    assert!(lines[2].starts_with("10101,"));
}

#[tokio::test]
async fn test_ownership_isolation() {
    let app = app().await;
    let alice = register(&app, "alice@example.com").await;
    let bob = register(&app, "bob@example.com").await;

    let dataset_id = upload_and_wait(&app, &alice, &sample_csv()).await;

    // Bob cannot tell Alice's dataset exists
    for uri in [
        format!("/api/datasets/{}", dataset_id),
        format!("/api/datasets/{}/status", dataset_id),
        format!("/api/datasets/{}/export", dataset_id),
    ] {
        let response = app.clone().oneshot(get(&uri, &bob)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    let response = app.clone().oneshot(get("/api/datasets", &bob)).await.unwrap();
    let listing = body_json(response).await;
    assert!(listing["datasets"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_dataset() {
    let app = app().await;
    let token = register(&app, "alice@example.com").await;
    let dataset_id = upload_and_wait(&app, &token, &sample_csv()).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/datasets/{}", dataset_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/datasets/{}/status", dataset_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejected_uploads_create_no_dataset() {
    let app = app().await;
    let token = register(&app, "alice@example.com").await;

    // Wrong extension
    let response = app
        .clone()
        .oneshot(csv_upload("/api/upload?filename=sales.txt", &token, "x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing required columns, listed in the error message
    let response = app
        .clone()
        .oneshot(csv_upload(
            "/api/upload?filename=sales.csv",
            &token,
            "ORDERNUMBER,PRODUCTCODE\n10100,S18_1749\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    let message = error["error"]["message"].as_str().unwrap();
    assert!(message.contains("COUNTRY"));
    assert!(message.contains("ORDERDATE"));

    // Ragged rows are not tabular
    let ragged = format!("{}\n10100,S18_1749\n", CSV_HEADER);
    let response = app
        .clone()
        .oneshot(csv_upload("/api/upload?filename=sales.csv", &token, &ragged))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // None of the rejected uploads left a dataset behind
    let response = app.clone().oneshot(get("/api/datasets", &token)).await.unwrap();
    let listing = body_json(response).await;
    assert!(listing["datasets"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_auth_required() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/datasets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/datasets", "not-a-real-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = app().await;
    register(&app, "alice@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/register",
            None,
            json!({ "email": "alice@example.com", "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = app().await;
    register(&app, "alice@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/login",
            None,
            json!({ "email": "alice@example.com", "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.clone().oneshot(get("/api/me", &token)).await.unwrap();
    let me = body_json(response).await;
    assert_eq!(me["email"], "alice@example.com");

    // Wrong password reads the same as an unknown account
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/login",
            None,
            json!({ "email": "alice@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_failed_dataset_keeps_zeroed_counters() {
    let app = app().await;
    let token = register(&app, "alice@example.com").await;

    // Unparseable order date fails the job asynchronously
    let bad_csv = format!(
        "{}\n10100,S18_1749,30,100.0,never,3000.0,Shipped,2,2003,Classic Cars,Land of Toys Inc.,USA,Medium\n",
        CSV_HEADER
    );
    let dataset_id = upload_and_wait(&app, &token, &bad_csv).await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/datasets/{}/status", dataset_id), &token))
        .await
        .unwrap();
    let summary = body_json(response).await;
    assert_eq!(summary["status"], "failed");
    assert_eq!(summary["row_count"], 0);
    assert_eq!(summary["total_sales"], 0.0);

    // The detail view still renders gracefully with empty aggregates
    let response = app
        .clone()
        .oneshot(get(&format!("/api/datasets/{}", dataset_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    assert!(detail["records"].as_array().unwrap().is_empty());
    assert_eq!(detail["aggregates"]["total_orders"], 0);
    assert_eq!(detail["aggregates"]["avg_order_value"], 0.0);
}

#[tokio::test]
async fn test_health_probes() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ready = body_json(response).await;
    assert_eq!(ready["checks"]["database"]["status"], "up");
}
