//! Admin dashboard tests over real HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use api_resilience::admin::{self, AdminState};
use api_resilience::config::ResilienceConfig;
use api_resilience::errors::{ApiError, ErrorContext, ErrorSeverity};
use api_resilience::ResilienceContext;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;

const API_KEY: &str = "test-admin-key";

async fn start_admin(context: &ResilienceContext) -> (SocketAddr, tokio::task::JoinHandle<std::io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(admin::serve(
        listener,
        AdminState::new(context),
        context.shutdown().clone(),
    ));
    (addr, task)
}

fn context() -> ResilienceContext {
    let mut config = ResilienceConfig::default();
    config.admin.enabled = true;
    config.admin.api_key = API_KEY.to_string();
    ResilienceContext::new(config)
}

#[tokio::test]
async fn test_admin_requires_api_key() {
    let context = context();
    let (addr, task) = start_admin(&context).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("http://{}/admin/status", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("http://{}/admin/status", addr))
        .bearer_auth("wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("http://{}/admin/status", addr))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["status"], "operational");
    assert_eq!(status["monitor_capacity"], 1000);

    context.shutdown().trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("admin server should stop on shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_error_summary_recent_and_clear() {
    let context = context();
    let errors = context.errors();
    errors.handle(&ApiError::network("connection reset"), ErrorContext::new().with("url", "/a"), None);
    errors.handle(&ApiError::from_response(503, None), ErrorContext::new().with("url", "/b"), None);
    errors.handle_with_severity(
        &ApiError::new("ledger mismatch"),
        ErrorSeverity::Critical,
        ErrorContext::new(),
        None,
    );

    let (addr, _task) = start_admin(&context).await;
    let client = reqwest::Client::new();
    let base = format!("http://{}/admin", addr);

    let summary: Value = client
        .get(format!("{}/errors", base))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["total_errors"], 3);
    assert_eq!(summary["recent_errors_24h"], 3);
    assert_eq!(summary["counts_by_category"]["network"], 1);
    assert_eq!(summary["counts_by_category"]["external_service"], 1);
    assert_eq!(summary["counts_by_severity"]["critical"], 1);
    assert_eq!(summary["recent_critical_errors"].as_array().unwrap().len(), 1);

    let recent: Value = client
        .get(format!("{}/errors/recent?limit=2", base))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let recent = recent.as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[1]["error"]["message"], "ledger mismatch");

    let res = client
        .delete(format!("{}/errors", base))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(context.monitor().is_empty());

    context.shutdown().trigger();
}
