//! Management API tests
//!
//! Drives `/oauth_interface/*` through an in-process actix service backed by
//! the in-memory store, the real refresh scheduler, and a mock token server.

use actix_web::{test, App};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use tokensync::config::{HttpClientConfig, RefreshConfig};
use tokensync::oauth::{
    JobScheduler, MemoryOAuthStore, OAuthService, PlaceholderMode, RefreshScheduler, TokenEndpointValidator,
};
use tokensync::web::configure_oauth_api;

fn create_test_service() -> Arc<OAuthService> {
    let http = HttpClientConfig {
        timeout_seconds: 5,
        ..Default::default()
    };
    let validator = TokenEndpointValidator::new(&http, PlaceholderMode::First).unwrap();
    let scheduler: Arc<dyn JobScheduler> =
        Arc::new(RefreshScheduler::new(validator.clone(), RefreshConfig::default()));
    Arc::new(OAuthService::new(Arc::new(MemoryOAuthStore::new()), scheduler, validator))
}

async fn mock_token_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "abc", "expires_in": 3600})))
        .mount(&server)
        .await;
    Mock::given(path("/denied"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;
    server
}

macro_rules! call_json {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

#[actix_rt::test]
async fn test_save_requires_identifiers() {
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    let body = call_json!(
        app,
        test::TestRequest::post()
            .uri("/oauth_interface/save")
            .set_json(json!({"env_id": "e1", "url": "http://localhost/token"}))
    );
    assert_eq!(body["errcode"], 408);
    assert_eq!(body["errmsg"], "missing project id");
    assert!(body["data"].is_null());

    let body = call_json!(
        app,
        test::TestRequest::post()
            .uri("/oauth_interface/save")
            .set_json(json!({"project_id": "p1", "url": "http://localhost/token"}))
    );
    assert_eq!(body["errcode"], 408);
    assert_eq!(body["errmsg"], "missing environment id");

    let body = call_json!(app, test::TestRequest::get().uri("/oauth_interface/list"));
    assert_eq!(body["errcode"], 408);
}

#[actix_rt::test]
async fn test_save_get_and_list() {
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    let config = json!({
        "project_id": "p1",
        "env_id": "e1",
        "url": "http://localhost:9/token",
        "method": "POST",
        "dataType": "data_json",
        "data_json": "{\"ts\":\"{time}\"}",
        "headers_data": [{"keyName": "X-Key", "value": "abc"}],
        "is_oauth_open": false
    });

    let saved = call_json!(
        app,
        test::TestRequest::post().uri("/oauth_interface/save").set_json(&config)
    );
    assert_eq!(saved["errcode"], 0);
    assert_eq!(saved["data"]["project_id"], "p1");
    assert_eq!(saved["data"]["encoding"], "data_json");
    assert_eq!(saved["data"]["headers_data"][0]["key"], "X-Key");
    let id = saved["data"]["_id"].as_str().unwrap().to_string();

    // Re-saving the same key updates in place
    let mut updated = config.clone();
    updated["url"] = json!("http://localhost:9/v2/token");
    let resaved = call_json!(
        app,
        test::TestRequest::post().uri("/oauth_interface/save").set_json(&updated)
    );
    assert_eq!(resaved["data"]["_id"], id.as_str());

    let fetched = call_json!(
        app,
        test::TestRequest::get().uri("/oauth_interface/get?project_id=p1&env_id=e1")
    );
    assert_eq!(fetched["errcode"], 0);
    assert_eq!(fetched["data"]["url"], "http://localhost:9/v2/token");

    let missing = call_json!(
        app,
        test::TestRequest::get().uri("/oauth_interface/get?project_id=p1&env_id=e2")
    );
    assert_eq!(missing["errcode"], 0);
    assert!(missing["data"].is_null());

    let mut other_env = config.clone();
    other_env["env_id"] = json!("e2");
    call_json!(
        app,
        test::TestRequest::post().uri("/oauth_interface/save").set_json(&other_env)
    );

    let listed = call_json!(app, test::TestRequest::get().uri("/oauth_interface/list?project_id=p1"));
    assert_eq!(listed["errcode"], 0);
    assert_eq!(listed["data"].as_array().unwrap().len(), 2);

    let empty = call_json!(app, test::TestRequest::get().uri("/oauth_interface/list?project_id=p9"));
    assert_eq!(empty["data"], json!([]));
}

#[actix_rt::test]
async fn test_validate_returns_token_payload() {
    let server = mock_token_server().await;
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    let body = call_json!(
        app,
        test::TestRequest::post().uri("/oauth_interface/validate").set_json(json!({
            "url": format!("{}/token", server.uri()),
            "method": "POST",
            "form_data": [{"key": "grant_type", "value": "client_credentials"}]
        }))
    );
    assert_eq!(body["errcode"], 0);
    assert_eq!(body["data"]["access_token"], "abc");
}

#[actix_rt::test]
async fn test_validate_failures_report_token_path_incorrect() {
    let server = mock_token_server().await;
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    for url in [format!("{}/denied", server.uri()), "http://127.0.0.1:1/token".to_string()] {
        let body = call_json!(
            app,
            test::TestRequest::post()
                .uri("/oauth_interface/validate")
                .set_json(json!({"url": url, "method": "GET"}))
        );
        assert_eq!(body["errcode"], 402);
        assert_eq!(body["errmsg"], "token path incorrect");
        assert!(body["data"].is_null());
    }
}

#[actix_rt::test]
async fn test_malformed_body_gets_envelope() {
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    let body = call_json!(
        app,
        test::TestRequest::post()
            .uri("/oauth_interface/save")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(body["errcode"], 402);
}

#[actix_rt::test]
async fn test_open_config_is_refreshed_in_background() {
    let server = mock_token_server().await;
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    let saved = call_json!(
        app,
        test::TestRequest::post().uri("/oauth_interface/save").set_json(json!({
            "project_id": "p1",
            "env_id": "e1",
            "url": format!("{}/token", server.uri()),
            "method": "POST",
            "is_oauth_open": true,
            "token_valid_hour": 2
        }))
    );
    assert_eq!(saved["errcode"], 0);

    let mut status = Value::Null;
    for _ in 0..100 {
        status = call_json!(
            app,
            test::TestRequest::get().uri("/oauth_interface/status?project_id=p1&env_id=e1")
        );
        if status["data"]["runs"].as_u64().unwrap_or(0) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status["errcode"], 0);
    assert_eq!(status["data"]["interval_seconds"], 7200);
    assert_eq!(status["data"]["failures"], 0);
    assert_eq!(status["data"]["last_token"]["access_token"], "abc");

    // Closing the configuration removes its job
    call_json!(
        app,
        test::TestRequest::post().uri("/oauth_interface/save").set_json(json!({
            "project_id": "p1",
            "env_id": "e1",
            "url": format!("{}/token", server.uri()),
            "is_oauth_open": false
        }))
    );
    let closed = call_json!(
        app,
        test::TestRequest::get().uri("/oauth_interface/status?project_id=p1&env_id=e1")
    );
    assert_eq!(closed["errcode"], 0);
    assert!(closed["data"].is_null());
}

#[actix_rt::test]
async fn test_health_check() {
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    let body = call_json!(app, test::TestRequest::get().uri("/health"));
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], tokensync::VERSION);
}

#[actix_rt::test]
async fn test_null_identifier_is_missing() {
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    let body = call_json!(
        app,
        test::TestRequest::post()
            .uri("/oauth_interface/save")
            .set_json(json!({"project_id": null, "env_id": "e1"}))
    );
    assert_eq!(body["errcode"], 408);
    assert_eq!(body["errmsg"], "missing project id");

    let body = call_json!(
        app,
        test::TestRequest::post()
            .uri("/oauth_interface/save")
            .set_json(json!({"project_id": "p1", "env_id": null}))
    );
    assert_eq!(body["errcode"], 408);
    assert_eq!(body["errmsg"], "missing environment id");
}

#[actix_rt::test]
async fn test_numeric_identifiers_are_accepted() {
    let app = test::init_service(
        App::new().configure(|cfg| configure_oauth_api(cfg, create_test_service())),
    )
    .await;

    let saved = call_json!(
        app,
        test::TestRequest::post().uri("/oauth_interface/save").set_json(json!({
            "project_id": 11,
            "env_id": 22,
            "url": "http://localhost:9/token",
            "is_oauth_open": false
        }))
    );
    assert_eq!(saved["errcode"], 0);
    assert_eq!(saved["data"]["project_id"], "11");
    assert_eq!(saved["data"]["env_id"], "22");

    let fetched = call_json!(
        app,
        test::TestRequest::get().uri("/oauth_interface/get?project_id=11&env_id=22")
    );
    assert_eq!(fetched["errcode"], 0);
    assert_eq!(fetched["data"]["_id"], saved["data"]["_id"]);
}
