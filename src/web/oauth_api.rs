//! OAuth configuration management API
//!
//! Routes under `/oauth_interface`. Every response is HTTP 200 carrying an
//! `{errcode, errmsg, data}` envelope; `errcode` is 0 on success.

use actix_web::{error::InternalError, web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::error::{SyncError, ERRCODE_GENERIC, TOKEN_PATH_INCORRECT};
use crate::oauth::{OAuthConfig, OAuthService, TokenRequestSpec};

/// Response envelope shared by every management endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub errcode: i32,
    pub errmsg: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            errcode: 0,
            errmsg: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiEnvelope<()> {
    pub fn error<S: Into<String>>(errcode: i32, errmsg: S) -> Self {
        Self {
            errcode,
            errmsg: errmsg.into(),
            data: None,
        }
    }

    fn from_error(err: &SyncError) -> Self {
        Self::error(err.errcode(), err.to_string())
    }
}

/// Query string accepted by the lookup endpoints
#[derive(Debug, Default, Deserialize)]
pub struct OAuthQuery {
    pub project_id: Option<String>,
    pub env_id: Option<String>,
}

/// Management API handler
pub struct OAuthApiHandler {
    service: Arc<OAuthService>,
}

impl OAuthApiHandler {
    pub fn new(service: Arc<OAuthService>) -> Self {
        Self { service }
    }

    /// POST /oauth_interface/save
    pub async fn save(&self, body: web::Json<OAuthConfig>) -> Result<HttpResponse> {
        match self.service.save(body.into_inner()).await {
            Ok(stored) => Ok(HttpResponse::Ok().json(ApiEnvelope::ok(stored))),
            Err(e) => Ok(failure("save", &e)),
        }
    }

    /// GET /oauth_interface/get?project_id=&env_id=
    pub async fn get(&self, query: web::Query<OAuthQuery>) -> Result<HttpResponse> {
        match self
            .service
            .get(query.project_id.as_deref(), query.env_id.as_deref())
            .await
        {
            Ok(stored) => Ok(HttpResponse::Ok().json(ApiEnvelope::ok(stored))),
            Err(e) => Ok(failure("get", &e)),
        }
    }

    /// GET /oauth_interface/list?project_id=
    pub async fn list(&self, query: web::Query<OAuthQuery>) -> Result<HttpResponse> {
        match self.service.list(query.project_id.as_deref()).await {
            Ok(records) => {
                debug!("Listed {} OAuth configurations", records.len());
                Ok(HttpResponse::Ok().json(ApiEnvelope::ok(records)))
            }
            Err(e) => Ok(failure("list", &e)),
        }
    }

    /// POST /oauth_interface/validate
    pub async fn validate(&self, body: web::Json<TokenRequestSpec>) -> Result<HttpResponse> {
        match self.service.validate(&body).await {
            Ok(payload) => Ok(HttpResponse::Ok().json(ApiEnvelope::ok(payload))),
            Err(e) if e.is_validation_failure() => {
                warn!("Token endpoint validation failed: {}", e);
                Ok(HttpResponse::Ok().json(ApiEnvelope::error(ERRCODE_GENERIC, TOKEN_PATH_INCORRECT)))
            }
            Err(e) => Ok(failure("validate", &e)),
        }
    }

    /// GET /oauth_interface/status?project_id=&env_id=
    pub async fn status(&self, query: web::Query<OAuthQuery>) -> Result<HttpResponse> {
        match self
            .service
            .job_status(query.project_id.as_deref(), query.env_id.as_deref())
            .await
        {
            Ok(status) => Ok(HttpResponse::Ok().json(ApiEnvelope::ok(status))),
            Err(e) => Ok(failure("status", &e)),
        }
    }
}

fn failure(operation: &str, err: &SyncError) -> HttpResponse {
    match err {
        SyncError::MissingIdentifier { .. } => debug!("Rejected {} request: {}", operation, err),
        _ => error!("OAuth {} failed ({}): {}", operation, err.category(), err),
    }
    HttpResponse::Ok().json(ApiEnvelope::from_error(err))
}

/// Health check
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Configure OAuth management API routes
pub fn configure_oauth_api(cfg: &mut web::ServiceConfig, service: Arc<OAuthService>) {
    let oauth_api = web::Data::new(OAuthApiHandler::new(service));

    // Malformed bodies get the envelope instead of actix's plain 400
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        let response = HttpResponse::Ok().json(ApiEnvelope::error(ERRCODE_GENERIC, message));
        InternalError::from_response(err, response).into()
    });

    cfg.app_data(oauth_api)
        .app_data(json_config)
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/oauth_interface")
                .route("/save", web::post().to(|api: web::Data<OAuthApiHandler>, body: web::Json<OAuthConfig>| async move {
                    api.save(body).await
                }))
                .route("/get", web::get().to(|api: web::Data<OAuthApiHandler>, query: web::Query<OAuthQuery>| async move {
                    api.get(query).await
                }))
                .route("/list", web::get().to(|api: web::Data<OAuthApiHandler>, query: web::Query<OAuthQuery>| async move {
                    api.list(query).await
                }))
                .route("/validate", web::post().to(|api: web::Data<OAuthApiHandler>, body: web::Json<TokenRequestSpec>| async move {
                    api.validate(body).await
                }))
                .route("/status", web::get().to(|api: web::Data<OAuthApiHandler>, query: web::Query<OAuthQuery>| async move {
                    api.status(query).await
                })),
        );
}
