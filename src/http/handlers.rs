//! Status and maintenance handlers.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::{AppMode, CoreConfig};
use crate::http::server::AppState;

/// JSON error body: `{"code": 503, "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    code: u16,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: status.as_u16(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Serialize)]
pub struct SystemStatus<'a> {
    pub version: &'static str,
    pub mode: AppMode,
    pub core: &'a CoreConfig,
}

#[derive(Serialize)]
pub struct MaintenanceStatus {
    pub mode: AppMode,
    pub need_create: bool,
    pub need_upgrade: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        mode: state.config.app_mode,
        core: &state.config.core,
    })
    .into_response()
}

pub async fn get_maintenance(State(state): State<AppState>) -> Json<MaintenanceStatus> {
    Json(MaintenanceStatus {
        mode: state.config.app_mode,
        need_create: state.readiness.need_create,
        need_upgrade: state.readiness.need_upgrade,
    })
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, format!("no handler for {}", uri.path()))
}
