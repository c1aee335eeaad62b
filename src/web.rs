//! Axum-based HTTP server: scrape endpoint, health check and JSON API

use crate::commands::{self, Command, CommandHandler};
use crate::error::GatewayError;
use crate::inverter::Inverters;
use crate::logging::get_logger;
use crate::metrics::GatewayMetrics;
use crate::settings::Settings;
use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Version stamped by the build script
pub const APP_VERSION: &str = env!("APP_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub inverters: Inverters,
    pub metrics: GatewayMetrics,
    pub control_enabled: bool,
    pub metrics_path: String,
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub serialno: String,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub serialno: String,
    pub settings: Settings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InverterInfo {
    pub serialno: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvertersResponse {
    pub inverters: Vec<InverterInfo>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub command: String,
    pub value: String,
    pub status: String,
    pub message: String,
}

/// HTTP status for a failed API operation
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
        GatewayError::Validation { .. } | GatewayError::Mapping { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Axpert Gateway</title></head>\n<body>\n\
         <h1>Axpert Gateway</h1>\n<p>Version {}</p>\n\
         <p><a href=\"{}\">Metrics</a></p>\n</body>\n</html>\n",
        APP_VERSION, state.metrics_path
    ))
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            get_logger("web").error(&format!("Failed to encode metrics: {}", e));
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding error").into_response()
        }
    }
}

async fn list_inverters(State(state): State<AppState>) -> Json<InvertersResponse> {
    let inverters: Vec<InverterInfo> = state
        .inverters
        .serial_numbers()
        .into_iter()
        .map(|serialno| InverterInfo { serialno })
        .collect();
    let count = inverters.len();
    Json(InvertersResponse { inverters, count })
}

async fn get_settings(State(state): State<AppState>, body: Bytes) -> Response {
    let logger = get_logger("web");
    let req: SettingsRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            logger.error(&format!("Failed to decode request body: {}", e));
            return (StatusCode::BAD_REQUEST, "Invalid JSON body").into_response();
        }
    };

    let inverter = match state.inverters.find(&req.serialno) {
        Ok(inverter) => inverter,
        Err(e) => {
            logger.error(&e.to_string());
            return (StatusCode::NOT_FOUND, e.to_string()).into_response();
        }
    };

    match inverter.read_settings().await {
        Some(settings) => Json(SettingsResponse {
            serialno: req.serialno,
            settings,
        })
        .into_response(),
        None => {
            logger.warn(&format!(
                "Current settings not available for {} (not collected yet)",
                req.serialno
            ));
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Current settings not available - please wait for next metrics collection cycle",
            )
                .into_response()
        }
    }
}

async fn run_command(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let logger = get_logger("web");

    if !state.control_enabled {
        return (StatusCode::FORBIDDEN, "Control API is disabled").into_response();
    }

    let mut command: Command = match serde_json::from_slice(&body) {
        Ok(command) => command,
        Err(e) => {
            logger.error(&format!("Failed to decode request body: {}", e));
            return (StatusCode::BAD_REQUEST, "Invalid JSON body").into_response();
        }
    };
    command.name = name;

    logger.info(&format!(
        "Received command: {} with value: {} for serialno: {}",
        command.name, command.value, command.serialno
    ));

    if CommandHandler::lookup(&command.name).is_err() {
        logger.error(&format!("Unknown command: {}", command.name));
        return (StatusCode::BAD_REQUEST, "Unknown command").into_response();
    }

    let (status, outcome, message) = match commands::dispatch(&state.inverters, &command).await {
        Ok(()) => (
            StatusCode::OK,
            "success",
            "Command executed successfully".to_string(),
        ),
        Err(e) => {
            logger.error(&format!("Command execution failed: {}", e));
            (status_for(&e), "error", e.to_string())
        }
    };

    (
        status,
        Json(CommandResponse {
            command: command.name,
            value: command.value,
            status: outcome.to_string(),
            message,
        }),
    )
        .into_response()
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route(&state.metrics_path, get(metrics))
        .route("/api/inverters", get(list_inverters))
        .route("/api/settings", post(get_settings))
        .route("/api/command/{command}", post(run_command))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let logger = get_logger("web");
    let metrics_path = state.metrics_path.clone();
    let control = if state.control_enabled {
        "enabled"
    } else {
        "disabled"
    };
    let router = build_router(state);

    logger.info(&format!("Binding web server to {}", addr));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{} (metrics {}, control API {})",
        local_addr, metrics_path, control
    ));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
