//! HTTP API handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::channels::{ChannelConfig, DecoderType};
use crate::error::ChannelError;
use crate::ui::server::AppState;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

fn reply<T: Serialize>(status: StatusCode, body: ApiResponse<T>) -> Response {
    (status, Json(body)).into_response()
}

fn fail(status: StatusCode, msg: impl Into<String>) -> Response {
    reply::<()>(status, ApiResponse::error(msg))
}

fn channel_error(e: ChannelError) -> Response {
    let status = match e {
        ChannelError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    fail(status, e.to_string())
}

/// Query parameters accepted on `/api/channels`
#[derive(Debug, Default, Deserialize)]
pub struct ControlParams {
    pub action: Option<String>,
    pub channel: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub decoder: Option<String>,
    /// Hz; parsed by the handler so a bad value still gets a JSON reply
    pub frequency: Option<String>,
}

/// System status
#[derive(Serialize)]
pub struct SystemStatus {
    pub running: bool,
    pub audio_clients: usize,
    pub waveform_clients: usize,
    pub waveform_taps: usize,
    pub channel_count: usize,
    pub uptime_seconds: u64,
}

/// Route: `GET /api/status`
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SystemStatus>> {
    let status = SystemStatus {
        running: state.is_running(),
        audio_clients: state.audio.client_count(),
        waveform_clients: state.waveform.client_count(),
        waveform_taps: state.taps.tap_count(),
        channel_count: state.channels.channel_count(),
        uptime_seconds: state.uptime().as_secs(),
    };

    Json(ApiResponse::ok(status))
}

/// Route: `GET /api/channels?action=list`
pub async fn get_channels(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ControlParams>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => return fail(StatusCode::BAD_REQUEST, e.body_text()),
    };
    match params.action.as_deref() {
        Some("list") => reply(StatusCode::OK, ApiResponse::ok(state.channels.list())),
        _ => fail(StatusCode::BAD_REQUEST, "Unknown action"),
    }
}

/// Route: `POST /api/channels?action=create|start|stop|delete`
pub async fn post_channels(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ControlParams>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => return fail(StatusCode::BAD_REQUEST, e.body_text()),
    };
    match (params.action.as_deref(), params.channel.as_deref()) {
        (Some("create"), _) => create_channel(&state, &params),
        (Some("start"), Some(name)) => match state.channels.start(name) {
            Ok(()) => {
                tracing::info!(channel = name, "WebUI started channel");
                reply(StatusCode::OK, ApiResponse::ok(format!("Channel started: {}", name)))
            }
            Err(e) => channel_error(e),
        },
        (Some("stop"), Some(name)) => match state.channels.stop(name) {
            Ok(()) => {
                tracing::info!(channel = name, "WebUI stopped channel");
                reply(StatusCode::OK, ApiResponse::ok(format!("Channel stopped: {}", name)))
            }
            Err(e) => channel_error(e),
        },
        (Some("delete"), Some(name)) => match state.channels.delete(name) {
            Ok(channel) => reply(StatusCode::OK, ApiResponse::ok(channel)),
            Err(e) => channel_error(e),
        },
        _ => fail(
            StatusCode::BAD_REQUEST,
            "Invalid action or missing channel parameter",
        ),
    }
}

fn create_channel(state: &AppState, params: &ControlParams) -> Response {
    let (Some(name), Some(decoder), Some(frequency)) = (
        params.name.as_ref(),
        params.decoder.as_deref(),
        params.frequency.as_deref(),
    ) else {
        return fail(
            StatusCode::BAD_REQUEST,
            "create requires name, type and frequency",
        );
    };

    let decoder: DecoderType = match decoder.parse() {
        Ok(d) => d,
        Err(e) => return channel_error(e),
    };

    let frequency: u64 = match frequency.trim().parse() {
        Ok(hz) => hz,
        Err(_) => {
            return fail(
                StatusCode::BAD_REQUEST,
                format!("Invalid frequency: {}", frequency),
            )
        }
    };

    let config = ChannelConfig {
        name: name.clone(),
        decoder,
        frequency,
    };
    match state.channels.create(config) {
        Ok(channel) => reply(StatusCode::CREATED, ApiResponse::ok(channel)),
        Err(e) => channel_error(e),
    }
}
