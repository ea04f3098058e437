use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast, mpsc, watch};

use crate::{
    controller::{ControllerCommand, PanelState},
    engine::host_link::{HostDispatch, HostReply},
    event::UiEvent,
    lens::{
        deconvex::CurvatureTable,
        hvmap::HvMap,
        remap::{EyeMode, LensRig},
    },
    manager::ShowflowManager,
    model::{ShowflowModel, config::FlowConfig},
};

/// The panel addon connects to a fixed local port.
pub const API_PORT: u16 = 5000;

#[derive(Clone)]
pub struct ApiState {
    pub controller_tx: mpsc::Sender<ControllerCommand>,
    pub state_rx: watch::Receiver<PanelState>,
    pub manager: ShowflowManager,
    pub config: Arc<RwLock<FlowConfig>>,
    pub config_path: PathBuf,
    pub dispatch_tx: broadcast::Sender<HostDispatch>,
    pub reply_tx: mpsc::Sender<HostReply>,
    pub event_tx: broadcast::Sender<UiEvent>,
}

pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        // Panel and host websockets
        .route("/ws", get(panel_ws_handler))
        .route("/ws/host", get(host_ws_handler))
        // Initial state for a freshly connected panel
        .route("/api/showflow/full_state", get(get_full_state_handler))
        .route(
            "/api/config",
            get(get_config_handler).put(put_config_handler),
        )
        .route("/api/lens/inspect", post(lens_inspect_handler))
        .route("/api/lens/probe", post(lens_probe_handler))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FullState {
    showflow: ShowflowModel,
    panel_state: PanelState,
}

async fn get_full_state_handler(State(state): State<ApiState>) -> axum::Json<FullState> {
    let showflow = state.manager.read().await.clone();
    let panel_state = state.state_rx.borrow().clone();

    axum::Json(FullState {
        showflow,
        panel_state,
    })
}

async fn get_config_handler(State(state): State<ApiState>) -> axum::Json<FlowConfig> {
    axum::Json(state.config.read().await.clone())
}

async fn put_config_handler(
    State(state): State<ApiState>,
    axum::Json(new_config): axum::Json<FlowConfig>,
) -> Result<StatusCode, (StatusCode, String)> {
    let path = state.config_path.clone();
    let to_save = new_config.clone();
    tokio::task::spawn_blocking(move || to_save.save(&path))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    *state.config.write().await = new_config;
    let _ = state.event_tx.send(UiEvent::ConfigUpdated);
    log::info!("Config updated via API.");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectRequest {
    path: PathBuf,
}

async fn lens_inspect_handler(
    State(_state): State<ApiState>,
    axum::Json(request): axum::Json<InspectRequest>,
) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || HvMap::load(&request.path)).await;
    match result {
        Ok(Ok(map)) => axum::Json(map.info()).into_response(),
        Ok(Err(e)) => (StatusCode::BAD_REQUEST, format!("{:#}", e)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProbeRequest {
    u: f32,
    v: f32,
    mode: EyeMode,
    #[serde(default)]
    swap_eyes: bool,
    #[serde(default)]
    eye_offset: f32,
    /// Optional de-convex coefficients applied before the map lookup.
    #[serde(default)]
    deconvex: Option<Vec<f32>>,
}

#[derive(Serialize)]
struct ProbeResponse {
    u: f32,
    v: f32,
}

/// Evaluate the lens remap for one UV, using the maps named in the config.
/// With no maps configured, the probe reports the bare half selection.
async fn lens_probe_handler(
    State(state): State<ApiState>,
    axum::Json(request): axum::Json<ProbeRequest>,
) -> Result<axum::Json<ProbeResponse>, (StatusCode, String)> {
    let config = state.config.read().await.clone();
    let deconvex = request
        .deconvex
        .clone()
        .map(CurvatureTable::new)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("{:#}", e)))?;
    let swap_eyes = request.swap_eyes;
    let rig = tokio::task::spawn_blocking(move || -> Result<LensRig, anyhow::Error> {
        let left = config
            .lens_map_left
            .as_deref()
            .map(HvMap::load)
            .transpose()?;
        let right = config
            .lens_map_right
            .as_deref()
            .map(HvMap::load)
            .transpose()?;
        Ok(LensRig {
            deconvex,
            left,
            right,
            swap_eyes,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| (StatusCode::BAD_REQUEST, format!("{:#}", e)))?;

    let (u, v) = rig.remap(request.u, request.v, request.mode, request.eye_offset);
    Ok(axum::Json(ProbeResponse { u, v }))
}

async fn panel_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_panel_socket(socket, state))
}

async fn handle_panel_socket(mut socket: WebSocket, state: ApiState) {
    let mut state_rx = state.state_rx.clone();
    let mut event_rx = state.event_tx.subscribe();

    log::info!("New panel WebSocket client connected.");

    loop {
        tokio::select! {
            Ok(_) = state_rx.changed() => {
                let new_state = state_rx.borrow().clone();

                if let Ok(payload) = serde_json::to_string(&new_state) {
                    if socket.send(Message::Text(payload.into())).await.is_err() {
                        log::info!("Panel WebSocket client disconnected (send error).");
                        break;
                    }
                }
            }

            Ok(event) = event_rx.recv() => {
                if let Ok(payload) = serde_json::to_string(&event) {
                    if socket.send(Message::Text(payload.into())).await.is_err() {
                        log::info!("Panel WebSocket client disconnected (send error).");
                        break;
                    }
                }
            }

            Some(Ok(msg)) = socket.recv() => {
                if let Message::Text(text) = msg {
                    if let Ok(command) = serde_json::from_str::<ControllerCommand>(&text) {
                        if state.controller_tx.send(command).await.is_err() {
                            log::error!("Failed to send command to PanelController.");
                            break;
                        }
                    } else {
                        log::error!("Invalid command received.")
                    }
                } else if let Message::Close(_) = msg {
                    log::info!("Panel WebSocket client sent close message.");
                    break;
                }
            }

            else => break,
        }
    }
}

async fn host_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_host_socket(socket, state))
}

async fn handle_host_socket(mut socket: WebSocket, state: ApiState) {
    let mut dispatch_rx = state.dispatch_tx.subscribe();

    log::info!("Host WebSocket client connected.");

    loop {
        tokio::select! {
            Ok(dispatch) = dispatch_rx.recv() => {
                if let Ok(payload) = serde_json::to_string(&dispatch) {
                    if socket.send(Message::Text(payload.into())).await.is_err() {
                        log::info!("Host WebSocket client disconnected (send error).");
                        break;
                    }
                }
            }

            Some(Ok(msg)) = socket.recv() => {
                if let Message::Text(text) = msg {
                    if let Ok(reply) = serde_json::from_str::<HostReply>(&text) {
                        if state.reply_tx.send(reply).await.is_err() {
                            log::error!("Failed to forward host reply.");
                            break;
                        }
                    } else {
                        log::error!("Invalid host reply received.")
                    }
                } else if let Message::Close(_) = msg {
                    log::info!("Host WebSocket client sent close message.");
                    break;
                }
            }

            else => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_request_defaults_are_off() {
        let request: ProbeRequest =
            serde_json::from_str(r#"{ "u": 0.5, "v": 0.5, "mode": "left" }"#).unwrap();
        assert_eq!(request.mode, EyeMode::Left);
        assert!(!request.swap_eyes);
        assert_eq!(request.eye_offset, 0.0);
        assert!(request.deconvex.is_none());
    }

    #[test]
    fn run_command_parses_from_panel_json() {
        let text = r#"{ "type": "run", "param": { "op": { "type": "saveShowflow" } } }"#;
        let command: ControllerCommand = serde_json::from_str(text).unwrap();
        let ControllerCommand::Run { op } = command;
        assert_eq!(op, crate::executor::Operation::SaveShowflow);
    }
}
