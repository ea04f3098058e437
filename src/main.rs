use std::path::PathBuf;

use showflow_backend::{
    apiserver::{API_PORT, ApiState, create_api_router},
    model::config::FlowConfig,
    start_backend,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("flow_config.json"));
    let config = match FlowConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Falling back to default config: {:#}", e);
            FlowConfig::default()
        }
    };

    let handle = start_backend(config).await;

    // Pick up the configured showflow right away so the panel's first
    // full_state fetch is populated.
    if let Some(path) = handle.config.read().await.flow_path.clone() {
        if let Err(e) = handle.manager.load_from_file(&path).await {
            log::warn!("Could not load showflow {}: {:#}", path.display(), e);
        }
    }

    let app = create_api_router(ApiState {
        controller_tx: handle.controller_tx,
        state_rx: handle.state_rx,
        manager: handle.manager,
        config: handle.config,
        config_path,
        dispatch_tx: handle.dispatch_tx,
        reply_tx: handle.reply_tx,
        event_tx: handle.event_tx,
    });

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", API_PORT)).await?;
    log::info!("Listening on 127.0.0.1:{}", API_PORT);
    axum::serve(listener, app).await?;
    Ok(())
}
