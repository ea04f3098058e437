use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc, watch};

use crate::{
    controller::{ControllerCommand, PanelController, PanelState},
    engine::host_link::{HostCommand, HostDispatch, HostLink, HostReply, LinkEvent},
    event::UiEvent,
    executor::{Executor, ExecutorCommand, ExecutorEvent},
    manager::ShowflowManager,
    model::config::FlowConfig,
};

pub mod apiserver;
pub mod controller;
pub mod engine;
pub mod event;
pub mod executor;
pub mod flow;
pub mod lens;
pub mod manager;
pub mod media;
pub mod model;

pub struct BackendHandle {
    pub manager: ShowflowManager,
    pub config: Arc<RwLock<FlowConfig>>,

    pub controller_tx: mpsc::Sender<ControllerCommand>,
    pub state_rx: watch::Receiver<PanelState>,
    pub event_tx: broadcast::Sender<UiEvent>,
    pub dispatch_tx: broadcast::Sender<HostDispatch>,
    pub reply_tx: mpsc::Sender<HostReply>,
}

pub async fn start_backend(config: FlowConfig) -> BackendHandle {
    let (controller_tx, controller_rx) = mpsc::channel::<ControllerCommand>(32);
    let (exec_tx, exec_rx) = mpsc::channel::<ExecutorCommand>(32);
    let (host_tx, host_rx) = mpsc::channel::<HostCommand>(32);
    let (reply_tx, reply_rx) = mpsc::channel::<HostReply>(32);
    let (executor_event_tx, executor_event_rx) = mpsc::channel::<ExecutorEvent>(32);
    let (link_event_tx, link_event_rx) = mpsc::channel::<LinkEvent>(32);
    let (state_tx, state_rx) = watch::channel::<PanelState>(PanelState::default());
    let (event_tx, _) = broadcast::channel::<UiEvent>(32);
    let (dispatch_tx, _) = broadcast::channel::<HostDispatch>(32);

    let manager = ShowflowManager::new(event_tx.clone());
    let config = Arc::new(RwLock::new(config));

    let controller = PanelController::new(
        exec_tx,
        controller_rx,
        executor_event_rx,
        state_tx,
        event_tx.clone(),
    );

    let executor = Executor::new(
        manager.clone(),
        config.clone(),
        exec_rx,
        host_tx,
        executor_event_tx,
        link_event_rx,
    );

    let host_link = HostLink::new(host_rx, dispatch_tx.clone(), reply_rx, link_event_tx);

    tokio::spawn(controller.run());
    tokio::spawn(executor.run());
    tokio::spawn(host_link.run());

    BackendHandle {
        manager,
        config,
        controller_tx,
        state_rx,
        event_tx,
        dispatch_tx,
        reply_tx,
    }
}
