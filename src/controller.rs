use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use uuid::Uuid;

use crate::{
    event::UiEvent,
    executor::{ExecutorCommand, ExecutorEvent, OpKind, Operation},
    flow::verify::VerifyReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OpStatus {
    Running,
    WaitingHost,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveOp {
    pub op_id: Uuid,
    pub kind: OpKind,
    pub status: OpStatus,
    pub detail: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "param", rename_all = "camelCase")]
pub enum ControllerCommand {
    Run { op: Operation },
}

/// Panel-facing state, pushed over the websocket on every change.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub ops: HashMap<Uuid, ActiveOp>,
    pub last_verify: Option<VerifyReport>,
    pub last_result: Option<String>,
}

pub struct PanelController {
    executor_tx: mpsc::Sender<ExecutorCommand>,
    command_rx: mpsc::Receiver<ControllerCommand>,
    event_rx: mpsc::Receiver<ExecutorEvent>,
    state_tx: watch::Sender<PanelState>,
    event_tx: broadcast::Sender<UiEvent>,

    state: Arc<RwLock<PanelState>>,
}

impl PanelController {
    pub fn new(
        executor_tx: mpsc::Sender<ExecutorCommand>,
        command_rx: mpsc::Receiver<ControllerCommand>,
        event_rx: mpsc::Receiver<ExecutorEvent>,
        state_tx: watch::Sender<PanelState>,
        event_tx: broadcast::Sender<UiEvent>,
    ) -> Self {
        Self {
            executor_tx,
            command_rx,
            event_rx,
            state_tx,
            event_tx,
            state: Arc::new(RwLock::new(PanelState::default())),
        }
    }

    pub async fn run(mut self) {
        log::info!("PanelController run loop started.");
        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    if let Err(e) = self.handle_command(command).await {
                        log::error!("Error handling controller command: {:?}", e);
                    } else if self.state_tx.send(self.state.read().await.clone()).is_err() {
                        log::trace!("No UI clients are listening to state updates.");
                    }
                },
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.handle_executor_event(event).await {
                        log::error!("Error handling executor event: {:?}", e);
                    } else if self.state_tx.send(self.state.read().await.clone()).is_err() {
                        log::trace!("No UI clients are listening to state updates.");
                    }
                },
                else => break,
            }
        }
        log::info!("PanelController run loop finished.");
    }

    async fn handle_command(&self, command: ControllerCommand) -> Result<(), anyhow::Error> {
        match command {
            ControllerCommand::Run { op } => {
                let op_id = Uuid::new_v4();
                log::info!("Running operation '{}' ({:?})", op_id, op.kind());
                self.executor_tx
                    .send(ExecutorCommand::Execute { op_id, op })
                    .await?;
                Ok(())
            }
        }
    }

    async fn handle_executor_event(&self, event: ExecutorEvent) -> Result<(), anyhow::Error> {
        let mut state = self.state.write().await;

        match &event {
            ExecutorEvent::Started { op_id, kind } => {
                state.ops.insert(
                    *op_id,
                    ActiveOp {
                        op_id: *op_id,
                        kind: *kind,
                        status: OpStatus::Running,
                        detail: String::new(),
                    },
                );
            }
            ExecutorEvent::SlotsRebuilt { op_id, slot_count } => {
                if let Some(op) = state.ops.get_mut(op_id) {
                    op.detail = format!("{} slots", slot_count);
                }
            }
            ExecutorEvent::VerifyFinished { report, .. } => {
                state.last_verify = Some(report.clone());
            }
            ExecutorEvent::BatchSubmitted { op_id, summary, .. } => {
                if let Some(op) = state.ops.get_mut(op_id) {
                    op.status = OpStatus::WaitingHost;
                    op.detail = summary.clone();
                }
            }
            ExecutorEvent::BatchApplied {
                op_id,
                placed,
                skipped,
                ..
            } => {
                if let Some(op) = state.ops.get_mut(op_id) {
                    op.detail = format!("{} placed, {} skipped", placed, skipped);
                }
            }
            ExecutorEvent::Completed { op_id, detail } => {
                state.ops.remove(op_id);
                state.last_result = Some(detail.clone());
            }
            ExecutorEvent::Error { op_id, error } => {
                if let Some(op) = state.ops.get_mut(op_id) {
                    op.status = OpStatus::Error;
                    op.detail = error.clone();
                }
                log::error!("Operation '{}' failed: {}", op_id, error);
            }
        }
        drop(state);

        if self.event_tx.send(event.into()).is_err() {
            log::trace!("No UI clients are listening to events.");
        }
        Ok(())
    }
}
