//! Bridge between the executor and the editing host. Planned edit batches
//! go out over the host websocket; the host script applies them and reports
//! back. A batch submitted while no host is connected is dropped
//! immediately so the operation fails fast instead of hanging.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::{flow::placement::PlacementPlan, flow::render::RenderJob, media::RelinkAction};

/// One self-contained edit batch the host applies atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "param", rename_all = "camelCase")]
pub enum HostBatch {
    Placement(PlacementPlan),
    Render { jobs: Vec<RenderJob> },
    Relink { actions: Vec<RelinkAction> },
    SetInOut { in_frame: i64, out_frame: i64 },
}

impl HostBatch {
    pub fn summary(&self) -> String {
        match self {
            HostBatch::Placement(plan) => {
                format!("placement: {} clip insertions", plan.actions.len())
            }
            HostBatch::Render { jobs } => format!("render: {} jobs", jobs.len()),
            HostBatch::Relink { actions } => format!("relink: {} clips", actions.len()),
            HostBatch::SetInOut { in_frame, out_frame } => {
                format!("set in/out: {}..{}", in_frame, out_frame)
            }
        }
    }
}

#[derive(Debug)]
pub enum HostCommand {
    Submit { batch_id: Uuid, batch: HostBatch },
}

/// What goes out to every connected host client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDispatch {
    pub batch_id: Uuid,
    pub batch: HostBatch,
}

/// What the host script sends back after applying (or failing) a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "param", rename_all = "camelCase")]
pub enum HostReply {
    Applied {
        batch_id: Uuid,
        placed: usize,
        skipped: usize,
    },
    Failed {
        batch_id: Uuid,
        error: String,
    },
}

/// Link outcome reported to the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Applied {
        batch_id: Uuid,
        placed: usize,
        skipped: usize,
    },
    Failed {
        batch_id: Uuid,
        error: String,
    },
    Dropped {
        batch_id: Uuid,
    },
}

pub struct HostLink {
    command_rx: mpsc::Receiver<HostCommand>,
    dispatch_tx: broadcast::Sender<HostDispatch>,
    reply_rx: mpsc::Receiver<HostReply>,
    link_event_tx: mpsc::Sender<LinkEvent>,

    pending: HashSet<Uuid>,
}

impl HostLink {
    pub fn new(
        command_rx: mpsc::Receiver<HostCommand>,
        dispatch_tx: broadcast::Sender<HostDispatch>,
        reply_rx: mpsc::Receiver<HostReply>,
        link_event_tx: mpsc::Sender<LinkEvent>,
    ) -> Self {
        Self {
            command_rx,
            dispatch_tx,
            reply_rx,
            link_event_tx,
            pending: HashSet::new(),
        }
    }

    pub async fn run(mut self) {
        log::info!("HostLink run loop started.");
        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    if let Err(e) = self.handle_command(command).await {
                        log::error!("Error handling host command: {:?}", e);
                    }
                },
                Some(reply) = self.reply_rx.recv() => {
                    if let Err(e) = self.handle_reply(reply).await {
                        log::error!("Error handling host reply: {:?}", e);
                    }
                },
                else => break,
            }
        }
        log::info!("HostLink run loop finished.");
    }

    async fn handle_command(&mut self, command: HostCommand) -> Result<(), anyhow::Error> {
        match command {
            HostCommand::Submit { batch_id, batch } => {
                if self.dispatch_tx.receiver_count() == 0 {
                    log::warn!("No host connected, dropping batch '{}'", batch_id);
                    self.link_event_tx.send(LinkEvent::Dropped { batch_id }).await?;
                    return Ok(());
                }
                log::info!("Dispatching batch '{}' ({})", batch_id, batch.summary());
                self.pending.insert(batch_id);
                let _ = self.dispatch_tx.send(HostDispatch { batch_id, batch });
            }
        }
        Ok(())
    }

    async fn handle_reply(&mut self, reply: HostReply) -> Result<(), anyhow::Error> {
        let batch_id = match &reply {
            HostReply::Applied { batch_id, .. } => *batch_id,
            HostReply::Failed { batch_id, .. } => *batch_id,
        };
        if !self.pending.remove(&batch_id) {
            log::warn!("Received reply for unknown batch_id: {}", batch_id);
            return Ok(());
        }
        let event = match reply {
            HostReply::Applied {
                batch_id,
                placed,
                skipped,
            } => LinkEvent::Applied {
                batch_id,
                placed,
                skipped,
            },
            HostReply::Failed { batch_id, error } => LinkEvent::Failed { batch_id, error },
        };
        self.link_event_tx.send(event).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{Receiver, Sender};

    fn setup_link() -> (
        Sender<HostCommand>,
        broadcast::Sender<HostDispatch>,
        Sender<HostReply>,
        Receiver<LinkEvent>,
    ) {
        let (command_tx, command_rx) = mpsc::channel::<HostCommand>(32);
        let (dispatch_tx, _) = broadcast::channel::<HostDispatch>(32);
        let (reply_tx, reply_rx) = mpsc::channel::<HostReply>(32);
        let (link_event_tx, link_event_rx) = mpsc::channel::<LinkEvent>(32);

        let link = HostLink::new(command_rx, dispatch_tx.clone(), reply_rx, link_event_tx);
        tokio::spawn(link.run());

        (command_tx, dispatch_tx, reply_tx, link_event_rx)
    }

    fn batch() -> HostBatch {
        HostBatch::SetInOut {
            in_frame: 0,
            out_frame: 600,
        }
    }

    #[tokio::test]
    async fn batch_without_host_is_dropped() {
        let (command_tx, _dispatch_tx, _reply_tx, mut link_event_rx) = setup_link();
        let batch_id = Uuid::now_v7();

        command_tx
            .send(HostCommand::Submit {
                batch_id,
                batch: batch(),
            })
            .await
            .unwrap();

        assert_eq!(
            link_event_rx.recv().await.unwrap(),
            LinkEvent::Dropped { batch_id }
        );
    }

    #[tokio::test]
    async fn connected_host_receives_the_dispatch() {
        let (command_tx, dispatch_tx, _reply_tx, _link_event_rx) = setup_link();
        let mut host_rx = dispatch_tx.subscribe();
        let batch_id = Uuid::now_v7();

        command_tx
            .send(HostCommand::Submit {
                batch_id,
                batch: batch(),
            })
            .await
            .unwrap();

        let dispatch = host_rx.recv().await.unwrap();
        assert_eq!(dispatch.batch_id, batch_id);
        assert_eq!(dispatch.batch, batch());
    }

    #[tokio::test]
    async fn applied_reply_routes_back_to_the_executor() {
        let (command_tx, dispatch_tx, reply_tx, mut link_event_rx) = setup_link();
        let _host_rx = dispatch_tx.subscribe();
        let batch_id = Uuid::now_v7();

        command_tx
            .send(HostCommand::Submit {
                batch_id,
                batch: batch(),
            })
            .await
            .unwrap();

        reply_tx
            .send(HostReply::Applied {
                batch_id,
                placed: 8,
                skipped: 1,
            })
            .await
            .unwrap();

        assert_eq!(
            link_event_rx.recv().await.unwrap(),
            LinkEvent::Applied {
                batch_id,
                placed: 8,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn reply_for_unknown_batch_is_ignored() {
        let (command_tx, dispatch_tx, reply_tx, mut link_event_rx) = setup_link();
        let _host_rx = dispatch_tx.subscribe();
        let batch_id = Uuid::now_v7();

        reply_tx
            .send(HostReply::Failed {
                batch_id: Uuid::now_v7(),
                error: "stale".to_string(),
            })
            .await
            .unwrap();

        // A known batch still round-trips after the stale reply.
        command_tx
            .send(HostCommand::Submit {
                batch_id,
                batch: batch(),
            })
            .await
            .unwrap();
        reply_tx
            .send(HostReply::Failed {
                batch_id,
                error: "host error".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            link_event_rx.recv().await.unwrap(),
            LinkEvent::Failed {
                batch_id,
                error: "host error".to_string()
            }
        );
    }
}
