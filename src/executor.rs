use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::{
    engine::host_link::{HostBatch, HostCommand, LinkEvent},
    flow::{
        placement::{apply_plan_metadata, plan_placement},
        render::{plan_marker_segments, plan_slot_renders},
        slots::build_slots,
        verify::{VerifyReport, verify_markers},
    },
    manager::ShowflowManager,
    media::{MediaIndex, plan_relink},
    model::{config::FlowConfig, slot::Branch, snapshot::TimelineSnapshot},
};

/// One panel request. Timeline-dependent operations carry the snapshot the
/// host-side script captured when the operator clicked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "param", rename_all = "camelCase")]
pub enum Operation {
    LoadShowflow {
        path: Option<PathBuf>,
    },
    SaveShowflow,
    RebuildSlots {
        snapshot: TimelineSnapshot,
    },
    VerifyMarkers {
        snapshot: TimelineSnapshot,
    },
    PlaceClips,
    QueueMarkerRenders {
        snapshot: TimelineSnapshot,
    },
    QueueSlotRenders {
        sequence_name: String,
        slots: Vec<usize>,
        branches: Option<Vec<Branch>>,
    },
    RelinkMedia {
        clip_names: Vec<String>,
    },
    PreviewSlot {
        slot: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpKind {
    LoadShowflow,
    SaveShowflow,
    RebuildSlots,
    VerifyMarkers,
    PlaceClips,
    QueueMarkerRenders,
    QueueSlotRenders,
    RelinkMedia,
    PreviewSlot,
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::LoadShowflow { .. } => OpKind::LoadShowflow,
            Operation::SaveShowflow => OpKind::SaveShowflow,
            Operation::RebuildSlots { .. } => OpKind::RebuildSlots,
            Operation::VerifyMarkers { .. } => OpKind::VerifyMarkers,
            Operation::PlaceClips => OpKind::PlaceClips,
            Operation::QueueMarkerRenders { .. } => OpKind::QueueMarkerRenders,
            Operation::QueueSlotRenders { .. } => OpKind::QueueSlotRenders,
            Operation::RelinkMedia { .. } => OpKind::RelinkMedia,
            Operation::PreviewSlot { .. } => OpKind::PreviewSlot,
        }
    }
}

#[derive(Debug)]
pub enum ExecutorCommand {
    Execute { op_id: Uuid, op: Operation },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorEvent {
    Started {
        op_id: Uuid,
        kind: OpKind,
    },
    SlotsRebuilt {
        op_id: Uuid,
        slot_count: usize,
    },
    VerifyFinished {
        op_id: Uuid,
        report: VerifyReport,
    },
    BatchSubmitted {
        op_id: Uuid,
        batch_id: Uuid,
        summary: String,
    },
    BatchApplied {
        op_id: Uuid,
        batch_id: Uuid,
        placed: usize,
        skipped: usize,
    },
    Completed {
        op_id: Uuid,
        detail: String,
    },
    Error {
        op_id: Uuid,
        error: String,
    },
}

pub struct Executor {
    manager: ShowflowManager,
    config: Arc<RwLock<FlowConfig>>,
    command_rx: mpsc::Receiver<ExecutorCommand>,
    host_tx: mpsc::Sender<HostCommand>,
    event_tx: mpsc::Sender<ExecutorEvent>,
    link_event_rx: mpsc::Receiver<LinkEvent>,

    // batch_id -> op_id for batches awaiting a host reply
    active_batches: Arc<RwLock<HashMap<Uuid, Uuid>>>,
}

impl Executor {
    pub fn new(
        manager: ShowflowManager,
        config: Arc<RwLock<FlowConfig>>,
        command_rx: mpsc::Receiver<ExecutorCommand>,
        host_tx: mpsc::Sender<HostCommand>,
        event_tx: mpsc::Sender<ExecutorEvent>,
        link_event_rx: mpsc::Receiver<LinkEvent>,
    ) -> Self {
        Self {
            manager,
            config,
            command_rx,
            host_tx,
            event_tx,
            link_event_rx,
            active_batches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn run(mut self) {
        log::info!("Executor run loop started.");
        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    log::debug!("Executor received command: {:?}", command);
                    if let Err(e) = self.process_command(command).await {
                        log::error!("Error processing executor command: {:?}", e);
                    }
                },
                Some(event) = self.link_event_rx.recv() => {
                    if let Err(e) = self.handle_link_event(event).await {
                        log::error!("Error handling link event: {:?}", e);
                    }
                },
                else => break,
            }
        }
        log::info!("Executor run loop finished.");
    }

    async fn process_command(&self, command: ExecutorCommand) -> Result<(), anyhow::Error> {
        match command {
            ExecutorCommand::Execute { op_id, op } => {
                self.event_tx
                    .send(ExecutorEvent::Started {
                        op_id,
                        kind: op.kind(),
                    })
                    .await?;
                if let Err(e) = self.dispatch_operation(op_id, op).await {
                    log::error!("Operation '{}' failed: {:?}", op_id, e);
                    self.event_tx
                        .send(ExecutorEvent::Error {
                            op_id,
                            error: e.to_string(),
                        })
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn dispatch_operation(&self, op_id: Uuid, op: Operation) -> Result<(), anyhow::Error> {
        match op {
            Operation::LoadShowflow { path } => {
                let path = match path {
                    Some(path) => path,
                    None => self.config.read().await.flow_path()?.to_path_buf(),
                };
                self.manager.load_from_file(&path).await?;
                self.complete(op_id, format!("loaded {}", path.display()))
                    .await
            }
            Operation::SaveShowflow => {
                let path = self.config.read().await.flow_path()?.to_path_buf();
                self.manager.save_to_file(&path).await?;
                self.complete(op_id, format!("saved {}", path.display()))
                    .await
            }
            Operation::RebuildSlots { snapshot } => {
                let tracks = self.manager.read().await.tracks.clone();
                let slots = build_slots(&snapshot, &tracks)?;
                let slot_count = slots.len();

                self.manager
                    .write_with(|model| {
                        if model.show_id.is_empty() {
                            model.show_id = snapshot.sequence_name.clone();
                        }
                        model.fps = snapshot.fps;
                        model.slots = slots;
                    })
                    .await;
                self.save_if_configured().await?;

                self.event_tx
                    .send(ExecutorEvent::SlotsRebuilt { op_id, slot_count })
                    .await?;
                self.complete(op_id, format!("rebuilt {} slots", slot_count))
                    .await
            }
            Operation::VerifyMarkers { snapshot } => {
                let model = self.manager.read().await;
                let report = verify_markers(&model.slots, &snapshot.markers, model.fps);
                drop(model);

                let summary = report.summary();
                self.event_tx
                    .send(ExecutorEvent::VerifyFinished { op_id, report })
                    .await?;
                self.complete(op_id, summary).await
            }
            Operation::PlaceClips => {
                let media_dir = self.config.read().await.media_dir()?.to_path_buf();
                let media =
                    tokio::task::spawn_blocking(move || MediaIndex::scan(&media_dir)).await??;

                let model = self.manager.read().await.clone();
                let plan = plan_placement(&model, &media);
                for warning in &plan.warnings {
                    log::warn!("Placement: {}", warning);
                }
                if plan.actions.is_empty() {
                    bail!("no clips could be placed ({} warnings)", plan.warnings.len());
                }

                self.manager
                    .write_with(|model| apply_plan_metadata(model, &plan))
                    .await;
                self.save_if_configured().await?;

                self.submit_batch(op_id, HostBatch::Placement(plan)).await
            }
            Operation::QueueMarkerRenders { snapshot } => {
                // Gate and jobs both use the snapshot's rate; the document
                // may have been rebuilt from a differently-timed sequence.
                let model = self.manager.read().await;
                let report = verify_markers(&model.slots, &snapshot.markers, snapshot.fps);
                drop(model);
                if !report.is_clean() {
                    bail!("markers do not match slots: {}", report.summary());
                }

                let settings = self.config.read().await.render_settings()?;
                let jobs = plan_marker_segments(
                    &snapshot.markers,
                    snapshot.fps,
                    &snapshot.sequence_name,
                    &settings,
                )?;
                self.submit_batch(op_id, HostBatch::Render { jobs }).await
            }
            Operation::QueueSlotRenders {
                sequence_name,
                slots,
                branches,
            } => {
                let settings = self.config.read().await.render_settings()?;
                let model = self.manager.read().await.clone();
                let (jobs, warnings) = plan_slot_renders(
                    &model,
                    &sequence_name,
                    &slots,
                    branches.as_deref(),
                    &settings,
                );
                for warning in &warnings {
                    log::warn!("Slot render: {}", warning);
                }
                if jobs.is_empty() {
                    bail!("no render jobs planned ({} warnings)", warnings.len());
                }
                self.submit_batch(op_id, HostBatch::Render { jobs }).await
            }
            Operation::RelinkMedia { clip_names } => {
                let names = if clip_names.is_empty() {
                    self.manager.read().await.clip_names()
                } else {
                    clip_names
                };
                let media_dir = self.config.read().await.media_dir()?.to_path_buf();
                let media =
                    tokio::task::spawn_blocking(move || MediaIndex::scan(&media_dir)).await??;

                let (actions, warnings) = plan_relink(&names, &media);
                for warning in &warnings {
                    log::warn!("Relink: {}", warning);
                }
                if actions.is_empty() {
                    bail!("no media resolved ({} warnings)", warnings.len());
                }
                self.submit_batch(op_id, HostBatch::Relink { actions }).await
            }
            Operation::PreviewSlot { slot } => {
                let model = self.manager.read().await;
                let Some(target) = model.slots.get(slot) else {
                    bail!("no slot at index {}", slot);
                };
                let batch = HostBatch::SetInOut {
                    in_frame: target.time,
                    out_frame: target.end(),
                };
                drop(model);
                self.submit_batch(op_id, batch).await
            }
        }
    }

    /// A rebuilt or updated document is written straight back when the
    /// config names its file; otherwise it stays in memory only.
    async fn save_if_configured(&self) -> Result<(), anyhow::Error> {
        if let Some(path) = self.config.read().await.flow_path.clone() {
            self.manager.save_to_file(&path).await?;
        }
        Ok(())
    }

    async fn complete(&self, op_id: Uuid, detail: String) -> Result<(), anyhow::Error> {
        self.event_tx
            .send(ExecutorEvent::Completed { op_id, detail })
            .await?;
        Ok(())
    }

    /// Hand a batch to the host link. The operation stays open until the
    /// link reports the host's outcome.
    async fn submit_batch(&self, op_id: Uuid, batch: HostBatch) -> Result<(), anyhow::Error> {
        let batch_id = Uuid::now_v7();
        let summary = batch.summary();
        self.active_batches.write().await.insert(batch_id, op_id);
        self.host_tx
            .send(HostCommand::Submit { batch_id, batch })
            .await?;
        self.event_tx
            .send(ExecutorEvent::BatchSubmitted {
                op_id,
                batch_id,
                summary,
            })
            .await?;
        Ok(())
    }

    async fn handle_link_event(&self, event: LinkEvent) -> Result<(), anyhow::Error> {
        let batch_id = match &event {
            LinkEvent::Applied { batch_id, .. } => *batch_id,
            LinkEvent::Failed { batch_id, .. } => *batch_id,
            LinkEvent::Dropped { batch_id } => *batch_id,
        };
        let Some(op_id) = self.active_batches.write().await.remove(&batch_id) else {
            log::warn!("Received link event for unknown batch_id: {}", batch_id);
            return Ok(());
        };

        match event {
            LinkEvent::Applied {
                placed, skipped, ..
            } => {
                self.event_tx
                    .send(ExecutorEvent::BatchApplied {
                        op_id,
                        batch_id,
                        placed,
                        skipped,
                    })
                    .await?;
                self.complete(
                    op_id,
                    format!("host applied batch ({} placed, {} skipped)", placed, skipped),
                )
                .await?;
            }
            LinkEvent::Failed { error, .. } => {
                self.event_tx
                    .send(ExecutorEvent::Error { op_id, error })
                    .await?;
            }
            LinkEvent::Dropped { .. } => {
                self.event_tx
                    .send(ExecutorEvent::Error {
                        op_id,
                        error: "no host connected".to_string(),
                    })
                    .await?;
            }
        }
        Ok(())
    }
}
