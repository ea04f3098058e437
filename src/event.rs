use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    executor::{ExecutorEvent, OpKind},
    flow::verify::VerifyReport,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "param")]
pub enum UiEvent {
    // Operation progress
    OpStarted {
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
    OpCompleted {
        op_id: Uuid,
        detail: String,
    },
    OpFailed {
        op_id: Uuid,
        error: String,
    },

    // Document and configuration events
    ShowflowLoaded,
    ShowflowSaved,
    ConfigUpdated,
}

impl From<ExecutorEvent> for UiEvent {
    fn from(value: ExecutorEvent) -> Self {
        match value {
            ExecutorEvent::Started { op_id, kind } => UiEvent::OpStarted { op_id, kind },
            ExecutorEvent::SlotsRebuilt { op_id, slot_count } => {
                UiEvent::SlotsRebuilt { op_id, slot_count }
            }
            ExecutorEvent::VerifyFinished { op_id, report } => {
                UiEvent::VerifyFinished { op_id, report }
            }
            ExecutorEvent::BatchSubmitted {
                op_id,
                batch_id,
                summary,
            } => UiEvent::BatchSubmitted {
                op_id,
                batch_id,
                summary,
            },
            ExecutorEvent::BatchApplied {
                op_id,
                batch_id,
                placed,
                skipped,
            } => UiEvent::BatchApplied {
                op_id,
                batch_id,
                placed,
                skipped,
            },
            ExecutorEvent::Completed { op_id, detail } => UiEvent::OpCompleted { op_id, detail },
            ExecutorEvent::Error { op_id, error } => UiEvent::OpFailed { op_id, error },
        }
    }
}
