//! Progress events emitted while a run executes.
//!
//! The orchestrator sends an [`Event`] on a channel at every run and stage
//! transition. Consumers (CLI progress output, a UI bridge) subscribe to the
//! receiving end; nothing in the core depends on anyone listening.
//!
//! Uses tagged enum serialization for TypeScript compatibility:
//! ```json
//! {
//!   "type": "stageCompleted",
//!   "payload": {
//!     "run_id": "uuid-here",
//!     "stage_name": "outline",
//!     "sequence": 1,
//!     "duration_ms": 1200
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::run_models::RunStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A run has been accepted and is about to execute its first stage.
    RunStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        content_type: String,
        stage_count: usize,
    },

    /// A run's status has changed.
    RunStatusUpdate {
        #[ts(type = "string")]
        run_id: Uuid,
        status: RunStatus,
        stage_index: usize,
    },

    StageStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        stage_name: String,
        sequence: usize,
    },

    StageCompleted {
        #[ts(type = "string")]
        run_id: Uuid,
        stage_name: String,
        sequence: usize,
        duration_ms: u64,
    },

    StageFailed {
        #[ts(type = "string")]
        run_id: Uuid,
        stage_name: String,
        sequence: usize,
        error: String,
    },

    RunCompleted {
        #[ts(type = "string")]
        run_id: Uuid,
    },

    RunFailed {
        #[ts(type = "string")]
        run_id: Uuid,
        stage_name: String,
        error: String,
    },

    RunCancelled {
        #[ts(type = "string")]
        run_id: Uuid,
        /// Stages that finished before the cancellation took effect.
        completed_stages: usize,
    },
}

impl Event {
    pub fn run_id(&self) -> Uuid {
        match self {
            Event::RunStarted { run_id, .. }
            | Event::RunStatusUpdate { run_id, .. }
            | Event::StageStarted { run_id, .. }
            | Event::StageCompleted { run_id, .. }
            | Event::StageFailed { run_id, .. }
            | Event::RunCompleted { run_id }
            | Event::RunFailed { run_id, .. }
            | Event::RunCancelled { run_id, .. } => *run_id,
        }
    }

    /// Whether this event closes the run's event stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::RunCompleted { .. } | Event::RunFailed { .. } | Event::RunCancelled { .. }
        )
    }
}
