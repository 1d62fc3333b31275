//! Mastering attempt events and the broadcast EventBus
//!
//! Events are observational only; no stage depends on anyone listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::decision::Decision;
use crate::specifics::DistributionTarget;

/// Progress events for one mastering attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MasteringEvent {
    /// A new attempt became the live one
    AttemptStarted {
        attempt_id: Uuid,
        target: DistributionTarget,
        timestamp: DateTime<Utc>,
    },

    /// Categorical intent settled
    DecisionReady {
        attempt_id: Uuid,
        decision: Decision,
        /// How the decision was reached ("default", "solo", "consensus", "reconciled")
        path: String,
        timestamp: DateTime<Utc>,
    },

    /// Deriver + clamp produced candidate parameters
    ParamsDerived {
        attempt_id: Uuid,
        gain_db: f64,
        risk: u8,
        timestamp: DateTime<Utc>,
    },

    /// One render/measure/adjust iteration finished
    CorrectionIteration {
        attempt_id: Uuid,
        iteration: u32,
        gain_db: f64,
        measured_loudness: f64,
        measured_peak_db: f64,
        timestamp: DateTime<Utc>,
    },

    /// Attempt produced a verified result
    AttemptCompleted {
        attempt_id: Uuid,
        converged: bool,
        iterations: u32,
        measured_loudness: f64,
        measured_peak_db: f64,
        timestamp: DateTime<Utc>,
    },

    /// Attempt was superseded or cancelled; its results were dropped
    AttemptDiscarded {
        attempt_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl MasteringEvent {
    /// Attempt this event belongs to
    pub fn attempt_id(&self) -> Uuid {
        match self {
            MasteringEvent::AttemptStarted { attempt_id, .. }
            | MasteringEvent::DecisionReady { attempt_id, .. }
            | MasteringEvent::ParamsDerived { attempt_id, .. }
            | MasteringEvent::CorrectionIteration { attempt_id, .. }
            | MasteringEvent::AttemptCompleted { attempt_id, .. }
            | MasteringEvent::AttemptDiscarded { attempt_id, .. } => *attempt_id,
        }
    }
}

/// Broadcast bus for [`MasteringEvent`]s
///
/// Cheap to clone; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MasteringEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MasteringEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    ///
    /// Returns the number of subscribers reached; zero when nobody listens.
    pub fn emit(&self, event: MasteringEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::trace!("No subscribers for mastering event");
                0
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
