//! Attempt identity and cancellation
//!
//! One live attempt per session. Starting a new attempt cancels the previous
//! one; anything the old attempt still produces is discarded by comparing
//! its id with the live one.

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identity plus cancellation token of one attempt
#[derive(Debug, Clone)]
pub struct AttemptHandle {
    id: Uuid,
    token: CancellationToken,
}

impl AttemptHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Tracks which attempt is live
#[derive(Debug, Default)]
pub struct MasteringSession {
    live: RwLock<Option<AttemptHandle>>,
}

impl MasteringSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new attempt, cancelling whichever one was live
    pub async fn begin_attempt(&self) -> AttemptHandle {
        let handle = AttemptHandle {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        };

        let mut live = self.live.write().await;
        if let Some(previous) = live.replace(handle.clone()) {
            tracing::info!(
                attempt_id = %previous.id,
                superseded_by = %handle.id,
                "Cancelling superseded attempt"
            );
            previous.token.cancel();
        }
        handle
    }

    /// Whether `attempt_id` is still the live attempt and not cancelled
    pub async fn is_live(&self, attempt_id: Uuid) -> bool {
        self.live
            .read()
            .await
            .as_ref()
            .map_or(false, |h| h.id == attempt_id && !h.token.is_cancelled())
    }

    pub async fn live_attempt(&self) -> Option<Uuid> {
        self.live.read().await.as_ref().map(|h| h.id)
    }

    /// Cancel the live attempt, if any
    pub async fn cancel_live(&self) {
        if let Some(handle) = self.live.write().await.take() {
            tracing::info!(attempt_id = %handle.id, "Cancelling live attempt");
            handle.token.cancel();
        }
    }
}
