//! Attempt pipeline
//!
//! specifics → decision → derive → clamp → correct, one attempt at a time.
//! Each attempt owns its whole chain; the only thing shared between attempts
//! is the read-only source audio.

use std::sync::Arc;

use chrono::Utc;
use mastering_common::config::CorrectionSettings;
use mastering_common::events::{EventBus, MasteringEvent};
use mastering_common::{AnalysisSnapshot, Decision, DistributionTarget, Params, Specifics};
use uuid::Uuid;

use crate::advisory::{AdvisoryPanel, PanelDecision};
use crate::clamp::SafetyClamp;
use crate::correction::{Correction, CorrectionLoop};
use crate::deriver::{derive, Derivation};
use crate::error::MasteringError;
use crate::render::{RenderBoundary, SourceAudio};
use crate::session::{AttemptHandle, MasteringSession};
use crate::specifics::resolve_specifics;

/// Inputs for one attempt
#[derive(Debug, Clone)]
pub struct MasteringRequest {
    pub snapshot: AnalysisSnapshot,
    pub target: DistributionTarget,
    pub source: Arc<SourceAudio>,
}

/// Everything one successful attempt produced
#[derive(Debug, Clone)]
pub struct MasteringReport {
    pub attempt_id: Uuid,
    pub specifics: Specifics,
    pub decision: PanelDecision,
    pub derivation: Derivation,
    /// Clamped parameters handed to the correction loop
    pub candidate: Params,
    pub correction: Correction,
}

/// Derive and clamp parameters without rendering
pub fn plan_params(decision: &Decision, snapshot: &AnalysisSnapshot, specifics: &Specifics) -> (Derivation, Params) {
    let derivation = derive(decision, snapshot, specifics);
    let candidate = SafetyClamp::for_snapshot(snapshot).apply(&derivation.params);
    (derivation, candidate)
}

pub struct MasteringPipeline {
    panel: AdvisoryPanel,
    renderer: Arc<dyn RenderBoundary>,
    settings: CorrectionSettings,
    session: Arc<MasteringSession>,
    event_bus: EventBus,
}

impl MasteringPipeline {
    pub fn new(
        panel: AdvisoryPanel,
        renderer: Arc<dyn RenderBoundary>,
        settings: CorrectionSettings,
        event_bus: EventBus,
    ) -> Self {
        Self {
            panel,
            renderer,
            settings,
            session: Arc::new(MasteringSession::new()),
            event_bus,
        }
    }

    pub fn session(&self) -> &Arc<MasteringSession> {
        &self.session
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Run one attempt to a verified result
    ///
    /// Starting this attempt cancels any attempt still running. If this
    /// attempt is itself superseded, its results are dropped and
    /// [`MasteringError::Cancelled`] is returned.
    pub async fn run_attempt(&self, request: MasteringRequest) -> Result<MasteringReport, MasteringError> {
        let attempt = self.session.begin_attempt().await;
        let attempt_id = attempt.id();

        tracing::info!(attempt_id = %attempt_id, target = ?request.target, "Mastering attempt started");
        self.event_bus.emit(MasteringEvent::AttemptStarted {
            attempt_id,
            target: request.target,
            timestamp: Utc::now(),
        });

        let specifics = resolve_specifics(request.target);

        let decision = self.panel.decide(&request.snapshot, &specifics).await?;
        self.ensure_live(&attempt, "superseded during advisory").await?;
        self.event_bus.emit(MasteringEvent::DecisionReady {
            attempt_id,
            decision: decision.decision,
            path: decision.path.as_str().to_string(),
            timestamp: Utc::now(),
        });

        let (derivation, candidate) = plan_params(&decision.decision, &request.snapshot, &specifics);
        self.event_bus.emit(MasteringEvent::ParamsDerived {
            attempt_id,
            gain_db: candidate.gain_db,
            risk: derivation.risk,
            timestamp: Utc::now(),
        });

        let correction = CorrectionLoop::new(
            Arc::clone(&self.renderer),
            self.settings.clone(),
            SafetyClamp::for_snapshot(&request.snapshot),
        )
        .with_events(self.event_bus.clone(), attempt_id)
        .run(&candidate, &specifics, Arc::clone(&request.source), attempt.token())
        .await
        .map_err(|e| MasteringError::from_correction(e, attempt_id));

        let correction = match correction {
            Ok(correction) => correction,
            Err(MasteringError::Cancelled(id)) => {
                self.discard(id, "cancelled during correction");
                return Err(MasteringError::Cancelled(id));
            }
            Err(e) => return Err(e),
        };
        self.ensure_live(&attempt, "superseded before delivery").await?;

        tracing::info!(
            attempt_id = %attempt_id,
            converged = correction.outcome.is_converged(),
            iterations = correction.outcome.iterations(),
            gain_db = correction.result.params.gain_db,
            loudness = correction.result.measured_loudness,
            peak_db = correction.result.measured_peak_db,
            "Mastering attempt completed"
        );
        self.event_bus.emit(MasteringEvent::AttemptCompleted {
            attempt_id,
            converged: correction.outcome.is_converged(),
            iterations: correction.outcome.iterations(),
            measured_loudness: correction.result.measured_loudness,
            measured_peak_db: correction.result.measured_peak_db,
            timestamp: Utc::now(),
        });

        Ok(MasteringReport {
            attempt_id,
            specifics,
            decision,
            derivation,
            candidate,
            correction,
        })
    }

    async fn ensure_live(&self, attempt: &AttemptHandle, reason: &str) -> Result<(), MasteringError> {
        if attempt.is_cancelled() || !self.session.is_live(attempt.id()).await {
            self.discard(attempt.id(), reason);
            return Err(MasteringError::Cancelled(attempt.id()));
        }
        Ok(())
    }

    fn discard(&self, attempt_id: Uuid, reason: &str) {
        tracing::warn!(attempt_id = %attempt_id, reason, "Discarding stale attempt results");
        self.event_bus.emit(MasteringEvent::AttemptDiscarded {
            attempt_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }
}
