//! Self-correction loop
//!
//! Renders a trial master, measures it over several windows, and nudges only
//! `gain_db` until loudness sits within tolerance and peak within margin, or
//! the iteration budget runs out. Iterations are strictly sequential: each
//! one depends on the gain chosen by the previous.

mod gain;
mod windows;

use std::sync::Arc;

use chrono::Utc;
use mastering_common::config::{CorrectionSettings, LoudnessAggregate};
use mastering_common::events::{EventBus, MasteringEvent};
use mastering_common::{CorrectionResult, Params, Specifics};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::clamp::SafetyClamp;
use crate::render::{RenderBoundary, RenderError, SourceAudio, TrialRender};

pub use gain::{bounded_step, step_cap, PeakLimit};
pub use windows::{plan_windows, window_frames, WindowPlan};

/// Smallest gain change that counts as progress (dB)
const MIN_PROGRESS_DB: f64 = 1e-6;

/// Correction loop errors
#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Correction cancelled")]
    Cancelled,

    /// No measured candidate stayed inside target peak + margin
    #[error("Peak unresolved after {iterations} iterations (lowest peak {lowest_peak_db:.2} dBTP)")]
    PeakUnresolved { iterations: u32, lowest_peak_db: f64 },
}

/// How the loop finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionOutcome {
    /// Loudness within tolerance and peak within margin
    Converged { iterations: u32 },
    /// Budget ran out; best peak-safe candidate returned
    Exhausted { iterations: u32 },
}

impl CorrectionOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, CorrectionOutcome::Converged { .. })
    }

    pub fn iterations(&self) -> u32 {
        match self {
            CorrectionOutcome::Converged { iterations } | CorrectionOutcome::Exhausted { iterations } => {
                *iterations
            }
        }
    }
}

/// One render/measure pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub iteration: u32,
    pub gain_db: f64,
    pub measured_loudness: f64,
    pub measured_peak_db: f64,
    pub peak_safe: bool,
}

/// Verified result plus how it was reached
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub result: CorrectionResult,
    pub outcome: CorrectionOutcome,
    pub history: Vec<IterationRecord>,
}

/// Loudness and peak seen across the measurement windows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub loudness: f64,
    pub peak_db: f64,
}

/// Collapse window readings into one observation
///
/// Peak is the maximum over every window and the whole render. Loudness is
/// either the whole-render figure or the loudest window.
pub fn observe(render: &dyn TrialRender, plan: &WindowPlan, aggregate: LoudnessAggregate) -> Observation {
    let whole = render.measure_all();
    let mut peak_db = whole.true_peak_db;
    let mut worst_loudness = f64::NEG_INFINITY;

    for (start, len) in plan.windows() {
        let m = render.measure(start, len);
        peak_db = peak_db.max(m.true_peak_db);
        worst_loudness = worst_loudness.max(m.loudness);
    }

    let loudness = match aggregate {
        LoudnessAggregate::Track => whole.loudness,
        LoudnessAggregate::Worst if worst_loudness.is_finite() => worst_loudness,
        LoudnessAggregate::Worst => whole.loudness,
    };

    Observation { loudness, peak_db }
}

struct Candidate {
    distance: f64,
    result: CorrectionResult,
}

/// Render/measure/adjust loop over one source
pub struct CorrectionLoop {
    renderer: Arc<dyn RenderBoundary>,
    settings: CorrectionSettings,
    clamp: SafetyClamp,
    events: Option<(EventBus, Uuid)>,
}

impl CorrectionLoop {
    pub fn new(renderer: Arc<dyn RenderBoundary>, settings: CorrectionSettings, clamp: SafetyClamp) -> Self {
        Self {
            renderer,
            settings,
            clamp,
            events: None,
        }
    }

    /// Emit a `CorrectionIteration` event per pass
    pub fn with_events(mut self, event_bus: EventBus, attempt_id: Uuid) -> Self {
        self.events = Some((event_bus, attempt_id));
        self
    }

    pub fn settings(&self) -> &CorrectionSettings {
        &self.settings
    }

    /// Correct `initial` against the targets in `specifics`
    ///
    /// Only `gain_db` moves. Render failures propagate; an unverified
    /// parameter set is never returned.
    pub async fn run(
        &self,
        initial: &Params,
        specifics: &Specifics,
        source: Arc<SourceAudio>,
        cancel: &CancellationToken,
    ) -> Result<Correction, CorrectionError> {
        let tolerance = self.settings.loudness_tolerance_db.abs();
        let cap = step_cap(tolerance);
        let limit = PeakLimit {
            target_db: specifics.target_peak,
            margin_db: self.settings.peak_margin_db.abs(),
            max_cut_db: self.settings.max_peak_cut_db,
        };
        let budget = self.settings.max_iterations.max(1);

        let plan = plan_windows(
            source.len(),
            window_frames(self.settings.window_seconds, source.sample_rate()),
            self.settings.tail_windows,
        );

        tracing::debug!(
            target_loudness = specifics.target_loudness,
            target_peak_db = specifics.target_peak,
            step_cap_db = cap,
            budget,
            windows = plan.starts.len(),
            "Starting correction loop"
        );

        let mut params = self.clamp.apply(initial);
        let mut best: Option<Candidate> = None;
        let mut history = Vec::new();
        let mut lowest_peak_db = f64::INFINITY;
        let mut iterations = 0;

        while iterations < budget {
            if cancel.is_cancelled() {
                return Err(CorrectionError::Cancelled);
            }

            let render = self.renderer.render(&params, Arc::clone(&source)).await?;

            // A render that finished after cancellation is stale
            if cancel.is_cancelled() {
                return Err(CorrectionError::Cancelled);
            }

            iterations += 1;
            let observed = observe(render.as_ref(), &plan, self.settings.loudness_aggregate);
            let peak_safe = limit.allows(observed.peak_db);
            let error_db = specifics.target_loudness - observed.loudness;
            lowest_peak_db = lowest_peak_db.min(observed.peak_db);

            let record = IterationRecord {
                iteration: iterations,
                gain_db: params.gain_db,
                measured_loudness: observed.loudness,
                measured_peak_db: observed.peak_db,
                peak_safe,
            };
            self.emit(&record);
            history.push(record);

            tracing::debug!(
                iteration = iterations,
                gain_db = params.gain_db,
                loudness = observed.loudness,
                peak_db = observed.peak_db,
                error_db,
                peak_safe,
                "Correction pass measured"
            );

            let result = CorrectionResult {
                params: params.clone(),
                measured_loudness: observed.loudness,
                measured_peak_db: observed.peak_db,
            };

            if peak_safe && error_db.abs() <= tolerance {
                tracing::info!(
                    iterations,
                    gain_db = params.gain_db,
                    loudness = observed.loudness,
                    peak_db = observed.peak_db,
                    "Correction converged"
                );
                return Ok(Correction {
                    result,
                    outcome: CorrectionOutcome::Converged { iterations },
                    history,
                });
            }

            if peak_safe {
                let distance = error_db.abs();
                if best.as_ref().map_or(true, |b| distance < b.distance) {
                    best = Some(Candidate { distance, result });
                }
            }

            // Loudness moves are capped; a peak cut may go further
            let stepped = bounded_step(params.gain_db, params.gain_db + error_db, cap);
            let next_gain = limit.safe_gain(stepped, params.gain_db, observed.peak_db);

            let mut next = params.clone();
            next.gain_db = next_gain;
            let next = self.clamp.apply(&next);

            if (next.gain_db - params.gain_db).abs() < MIN_PROGRESS_DB {
                tracing::debug!(gain_db = params.gain_db, "Gain pinned, stopping early");
                break;
            }
            params = next;
        }

        match best {
            Some(candidate) => {
                tracing::warn!(
                    iterations,
                    gain_db = candidate.result.params.gain_db,
                    loudness = candidate.result.measured_loudness,
                    peak_db = candidate.result.measured_peak_db,
                    "Correction budget exhausted, returning best peak-safe candidate"
                );
                Ok(Correction {
                    result: candidate.result,
                    outcome: CorrectionOutcome::Exhausted { iterations },
                    history,
                })
            }
            None => Err(CorrectionError::PeakUnresolved {
                iterations,
                lowest_peak_db,
            }),
        }
    }

    fn emit(&self, record: &IterationRecord) {
        if let Some((bus, attempt_id)) = &self.events {
            bus.emit(MasteringEvent::CorrectionIteration {
                attempt_id: *attempt_id,
                iteration: record.iteration,
                gain_db: record.gain_db,
                measured_loudness: record.measured_loudness,
                measured_peak_db: record.measured_peak_db,
                timestamp: Utc::now(),
            });
        }
    }
}
