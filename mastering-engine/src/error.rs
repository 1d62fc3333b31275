//! Engine error type

use thiserror::Error;
use uuid::Uuid;

use crate::advisory::AdvisoryError;
use crate::correction::CorrectionError;
use crate::render::RenderError;

/// Failure of one mastering attempt
#[derive(Debug, Error)]
pub enum MasteringError {
    /// Primary oracle unreachable or gave nothing usable
    #[error("Advisory oracle unavailable: {0}")]
    AdvisoryUnavailable(#[from] AdvisoryError),

    /// Trial render could not be produced; no parameters are returned
    #[error("Render failure: {0}")]
    Render(#[from] RenderError),

    /// Attempt was superseded or cancelled
    #[error("Attempt {0} cancelled")]
    Cancelled(Uuid),

    /// No rendered candidate stayed inside target peak + margin
    #[error("Peak unresolved after {iterations} iterations (lowest peak {lowest_peak_db:.2} dBTP)")]
    PeakUnresolved { iterations: u32, lowest_peak_db: f64 },
}

impl MasteringError {
    pub(crate) fn from_correction(err: CorrectionError, attempt_id: Uuid) -> Self {
        match err {
            CorrectionError::Render(e) => MasteringError::Render(e),
            CorrectionError::Cancelled => MasteringError::Cancelled(attempt_id),
            CorrectionError::PeakUnresolved {
                iterations,
                lowest_peak_db,
            } => MasteringError::PeakUnresolved {
                iterations,
                lowest_peak_db,
            },
        }
    }
}
