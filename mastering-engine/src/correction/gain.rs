//! Gain arithmetic for the correction loop

/// Per-iteration loudness step cap derived from tolerance
pub fn step_cap(loudness_tolerance_db: f64) -> f64 {
    (0.35 * loudness_tolerance_db.abs()).clamp(0.2, 0.8)
}

/// Move from `applied` toward `desired` by at most `cap`
pub fn bounded_step(applied_db: f64, desired_db: f64, cap: f64) -> f64 {
    applied_db + (desired_db - applied_db).clamp(-cap, cap)
}

/// Peak ceiling the loop accepts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakLimit {
    pub target_db: f64,
    pub margin_db: f64,
    /// Largest single cut a peak overflow may force
    pub max_cut_db: Option<f64>,
}

impl PeakLimit {
    pub fn ceiling_db(&self) -> f64 {
        self.target_db + self.margin_db
    }

    pub fn allows(&self, peak_db: f64) -> bool {
        peak_db <= self.ceiling_db()
    }

    /// Gain that keeps the predicted peak inside the limit
    ///
    /// Predicted peak is the observed peak shifted by the gain change. A
    /// candidate whose prediction fits is kept. Otherwise the applied gain is
    /// cut by the overflow `observed - target + margin`, which lands the
    /// prediction `margin` below target. The cut never raises the candidate.
    pub fn safe_gain(&self, candidate_db: f64, applied_db: f64, observed_peak_db: f64) -> f64 {
        let predicted = observed_peak_db + (candidate_db - applied_db);
        if self.allows(predicted) {
            return candidate_db;
        }

        let overflow = observed_peak_db - self.target_db + self.margin_db;
        let cut = match self.max_cut_db {
            Some(max_cut) if overflow > 0.0 => overflow.min(max_cut.abs()),
            _ => overflow,
        };

        candidate_db.min(applied_db - cut)
    }
}
