//! Low-end distortion risk evaluation
//!
//! Three independent sub-scores, combined by maximum: any one strong signal
//! is enough to flag risk.
//! - heuristic (0..6): clipping/density indicators plus the candidate gain
//! - diagnostic (0..6): the analyzer's own precomputed score
//! - detailed (0..4): low-end tonal/phase diagnostics

use mastering_common::{AnalysisSnapshot, Band};

/// Risk at or above which the deriver applies its hard caps
pub const HIGH_RISK: u8 = 4;

/// Highest possible risk score
pub const MAX_RISK: u8 = 6;

/// Sub-scores behind a risk value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskBreakdown {
    pub heuristic: u8,
    pub diagnostic: u8,
    pub detailed: u8,
}

impl RiskBreakdown {
    /// Combined risk (maximum of the sub-scores)
    pub fn score(&self) -> u8 {
        self.heuristic.max(self.diagnostic).max(self.detailed)
    }
}

/// Evaluate low-end distortion risk for a snapshot at a candidate gain
pub fn evaluate_risk(snapshot: &AnalysisSnapshot, candidate_gain_db: f64) -> u8 {
    risk_breakdown(snapshot, candidate_gain_db).score()
}

/// Evaluate and keep the individual sub-scores
pub fn risk_breakdown(snapshot: &AnalysisSnapshot, candidate_gain_db: f64) -> RiskBreakdown {
    let breakdown = RiskBreakdown {
        heuristic: heuristic_score(snapshot, candidate_gain_db),
        diagnostic: diagnostic_score(snapshot),
        detailed: detailed_score(snapshot),
    };

    tracing::debug!(
        heuristic = breakdown.heuristic,
        diagnostic = breakdown.diagnostic,
        detailed = breakdown.detailed,
        risk = breakdown.score(),
        "Risk evaluated"
    );

    breakdown
}

fn heuristic_score(snapshot: &AnalysisSnapshot, candidate_gain_db: f64) -> u8 {
    let sub = snapshot.band_db(Band::Sub);
    let bass = snapshot.band_db(Band::Bass);

    [
        snapshot.true_peak > -1.2,
        snapshot.crest_factor < 9.5,
        snapshot.distortion_percent > 0.8,
        snapshot.phase_correlation < 0.2,
        sub > -15.0 && bass > -12.5,
        candidate_gain_db > 1.2,
    ]
    .iter()
    .filter(|hit| **hit)
    .count() as u8
}

fn diagnostic_score(snapshot: &AnalysisSnapshot) -> u8 {
    snapshot
        .distortion_risk_score
        .filter(|s| s.is_finite())
        .map(|s| s.round().clamp(0.0, MAX_RISK as f64) as u8)
        .unwrap_or(0)
}

fn detailed_score(snapshot: &AnalysisSnapshot) -> u8 {
    // Missing diagnostics fall back to values that only trip on already-bad
    // broadband readings.
    let low_end_crest = snapshot
        .low_end_crest_db
        .unwrap_or(snapshot.crest_factor);
    let sub_energy_ratio = snapshot.sub_energy_ratio.unwrap_or(0.2);
    let low_to_low_mid = snapshot.low_end_to_low_mid_ratio.unwrap_or(1.0);
    let mono_compat = snapshot
        .bass_mono_compatibility
        .unwrap_or_else(|| (snapshot.phase_correlation.clamp(-1.0, 1.0) + 1.0) * 50.0);

    [
        low_end_crest < 8.8,
        sub_energy_ratio > 0.35,
        low_to_low_mid > 1.7,
        mono_compat < 58.0,
    ]
    .iter()
    .filter(|hit| **hit)
    .count() as u8
}

/// Stricter, independent check for low-end collision
///
/// Gates harmonic lift and forces the low end and stereo image toward safe
/// settings. Fires on any single indicator.
pub fn low_end_collision(snapshot: &AnalysisSnapshot) -> bool {
    let sub = snapshot.band_db(Band::Sub);
    let bass = snapshot.band_db(Band::Bass);

    snapshot.distortion_percent > 0.6
        || snapshot.crest_factor < 10.0
        || snapshot.phase_correlation < 0.35
        || (sub > -16.0 && bass > -13.5)
        || snapshot.true_peak > -1.0
}
