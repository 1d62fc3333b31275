//! Safety clamp
//!
//! Forces any [`Params`] into absolute safe bounds, whoever produced them, and
//! de-rates the drive stages once by the track's pressure profile.
//! Idempotent: `clamp(clamp(x)) == clamp(x)`. The de-rating is recorded in
//! `Params::pressure_derated` so a second pass only re-checks bounds. The
//! marker is in-process only; Params read from JSON are always de-rated.

use mastering_common::{AdaptiveTiming, AnalysisSnapshot, EqAdjustment, Params};

pub const GAIN_MIN_DB: f64 = -5.0;
pub const GAIN_MAX_DB: f64 = 3.0;
pub const TUBE_DRIVE_MAX: f64 = 2.0;
pub const EXCITER_MAX: f64 = 0.12;
pub const LOW_CONTOUR_MAX: f64 = 0.8;
pub const WIDTH_MIN: f64 = 1.0;
pub const WIDTH_MAX: f64 = 1.4;
pub const LOW_MONO_MIN_HZ: f64 = 20.0;
pub const LOW_MONO_MAX_HZ: f64 = 320.0;
/// Highest ceiling the limiter may use before pressure is subtracted (dBTP)
pub const CEILING_BASE_DB: f64 = -0.1;
/// Lowest ceiling the clamp will ever produce (dBTP)
pub const CEILING_FLOOR_DB: f64 = -3.0;
const TARGET_LOUDNESS_RANGE: (f64, f64) = (-30.0, 0.0);
const EQ_GAIN_LIMIT_DB: f64 = 6.0;
const EQ_FREQ_RANGE: (f64, f64) = (20.0, 20_000.0);
const EQ_Q_RANGE: (f64, f64) = (0.1, 10.0);

/// Headroom/risk summary of a track
///
/// Mean of five terms: `1/(|truePeak|+1)`, `1/(|crestFactor|+1)`,
/// `1/(|dynamicRange|+1)`, `|distortionPercent|`, `1/(|phaseCorrelation|+1)`.
/// Larger means less margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureProfile {
    value: f64,
    distortion: f64,
}

impl PressureProfile {
    pub fn from_snapshot(snapshot: &AnalysisSnapshot) -> Self {
        let distortion = finite_or_zero(snapshot.distortion_percent).abs();
        let terms = [
            inverse_margin(snapshot.true_peak),
            inverse_margin(snapshot.crest_factor),
            inverse_margin(snapshot.dynamic_range_db()),
            distortion,
            inverse_margin(snapshot.phase_correlation),
        ];
        let value = terms.iter().sum::<f64>() / terms.len() as f64;

        tracing::debug!(pressure = value, distortion, "Pressure profile");

        Self { value, distortion }
    }

    /// Same five terms, with true peak and the margin readings saturated at
    /// their worst point
    ///
    /// True peak at or above 0 dBTP, and crest factor, dynamic range or phase
    /// correlation at or below 0, each count as a full term of 1. Never less
    /// than [`from_snapshot`](Self::from_snapshot), and never falls as any of
    /// those readings worsen.
    pub fn saturated(snapshot: &AnalysisSnapshot) -> Self {
        let distortion = finite_or_zero(snapshot.distortion_percent).abs();
        let terms = [
            floor_margin(-snapshot.true_peak),
            floor_margin(snapshot.crest_factor),
            floor_margin(snapshot.dynamic_range_db()),
            distortion,
            floor_margin(snapshot.phase_correlation),
        ];
        Self {
            value: terms.iter().sum::<f64>() / terms.len() as f64,
            distortion,
        }
    }

    /// Profile that de-rates nothing
    pub fn none() -> Self {
        Self {
            value: 0.0,
            distortion: 0.0,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn distortion(&self) -> f64 {
        self.distortion
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

fn inverse_margin(x: f64) -> f64 {
    if x.is_finite() {
        1.0 / (x.abs() + 1.0)
    } else {
        0.0
    }
}

fn floor_margin(x: f64) -> f64 {
    if x.is_finite() {
        1.0 / (x.max(0.0) + 1.0)
    } else {
        0.0
    }
}

/// Bound a value; non-finite input becomes `fallback`
fn bounded(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Clamp bound to one track's pressure profile
#[derive(Debug, Clone, Copy)]
pub struct SafetyClamp {
    pressure: PressureProfile,
}

impl SafetyClamp {
    pub fn new(pressure: PressureProfile) -> Self {
        Self { pressure }
    }

    pub fn for_snapshot(snapshot: &AnalysisSnapshot) -> Self {
        Self::new(PressureProfile::from_snapshot(snapshot))
    }

    pub fn pressure(&self) -> PressureProfile {
        self.pressure
    }

    /// Produce bounded-safe parameters
    pub fn apply(&self, params: &Params) -> Params {
        let mut out = params.clone();

        out.gain_db = bounded(out.gain_db, GAIN_MIN_DB, GAIN_MAX_DB, 0.0);
        out.tube_drive_amount = bounded(out.tube_drive_amount, 0.0, TUBE_DRIVE_MAX, 0.0);
        out.exciter_amount = bounded(out.exciter_amount, 0.0, EXCITER_MAX, 0.0);
        out.low_contour_amount = bounded(out.low_contour_amount, 0.0, LOW_CONTOUR_MAX, 0.0);
        out.width_amount = bounded(out.width_amount, WIDTH_MIN, WIDTH_MAX, WIDTH_MIN);
        out.low_mono_hz = bounded(out.low_mono_hz, LOW_MONO_MIN_HZ, LOW_MONO_MAX_HZ, 120.0);
        out.limiter_ceiling_db = bounded(
            out.limiter_ceiling_db,
            CEILING_FLOOR_DB,
            CEILING_BASE_DB,
            CEILING_BASE_DB,
        );
        out.target_loudness = bounded(
            out.target_loudness,
            TARGET_LOUDNESS_RANGE.0,
            TARGET_LOUDNESS_RANGE.1,
            -14.0,
        );

        for eq in out.eq_adjustments.iter_mut() {
            bound_eq(eq);
        }
        if let Some(timing) = out.timing.as_mut() {
            bound_timing(timing);
        }

        if !out.pressure_derated {
            let p = self.pressure.value;
            out.tube_drive_amount /= 1.0 + p;
            out.exciter_amount /= 1.0 + p + self.pressure.distortion;
            out.limiter_ceiling_db = (out.limiter_ceiling_db - p).max(CEILING_FLOOR_DB);
            out.pressure_derated = true;

            tracing::debug!(
                pressure = p,
                tube_drive = out.tube_drive_amount,
                exciter = out.exciter_amount,
                ceiling_db = out.limiter_ceiling_db,
                "Pressure de-rating applied"
            );
        }

        out
    }
}

fn bound_eq(eq: &mut EqAdjustment) {
    eq.frequency_hz = bounded(eq.frequency_hz, EQ_FREQ_RANGE.0, EQ_FREQ_RANGE.1, 1_000.0);
    eq.gain_db = bounded(eq.gain_db, -EQ_GAIN_LIMIT_DB, EQ_GAIN_LIMIT_DB, 0.0);
    eq.q = bounded(eq.q, EQ_Q_RANGE.0, EQ_Q_RANGE.1, 0.707);
}

fn bound_timing(timing: &mut AdaptiveTiming) {
    timing.crossover_hz = bounded(timing.crossover_hz, 40.0, LOW_MONO_MAX_HZ, 120.0);
    timing.transient_attack_s = bounded(timing.transient_attack_s, 0.0005, 0.05, 0.01);
    timing.transient_release_s = bounded(timing.transient_release_s, 0.02, 0.5, 0.1);
    timing.limiter_attack_s = bounded(timing.limiter_attack_s, 0.0005, 0.01, 0.002);
    timing.limiter_release_s = bounded(timing.limiter_release_s, 0.02, 0.5, 0.1);
}

/// Convenience wrapper: clamp against a snapshot's pressure profile
pub fn clamp_params(params: &Params, snapshot: &AnalysisSnapshot) -> Params {
    SafetyClamp::for_snapshot(snapshot).apply(params)
}
