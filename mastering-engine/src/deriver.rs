//! Parameter deriver
//!
//! Deterministic mapping from (Decision, AnalysisSnapshot, Specifics) to raw
//! [`Params`]. Risk gates sit on top of the categorical intent: high risk or a
//! low-end collision caps saturation, low contour and width no matter what the
//! decision asked for. Output still goes through the safety clamp before use;
//! the caps here and the clamp's bounds are separate layers.

use mastering_common::{
    AdaptiveTiming, AnalysisSnapshot, Band, Decision, EqAdjustment, EqType, HighFreqTreatment,
    KickSafety, Params, SaturationNeed, Specifics, StereoIntent, TransientHandling,
};

use crate::clamp::{PressureProfile, GAIN_MAX_DB, GAIN_MIN_DB, LOW_MONO_MAX_HZ, TUBE_DRIVE_MAX, WIDTH_MAX, WIDTH_MIN};
use crate::risk::{evaluate_risk, low_end_collision, HIGH_RISK};

/// Saturation ceiling once risk reaches [`HIGH_RISK`]
const HIGH_RISK_SATURATION_CAP: f64 = 0.85;
/// Low contour ceiling once risk reaches [`HIGH_RISK`]
const HIGH_RISK_CONTOUR_CAP: f64 = 0.2;
/// Width ceiling under collision or high risk
const GUARDED_WIDTH_CAP: f64 = 1.05;
/// Average presence/air level considered bright enough (dB)
const BRIGHT_FLOOR_DB: f64 = -20.0;
const EXCITER_CEILING: f64 = 0.12;
const BASE_LOW_MONO_HZ: f64 = 120.0;

/// Static gain before and after bounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEstimate {
    /// Target loudness minus measured loudness
    pub raw_db: f64,
    /// `raw_db` limited to the single-stage range [-5, +3]
    pub bounded_db: f64,
}

/// Static gain estimate for a track against a target
///
/// Large gaps are left to the limiter and the correction loop rather than a
/// single gain stage.
pub fn static_gain(snapshot: &AnalysisSnapshot, specifics: &Specifics) -> GainEstimate {
    let raw_db = specifics.target_loudness - snapshot.loudness;
    let raw_db = if raw_db.is_finite() { raw_db } else { 0.0 };
    GainEstimate {
        raw_db,
        bounded_db: raw_db.clamp(GAIN_MIN_DB, GAIN_MAX_DB),
    }
}

/// Derived parameters plus the signals that shaped them
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub params: Params,
    pub gain: GainEstimate,
    pub risk: u8,
    pub collision: bool,
}

/// Derive raw parameters (see [`derive`] for the full trace)
pub fn derive_params(decision: &Decision, snapshot: &AnalysisSnapshot, specifics: &Specifics) -> Params {
    derive(decision, snapshot, specifics).params
}

/// Derive raw parameters and keep the gain/risk trace
pub fn derive(decision: &Decision, snapshot: &AnalysisSnapshot, specifics: &Specifics) -> Derivation {
    let gain = static_gain(snapshot, specifics);
    let risk = evaluate_risk(snapshot, gain.bounded_db);
    let collision = low_end_collision(snapshot);
    let high_risk = risk >= HIGH_RISK;

    // After the clamp divides by (1 + pressure), drive lands on
    // amount / (1 + saturated pressure)
    let tube_drive = saturation_amount(
        decision.saturation_need,
        snapshot.dynamic_range_db(),
        collision,
        high_risk,
    ) * pressure_compensation(snapshot);
    let exciter = exciter_amount(decision.high_freq_treatment, snapshot);
    let low_contour = low_contour_amount(decision.kick_safety, snapshot, collision, high_risk);
    let width = width_amount(decision.stereo_intent, snapshot, collision, high_risk);
    let low_mono_hz = low_mono_frequency(snapshot, collision, high_risk);
    let timing = adaptive_timing(
        decision.transient_handling,
        tube_drive,
        low_contour,
        width,
        low_mono_hz,
        gain.bounded_db,
    );
    let eq_adjustments = eq_adjustments(decision, snapshot, collision);

    let params = Params {
        gain_db: round_to(gain.bounded_db, 2),
        eq_adjustments,
        limiter_ceiling_db: specifics.target_peak,
        tube_drive_amount: tube_drive,
        exciter_amount: round_to(exciter, 3),
        low_contour_amount: round_to(low_contour, 3),
        width_amount: round_to(width, 3),
        low_mono_hz: low_mono_hz.round(),
        target_loudness: specifics.target_loudness,
        timing: Some(timing),
        pressure_derated: false,
    };

    tracing::debug!(
        raw_gain_db = gain.raw_db,
        gain_db = params.gain_db,
        risk,
        collision,
        tube_drive = params.tube_drive_amount,
        exciter = params.exciter_amount,
        low_contour = params.low_contour_amount,
        width = params.width_amount,
        low_mono_hz = params.low_mono_hz,
        eq_moves = params.eq_adjustments.len(),
        "Derived mastering parameters"
    );

    Derivation {
        params,
        gain,
        risk,
        collision,
    }
}

fn saturation_amount(need: SaturationNeed, dynamic_range_db: f64, collision: bool, high_risk: bool) -> f64 {
    // More dynamic material takes more drive before it audibly thickens
    let headroom = if dynamic_range_db.is_finite() {
        (dynamic_range_db - 8.0).clamp(0.0, 10.0)
    } else {
        0.0
    };

    let (base, slope, harmonic_lift) = match need {
        SaturationNeed::None => return 0.0,
        SaturationNeed::Light => (0.25, 0.02, 0.10),
        SaturationNeed::Moderate => (0.55, 0.04, 0.20),
        SaturationNeed::Heavy => (0.95, 0.06, 0.35),
    };

    let mut amount = base + slope * headroom;
    if !collision {
        amount += harmonic_lift;
    }
    amount = amount.min(TUBE_DRIVE_MAX);

    if high_risk {
        amount = amount.min(HIGH_RISK_SATURATION_CAP);
    }
    amount
}

/// `(1 + pressure) / (1 + saturated pressure)`, in (0, 1]
///
/// Exactly 1 while true peak is below 0 dBTP and the margin readings are
/// positive.
fn pressure_compensation(snapshot: &AnalysisSnapshot) -> f64 {
    let pressure = PressureProfile::from_snapshot(snapshot).value();
    let saturated = PressureProfile::saturated(snapshot).value();
    (1.0 + pressure) / (1.0 + saturated)
}

fn exciter_amount(treatment: HighFreqTreatment, snapshot: &AnalysisSnapshot) -> f64 {
    let scale = match treatment {
        HighFreqTreatment::Leave => return 0.0,
        HighFreqTreatment::Polish => 0.55,
        HighFreqTreatment::Lift => 1.0,
    };

    let highs = (snapshot.band_db(Band::Presence) + snapshot.band_db(Band::Air)) / 2.0;
    let deficit = (BRIGHT_FLOOR_DB - highs).clamp(0.0, 12.0);

    (scale * (0.03 + 0.006 * deficit)).clamp(0.0, EXCITER_CEILING)
}

fn low_contour_amount(kick: KickSafety, snapshot: &AnalysisSnapshot, collision: bool, high_risk: bool) -> f64 {
    let bass = snapshot.band_db(Band::Bass);
    let mut amount = 0.15 + 0.02 * (bass + 24.0).clamp(0.0, 15.0);

    if kick == KickSafety::Danger {
        amount += 0.15;
    }
    if collision {
        amount *= 0.5;
    }
    if high_risk {
        amount = amount.min(HIGH_RISK_CONTOUR_CAP);
    }
    amount.max(0.0)
}

fn width_amount(intent: StereoIntent, snapshot: &AnalysisSnapshot, collision: bool, high_risk: bool) -> f64 {
    let measured = if snapshot.stereo_width.is_finite() {
        snapshot.stereo_width.clamp(0.0, 100.0)
    } else {
        50.0
    };

    // Narrow sources get room to open up; already-wide sources get reined in
    let source_adjust = if measured < 30.0 {
        0.08 * (30.0 - measured) / 30.0
    } else if measured > 70.0 {
        -0.1 * (measured - 70.0) / 30.0
    } else {
        0.0
    };

    let mut width = match intent {
        StereoIntent::Narrow => WIDTH_MIN + source_adjust.min(0.0),
        StereoIntent::Balanced => 1.08 + source_adjust,
        StereoIntent::Wide => 1.22 + source_adjust,
    };

    let phase = snapshot.phase_correlation.clamp(-1.0, 1.0);
    if phase < 0.6 {
        width -= (0.6 - phase) * 0.2;
    }

    width = width.clamp(WIDTH_MIN, WIDTH_MAX);
    if collision || high_risk {
        width = width.min(GUARDED_WIDTH_CAP);
    }
    width
}

fn low_mono_frequency(snapshot: &AnalysisSnapshot, collision: bool, high_risk: bool) -> f64 {
    let mut hz = BASE_LOW_MONO_HZ;

    if collision {
        hz += 60.0;
    }
    if high_risk {
        hz += 40.0;
    }
    if snapshot.band_db(Band::Sub) < -28.0 {
        hz += 20.0;
    }
    let out_of_phase = snapshot
        .bass_mono_compatibility
        .map(|c| c < 58.0)
        .unwrap_or(false)
        || snapshot.phase_correlation < 0.3;
    if out_of_phase {
        hz += 40.0;
    }

    hz.clamp(60.0, LOW_MONO_MAX_HZ)
}

/// Timing constants moved together from the derived amounts and gain
fn adaptive_timing(
    transients: TransientHandling,
    tube_drive: f64,
    low_contour: f64,
    width: f64,
    low_mono_hz: f64,
    gain_db: f64,
) -> AdaptiveTiming {
    let push = gain_db.max(0.0);
    let intensity = ((tube_drive / TUBE_DRIVE_MAX)
        + (low_contour / 0.8)
        + ((width - WIDTH_MIN) / (WIDTH_MAX - WIDTH_MIN))
        + (push / GAIN_MAX_DB))
        / 4.0;
    let intensity = intensity.clamp(0.0, 1.0);

    let attack_base = match transients {
        TransientHandling::Soften => 0.004,
        TransientHandling::Preserve => 0.012,
        TransientHandling::Enhance => 0.025,
    };

    AdaptiveTiming {
        crossover_hz: round_to(60.0 + 40.0 * (low_contour / 0.8) + 0.35 * (low_mono_hz - 60.0), 0),
        transient_attack_s: round_to(attack_base * (1.0 - 0.3 * intensity), 4),
        transient_release_s: round_to(0.06 + 0.14 * intensity, 4),
        limiter_attack_s: round_to((0.003 - 0.002 * intensity).max(0.0005), 4),
        limiter_release_s: round_to(0.05 + 0.12 * intensity + 0.02 * push, 4),
    }
}

/// Band level only when the analyzer actually reported it
fn measured(snapshot: &AnalysisSnapshot, band: Band) -> Option<f64> {
    snapshot.bands.get(&band).copied().filter(|v| v.is_finite())
}

fn eq_adjustments(decision: &Decision, snapshot: &AnalysisSnapshot, collision: bool) -> Vec<EqAdjustment> {
    let sub_bass = measured(snapshot, Band::Bass);
    let low_mid = measured(snapshot, Band::LowMid);
    let mid = measured(snapshot, Band::Mid);
    let high_mid = measured(snapshot, Band::HighMid);
    let presence = measured(snapshot, Band::Presence);
    let air = measured(snapshot, Band::Air);

    let mut moves = Vec::new();

    // Low-mid mud
    if let (Some(bass), Some(low_mid)) = (sub_bass, low_mid) {
        let excess = low_mid - bass - 1.5;
        if excess > 0.0 {
            moves.push(eq(EqType::Peak, 300.0, -(0.8 + 0.35 * excess).min(4.0), 1.1));
        }
    }

    // High-mid harshness, unless the decision wants the top lifted
    if decision.high_freq_treatment != HighFreqTreatment::Lift {
        if let (Some(mid), Some(high_mid)) = (mid, high_mid) {
            let excess = high_mid - mid - 1.0;
            if excess > 0.0 {
                moves.push(eq(EqType::Peak, 3_500.0, -(0.5 + 0.3 * excess).min(3.0), 1.4));
            }
        }
    }

    // Presence on clean, bass-heavy material with a thin low-mid
    let clean = !collision && snapshot.distortion_percent < 0.5;
    if clean {
        if let (Some(bass), Some(low_mid), Some(mid)) = (sub_bass, low_mid, mid) {
            let bass_over_mid = bass - mid - 3.0;
            if bass_over_mid > 0.0 && low_mid < bass - 4.0 {
                moves.push(eq(EqType::Peak, 5_000.0, (0.5 + 0.15 * bass_over_mid).min(2.0), 0.9));
            }
        }
    }

    // Low shelf on bass vs low-mid balance
    if let (Some(bass), Some(low_mid)) = (sub_bass, low_mid) {
        let balance = bass - low_mid;
        if balance > 6.0 {
            moves.push(eq(EqType::Lowshelf, 100.0, -(0.5 + 0.25 * (balance - 6.0)).min(3.0), 0.7));
        } else if balance < 1.0 {
            let mut boost = (0.5 + 0.25 * (1.0 - balance)).min(2.5);
            if collision {
                boost *= 0.5;
            }
            moves.push(eq(EqType::Lowshelf, 100.0, boost, 0.7));
        }
    }

    // High shelf on air vs presence tilt
    if let (Some(presence), Some(air)) = (presence, air) {
        let tilt = air - presence;
        if tilt < -8.0 {
            moves.push(eq(EqType::Highshelf, 10_000.0, (0.4 + 0.2 * (-8.0 - tilt)).min(2.5), 0.7));
        } else if tilt > -2.0 {
            moves.push(eq(EqType::Highshelf, 10_000.0, -(0.4 + 0.2 * (tilt + 2.0)).min(2.5), 0.7));
        }
    }

    moves
}

fn eq(eq_type: EqType, frequency_hz: f64, gain_db: f64, q: f64) -> EqAdjustment {
    EqAdjustment {
        eq_type,
        frequency_hz,
        gain_db: round_to(gain_db, 2),
        q,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
