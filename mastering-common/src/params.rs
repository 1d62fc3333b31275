//! Continuous signal-processing parameters
//!
//! [`Params`] is produced by the deriver (or any other producer), always passed
//! through the safety clamp, adjusted gain-only by the correction loop, and
//! finally handed to rendering.

use serde::{Deserialize, Serialize};

/// Filter shape of one EQ adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqType {
    Lowshelf,
    Highshelf,
    Peak,
}

/// One EQ move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqAdjustment {
    #[serde(rename = "type")]
    pub eq_type: EqType,
    pub frequency_hz: f64,
    pub gain_db: f64,
    pub q: f64,
}

/// Timing constants derived together from the processing amounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveTiming {
    /// Split frequency of the low-end contour stage (Hz)
    pub crossover_hz: f64,
    pub transient_attack_s: f64,
    pub transient_release_s: f64,
    pub limiter_attack_s: f64,
    pub limiter_release_s: f64,
}

/// Continuous mastering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    /// Static gain stage (dB)
    pub gain_db: f64,

    /// EQ moves in the order they are applied; appended to, never reordered
    #[serde(default)]
    pub eq_adjustments: Vec<EqAdjustment>,

    /// Output limiter ceiling (dBTP)
    pub limiter_ceiling_db: f64,

    /// Tube saturation drive (0..2)
    pub tube_drive_amount: f64,

    /// Harmonic exciter mix (0..0.12)
    pub exciter_amount: f64,

    /// Low-end contour amount (0..0.8)
    pub low_contour_amount: f64,

    /// Stereo width multiplier (1..1.4)
    pub width_amount: f64,

    /// Below this frequency the side channel is summed to mono (Hz)
    pub low_mono_hz: f64,

    /// Loudness the master is aimed at (LUFS)
    pub target_loudness: f64,

    #[serde(default)]
    pub timing: Option<AdaptiveTiming>,

    /// Set once the safety clamp has de-rated the drive stages by the
    /// pressure profile; later clamps only enforce bounds. In-process only:
    /// never read from or written to the wire, so Params arriving from any
    /// producer are always de-rated.
    #[serde(skip)]
    pub pressure_derated: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            eq_adjustments: Vec::new(),
            limiter_ceiling_db: -1.0,
            tube_drive_amount: 0.0,
            exciter_amount: 0.0,
            low_contour_amount: 0.0,
            width_amount: 1.0,
            low_mono_hz: 120.0,
            target_loudness: -14.0,
            timing: None,
            pressure_derated: false,
        }
    }
}

/// Verified outcome of one correction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionResult {
    pub params: Params,
    /// Loudness of the rendered master (LUFS)
    pub measured_loudness: f64,
    /// Highest true peak across measured windows (dBTP)
    pub measured_peak_db: f64,
}
