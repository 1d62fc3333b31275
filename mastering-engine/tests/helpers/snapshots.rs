//! Analysis snapshot builders

use mastering_common::{
    AnalysisSnapshot, Band, Decision, HighFreqTreatment, KickSafety, OrdinalField, SaturationNeed, StereoIntent,
    TransientHandling,
};

/// Quiet, clean, narrow source
pub fn scenario_a_snapshot() -> AnalysisSnapshot {
    AnalysisSnapshot {
        loudness: -15.5,
        true_peak: -5.5,
        crest_factor: 11.1,
        stereo_width: 11.0,
        phase_correlation: 0.99,
        distortion_percent: 0.06,
        noise_floor_db: -82.0,
        ..AnalysisSnapshot::default()
    }
    .with_band(Band::Sub, -22.0)
    .with_band(Band::Bass, -16.0)
    .with_band(Band::LowMid, -18.0)
    .with_band(Band::Mid, -19.0)
    .with_band(Band::HighMid, -21.0)
    .with_band(Band::Presence, -24.0)
    .with_band(Band::Air, -29.0)
}

/// Well-behaved mid-loudness mix
pub fn clean_snapshot() -> AnalysisSnapshot {
    AnalysisSnapshot {
        loudness: -13.0,
        true_peak: -3.0,
        crest_factor: 12.0,
        dynamic_range: Some(11.0),
        stereo_width: 45.0,
        phase_correlation: 0.85,
        distortion_percent: 0.1,
        noise_floor_db: -80.0,
        ..AnalysisSnapshot::default()
    }
    .with_band(Band::Sub, -20.0)
    .with_band(Band::Bass, -15.0)
    .with_band(Band::LowMid, -17.0)
    .with_band(Band::Mid, -18.0)
    .with_band(Band::HighMid, -20.0)
    .with_band(Band::Presence, -22.0)
    .with_band(Band::Air, -27.0)
}

/// Hot, squashed, out-of-phase mix with overlapping sub and bass
pub fn collision_snapshot() -> AnalysisSnapshot {
    AnalysisSnapshot {
        loudness: -9.0,
        true_peak: -0.2,
        crest_factor: 7.5,
        stereo_width: 70.0,
        phase_correlation: 0.05,
        distortion_percent: 1.8,
        noise_floor_db: -70.0,
        ..AnalysisSnapshot::default()
    }
    .with_band(Band::Sub, -10.0)
    .with_band(Band::Bass, -9.0)
    .with_band(Band::LowMid, -12.0)
    .with_band(Band::Mid, -14.0)
    .with_band(Band::HighMid, -16.0)
    .with_band(Band::Presence, -19.0)
    .with_band(Band::Air, -24.0)
}

/// Every combination of the five categorical fields, at a fixed confidence
pub fn all_decisions() -> Vec<Decision> {
    let mut out = Vec::new();
    for &kick_safety in KickSafety::ALL {
        for &saturation_need in SaturationNeed::ALL {
            for &transient_handling in TransientHandling::ALL {
                for &high_freq_treatment in HighFreqTreatment::ALL {
                    for &stereo_intent in StereoIntent::ALL {
                        out.push(Decision {
                            kick_safety,
                            saturation_need,
                            transient_handling,
                            high_freq_treatment,
                            stereo_intent,
                            confidence: 0.7,
                        });
                    }
                }
            }
        }
    }
    out
}
