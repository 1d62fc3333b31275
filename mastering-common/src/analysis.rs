//! Measured acoustic profile of a track
//!
//! Produced once per upload by the external analysis collaborator and read by
//! every downstream stage. Never mutated after construction.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Level assumed for a frequency band the analyzer did not report (dB)
pub const MISSING_BAND_DB: f64 = -24.0;

/// Named frequency band reported by the analyzer
///
/// Keys of [`AnalysisSnapshot::bands`]; the map guarantees each name appears once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Band {
    /// 20-60 Hz
    Sub,
    /// 60-250 Hz
    Bass,
    /// 250-500 Hz
    LowMid,
    /// 500 Hz-2 kHz
    Mid,
    /// 2-4 kHz
    HighMid,
    /// 4-6 kHz
    Presence,
    /// 6-20 kHz
    Air,
}

impl Band {
    /// Parse an analyzer band name (`sub`, `bass`, `lowMid`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sub" => Some(Band::Sub),
            "bass" => Some(Band::Bass),
            "lowMid" => Some(Band::LowMid),
            "mid" => Some(Band::Mid),
            "highMid" => Some(Band::HighMid),
            "presence" => Some(Band::Presence),
            "air" => Some(Band::Air),
            _ => None,
        }
    }
}

/// Keep the bands this crate knows; analyzers may report extra ones
fn known_bands<'de, D>(deserializer: D) -> Result<BTreeMap<Band, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, level)| match Band::from_name(&name) {
            Some(band) => Some((band, level)),
            None => {
                tracing::debug!(band = %name, "Ignoring unknown analysis band");
                None
            }
        })
        .collect())
}

/// Loudness/peak reading for one time window of the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    /// Window start in seconds from the beginning of the track
    pub timestamp_s: f64,
    /// Short-term loudness (LUFS)
    pub loudness: f64,
    /// True peak within the window (dBTP)
    pub true_peak: f64,
}

/// Measured acoustic profile of one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    /// Integrated loudness (LUFS, typically -30..0)
    pub loudness: f64,

    /// True peak (dBTP)
    pub true_peak: f64,

    /// Peak-to-average ratio (dB, >= 0)
    pub crest_factor: f64,

    /// Dynamic range (dB); analyzers that omit it fall back to crest factor
    #[serde(default)]
    pub dynamic_range: Option<f64>,

    /// Stereo width (0..100)
    pub stereo_width: f64,

    /// Phase correlation (-1..1)
    pub phase_correlation: f64,

    /// Estimated harmonic distortion (percent, >= 0)
    pub distortion_percent: f64,

    /// Noise floor (dB)
    pub noise_floor_db: f64,

    /// Average level per named band (dB); unknown band names are dropped
    #[serde(default, deserialize_with = "known_bands")]
    pub bands: BTreeMap<Band, f64>,

    // Richer low-end diagnostics. All optional.
    #[serde(default)]
    pub low_end_crest_db: Option<f64>,
    #[serde(default)]
    pub sub_energy_ratio: Option<f64>,
    #[serde(default)]
    pub low_end_to_low_mid_ratio: Option<f64>,
    #[serde(default)]
    pub bass_mono_compatibility: Option<f64>,
    #[serde(default)]
    pub transient_density: Option<f64>,

    /// Analyzer's own low-end distortion risk score (0..6)
    #[serde(default)]
    pub distortion_risk_score: Option<f64>,

    /// Ordered per-window readings
    #[serde(default)]
    pub windows: Vec<WindowSnapshot>,
}

impl AnalysisSnapshot {
    /// Level of a band, or [`MISSING_BAND_DB`] when the analyzer omitted it
    pub fn band_db(&self, band: Band) -> f64 {
        self.bands
            .get(&band)
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(MISSING_BAND_DB)
    }

    /// Dynamic range, falling back to crest factor
    pub fn dynamic_range_db(&self) -> f64 {
        self.dynamic_range.unwrap_or(self.crest_factor)
    }

    /// Builder helper: set one band level
    pub fn with_band(mut self, band: Band, level_db: f64) -> Self {
        self.bands.insert(band, level_db);
        self
    }
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            loudness: -14.0,
            true_peak: -1.0,
            crest_factor: 10.0,
            dynamic_range: None,
            stereo_width: 50.0,
            phase_correlation: 0.8,
            distortion_percent: 0.1,
            noise_floor_db: -80.0,
            bands: BTreeMap::new(),
            low_end_crest_db: None,
            sub_energy_ratio: None,
            low_end_to_low_mid_ratio: None,
            bass_mono_compatibility: None,
            transient_density: None,
            distortion_risk_score: None,
            windows: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_band_uses_fallback() {
        let snapshot = AnalysisSnapshot::default().with_band(Band::Bass, -9.0);
        assert_eq!(snapshot.band_db(Band::Bass), -9.0);
        assert_eq!(snapshot.band_db(Band::Air), MISSING_BAND_DB);
    }

    #[test]
    fn test_dynamic_range_falls_back_to_crest() {
        let mut snapshot = AnalysisSnapshot {
            crest_factor: 11.5,
            ..Default::default()
        };
        assert_eq!(snapshot.dynamic_range_db(), 11.5);
        snapshot.dynamic_range = Some(7.0);
        assert_eq!(snapshot.dynamic_range_db(), 7.0);
    }

    #[test]
    fn test_deserialize_camel_case_with_bands() {
        let json = r#"{
            "loudness": -15.5, "truePeak": -5.5, "crestFactor": 11.1,
            "stereoWidth": 11, "phaseCorrelation": 0.99, "distortionPercent": 0.06,
            "noiseFloorDb": -72,
            "bands": { "sub": -20.0, "lowMid": -14.0 },
            "subEnergyRatio": 0.2
        }"#;
        let snapshot: AnalysisSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.band_db(Band::LowMid), -14.0);
        assert_eq!(snapshot.sub_energy_ratio, Some(0.2));
        assert!(snapshot.windows.is_empty());
    }

    #[test]
    fn test_unknown_band_names_are_dropped() {
        let json = r#"{
            "loudness": -14.0, "truePeak": -1.0, "crestFactor": 10.0,
            "stereoWidth": 50, "phaseCorrelation": 0.8, "distortionPercent": 0.1,
            "noiseFloorDb": -80,
            "bands": { "bass": -12.0, "ultrasonic": -60.0, "lowMids": -3.0 }
        }"#;
        let snapshot: AnalysisSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.bands.len(), 1);
        assert_eq!(snapshot.band_db(Band::Bass), -12.0);
        assert_eq!(snapshot.band_db(Band::LowMid), MISSING_BAND_DB);
    }

    #[test]
    fn test_band_names_match_wire_names() {
        for band in [Band::Sub, Band::Bass, Band::LowMid, Band::Mid, Band::HighMid, Band::Presence, Band::Air] {
            let name = serde_json::to_value(band).unwrap();
            assert_eq!(Band::from_name(name.as_str().unwrap()), Some(band));
        }
    }
}
