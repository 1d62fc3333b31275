//! Distribution targets and their fixed loudness/peak policy

use serde::{Deserialize, Serialize};

/// Named delivery context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionTarget {
    /// Streaming platforms with loudness normalization
    Streaming,
    /// Club/PA playback
    Club,
}

impl std::str::FromStr for DistributionTarget {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streaming" => Ok(DistributionTarget::Streaming),
            "club" => Ok(DistributionTarget::Club),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown distribution target '{}' (expected streaming or club)",
                other
            ))),
        }
    }
}

/// Platform policy for one distribution target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specifics {
    /// Integrated loudness the master should land on (LUFS)
    pub target_loudness: f64,
    /// Maximum true peak (dBTP)
    pub target_peak: f64,
    /// Short display label
    pub label: String,
    /// Free text describing the playback context, used in oracle prompts
    pub context_text: String,
}
