//! Categorical mastering intent
//!
//! A [`Decision`] is five small closed enumerations plus a confidence score.
//! Every field is always a valid member; the only way to build one from
//! untrusted oracle output is the engine's normalizer, which starts from a
//! [`RawDecision`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed enumeration with a fixed ordinal order
///
/// Ordinals run from the most conservative member (0) to the most aggressive,
/// which is what lets two decisions be averaged field by field.
pub trait OrdinalField: Copy + PartialEq + Sized + 'static {
    /// Every member in ordinal order
    const ALL: &'static [Self];

    /// Member substituted when a raw value is missing or unrecognized
    const DEFAULT: Self;

    /// Wire name of this member
    fn name(self) -> &'static str;

    /// Position in [`OrdinalField::ALL`]
    fn ordinal(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    /// Member at `ordinal`, clamped into range
    fn from_ordinal(ordinal: usize) -> Self {
        Self::ALL[ordinal.min(Self::ALL.len() - 1)]
    }

    /// Parse a wire name (case-insensitive, surrounding whitespace ignored)
    fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
    }
}

macro_rules! ordinal_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, [$($variant:ident => $wire:literal),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl OrdinalField for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];
            const DEFAULT: Self = $name::$default;

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                <$name as OrdinalField>::DEFAULT
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

ordinal_enum!(
    /// How exposed the kick/low end is to processing damage
    KickSafety, default = Borderline, [Safe => "safe", Borderline => "borderline", Danger => "danger"]
);

ordinal_enum!(
    /// How much harmonic saturation the material wants
    SaturationNeed, default = Light, [None => "none", Light => "light", Moderate => "moderate", Heavy => "heavy"]
);

ordinal_enum!(
    /// Treatment of transient attacks
    TransientHandling, default = Soften, [Soften => "soften", Preserve => "preserve", Enhance => "enhance"]
);

ordinal_enum!(
    /// Treatment of the top end
    HighFreqTreatment, default = Polish, [Leave => "leave", Polish => "polish", Lift => "lift"]
);

ordinal_enum!(
    /// Desired stereo image
    StereoIntent, default = Balanced, [Narrow => "narrow", Balanced => "balanced", Wide => "wide"]
);

/// Confidence used when the oracle did not supply a usable number
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Fully valid categorical mastering intent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub kick_safety: KickSafety,
    pub saturation_need: SaturationNeed,
    pub transient_handling: TransientHandling,
    pub high_freq_treatment: HighFreqTreatment,
    pub stereo_intent: StereoIntent,
    /// Oracle confidence (0..1)
    pub confidence: f64,
}

impl Default for Decision {
    fn default() -> Self {
        Self {
            kick_safety: KickSafety::DEFAULT,
            saturation_need: SaturationNeed::DEFAULT,
            transient_handling: TransientHandling::DEFAULT,
            high_freq_treatment: HighFreqTreatment::DEFAULT,
            stereo_intent: StereoIntent::DEFAULT,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Oracle output as deserialized, before repair
///
/// Every field holds whatever JSON the oracle sent. Accepts camelCase and
/// snake_case keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDecision {
    #[serde(default, alias = "kick_safety")]
    pub kick_safety: Option<Value>,
    #[serde(default, alias = "saturation_need")]
    pub saturation_need: Option<Value>,
    #[serde(default, alias = "transient_handling")]
    pub transient_handling: Option<Value>,
    #[serde(default, alias = "high_freq_treatment")]
    pub high_freq_treatment: Option<Value>,
    #[serde(default, alias = "stereo_intent")]
    pub stereo_intent: Option<Value>,
    #[serde(default)]
    pub confidence: Option<Value>,
}

impl RawDecision {
    /// Build from any JSON value; anything that is not an object yields an empty record
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            serde_json::from_value(value).unwrap_or_default()
        } else {
            Self::default()
        }
    }
}

impl From<&Decision> for RawDecision {
    fn from(decision: &Decision) -> Self {
        Self {
            kick_safety: Some(Value::from(decision.kick_safety.name())),
            saturation_need: Some(Value::from(decision.saturation_need.name())),
            transient_handling: Some(Value::from(decision.transient_handling.name())),
            high_freq_treatment: Some(Value::from(decision.high_freq_treatment.name())),
            stereo_intent: Some(Value::from(decision.stereo_intent.name())),
            confidence: Some(Value::from(decision.confidence)),
        }
    }
}
