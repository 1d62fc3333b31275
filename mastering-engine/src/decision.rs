//! Decision normalizer and reconciler
//!
//! [`normalize`] is the single trust boundary between oracle output and the
//! rest of the engine: whatever the oracle returned, the result is a fully
//! valid [`Decision`]. [`reconcile`] merges two decisions by
//! confidence-weighted ordinal averaging.

use mastering_common::decision::DEFAULT_CONFIDENCE;
use mastering_common::{Decision, OrdinalField, RawDecision};
use serde_json::Value;

/// Weight substituted for a non-positive confidence during reconciliation
const MIN_WEIGHT: f64 = 1e-3;

/// Repair a raw oracle record into a valid Decision
///
/// Unrecognized or missing enum values fall back to each field's default;
/// confidence is clamped to [0, 1] and defaults to 0.5 when not numeric.
/// Never fails.
pub fn normalize(raw: &RawDecision) -> Decision {
    let decision = Decision {
        kick_safety: repair_field(&raw.kick_safety, "kickSafety"),
        saturation_need: repair_field(&raw.saturation_need, "saturationNeed"),
        transient_handling: repair_field(&raw.transient_handling, "transientHandling"),
        high_freq_treatment: repair_field(&raw.high_freq_treatment, "highFreqTreatment"),
        stereo_intent: repair_field(&raw.stereo_intent, "stereoIntent"),
        confidence: repair_confidence(&raw.confidence),
    };

    tracing::debug!(
        kick_safety = %decision.kick_safety,
        saturation_need = %decision.saturation_need,
        transient_handling = %decision.transient_handling,
        high_freq_treatment = %decision.high_freq_treatment,
        stereo_intent = %decision.stereo_intent,
        confidence = decision.confidence,
        "Normalized decision"
    );

    decision
}

fn repair_field<T: OrdinalField>(value: &Option<Value>, field: &str) -> T {
    match value.as_ref().and_then(Value::as_str).and_then(T::parse) {
        Some(member) => member,
        None => {
            tracing::debug!(field, raw = ?value, default = T::DEFAULT.name(), "Substituting default");
            T::DEFAULT
        }
    }
}

fn repair_confidence(value: &Option<Value>) -> f64 {
    value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE)
}

/// Merge two decisions field by field
///
/// Each field becomes the confidence-weighted mean of both ordinals, rounded
/// to the nearest member; an exact tie rounds toward the more confident side
/// (`a` when both are equally confident). The merged confidence is the plain
/// mean of both inputs. `reconcile(a, a) == a`.
pub fn reconcile(a: &Decision, b: &Decision) -> Decision {
    let wa = weight(a.confidence);
    let wb = weight(b.confidence);

    Decision {
        kick_safety: merge_field(a.kick_safety, b.kick_safety, wa, wb),
        saturation_need: merge_field(a.saturation_need, b.saturation_need, wa, wb),
        transient_handling: merge_field(a.transient_handling, b.transient_handling, wa, wb),
        high_freq_treatment: merge_field(a.high_freq_treatment, b.high_freq_treatment, wa, wb),
        stereo_intent: merge_field(a.stereo_intent, b.stereo_intent, wa, wb),
        confidence: (unit(a.confidence) + unit(b.confidence)) / 2.0,
    }
}

fn weight(confidence: f64) -> f64 {
    if confidence > 0.0 {
        confidence
    } else {
        MIN_WEIGHT
    }
}

fn unit(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        DEFAULT_CONFIDENCE
    }
}

fn merge_field<T: OrdinalField>(a: T, b: T, wa: f64, wb: f64) -> T {
    if a == b {
        return a;
    }

    let oa = a.ordinal() as f64;
    let ob = b.ordinal() as f64;
    let mean = (oa * wa + ob * wb) / (wa + wb);

    let floor = mean.floor();
    let rounded = if ((mean - floor) - 0.5).abs() < 1e-9 {
        let toward = if wa >= wb { oa } else { ob };
        if toward > mean {
            floor + 1.0
        } else {
            floor
        }
    } else {
        mean.round()
    };

    T::from_ordinal(rounded.max(0.0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastering_common::{
        HighFreqTreatment, KickSafety, SaturationNeed, StereoIntent, TransientHandling,
    };
    use serde_json::json;

    fn decision(saturation: SaturationNeed, stereo: StereoIntent, confidence: f64) -> Decision {
        Decision {
            saturation_need: saturation,
            stereo_intent: stereo,
            confidence,
            ..Decision::default()
        }
    }

    #[test]
    fn test_normalize_empty_record_gives_defaults() {
        let decision = normalize(&RawDecision::default());
        assert_eq!(decision.kick_safety, KickSafety::Borderline);
        assert_eq!(decision.saturation_need, SaturationNeed::Light);
        assert_eq!(decision.transient_handling, TransientHandling::Soften);
        assert_eq!(decision.high_freq_treatment, HighFreqTreatment::Polish);
        assert_eq!(decision.stereo_intent, StereoIntent::Balanced);
        assert_eq!(decision.confidence, 0.5);
    }

    #[test]
    fn test_normalize_keeps_valid_and_repairs_invalid_fields() {
        let raw = RawDecision::from_value(json!({
            "kickSafety": "danger",
            "saturationNeed": "extreme",
            "transientHandling": 7,
            "highFreqTreatment": "Lift",
            "stereoIntent": null,
            "confidence": 1.7
        }));
        let decision = normalize(&raw);
        assert_eq!(decision.kick_safety, KickSafety::Danger);
        assert_eq!(decision.saturation_need, SaturationNeed::Light);
        assert_eq!(decision.transient_handling, TransientHandling::Soften);
        assert_eq!(decision.high_freq_treatment, HighFreqTreatment::Lift);
        assert_eq!(decision.stereo_intent, StereoIntent::Balanced);
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn test_normalize_non_numeric_confidence() {
        let raw = RawDecision::from_value(json!({ "confidence": "very" }));
        assert_eq!(normalize(&raw).confidence, 0.5);

        let raw = RawDecision::from_value(json!({ "confidence": -3 }));
        assert_eq!(normalize(&raw).confidence, 0.0);
    }

    #[test]
    fn test_reconcile_identity() {
        let a = Decision {
            kick_safety: KickSafety::Danger,
            saturation_need: SaturationNeed::Heavy,
            transient_handling: TransientHandling::Enhance,
            high_freq_treatment: HighFreqTreatment::Leave,
            stereo_intent: StereoIntent::Narrow,
            confidence: 0.73,
        };
        assert_eq!(reconcile(&a, &a), a);

        let zero = Decision { confidence: 0.0, ..a };
        assert_eq!(reconcile(&zero, &zero), zero);
    }

    #[test]
    fn test_reconcile_weighted_toward_confident_side() {
        // none(0) @ 0.9 vs heavy(3) @ 0.1 → mean 0.3 → none
        let a = decision(SaturationNeed::None, StereoIntent::Narrow, 0.9);
        let b = decision(SaturationNeed::Heavy, StereoIntent::Wide, 0.1);
        let merged = reconcile(&a, &b);
        assert_eq!(merged.saturation_need, SaturationNeed::None);
        assert_eq!(merged.stereo_intent, StereoIntent::Narrow);
        assert!((merged.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reconcile_tie_breaks_toward_higher_confidence() {
        // narrow(0) vs balanced(1), equal weights → 0.5 tie → first argument wins
        let a = decision(SaturationNeed::Light, StereoIntent::Balanced, 0.6);
        let b = decision(SaturationNeed::Light, StereoIntent::Narrow, 0.6);
        assert_eq!(reconcile(&a, &b).stereo_intent, StereoIntent::Balanced);
        assert_eq!(reconcile(&b, &a).stereo_intent, StereoIntent::Narrow);

        // light(1) @ 0.5 vs heavy(3) @ 0.5 → exactly moderate, no tie
        let a = decision(SaturationNeed::Light, StereoIntent::Balanced, 0.5);
        let b = decision(SaturationNeed::Heavy, StereoIntent::Balanced, 0.5);
        assert_eq!(reconcile(&a, &b).saturation_need, SaturationNeed::Moderate);
    }

    #[test]
    fn test_reconcile_zero_confidence_uses_floor_weight() {
        let a = decision(SaturationNeed::None, StereoIntent::Narrow, 0.0);
        let b = decision(SaturationNeed::Heavy, StereoIntent::Wide, 0.0);
        let merged = reconcile(&a, &b);
        // Both at the floor weight: mean 1.5 ties toward a → light
        assert_eq!(merged.saturation_need, SaturationNeed::Light);
        assert_eq!(merged.confidence, 0.0);
    }
}
