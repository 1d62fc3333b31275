//! Derivation properties: boundedness, idempotence, risk suppression, scenarios

mod helpers;

use helpers::{all_decisions, clean_snapshot, collision_snapshot, scenario_a_snapshot};
use mastering_common::{
    AnalysisSnapshot, Band, Decision, DistributionTarget, HighFreqTreatment, OrdinalField, RawDecision,
    SaturationNeed, StereoIntent,
};
use mastering_engine::clamp::{SafetyClamp, EXCITER_MAX, GAIN_MAX_DB, GAIN_MIN_DB, TUBE_DRIVE_MAX, WIDTH_MAX, WIDTH_MIN};
use mastering_engine::{normalize, plan_params, reconcile, resolve_specifics, static_gain};
use serde_json::json;

const TARGETS: [DistributionTarget; 2] = [DistributionTarget::Streaming, DistributionTarget::Club];

fn extreme_snapshot() -> AnalysisSnapshot {
    AnalysisSnapshot {
        loudness: -48.0,
        true_peak: 2.5,
        crest_factor: 0.0,
        dynamic_range: Some(40.0),
        stereo_width: 100.0,
        phase_correlation: -1.0,
        distortion_percent: 12.0,
        noise_floor_db: -20.0,
        sub_energy_ratio: Some(0.9),
        distortion_risk_score: Some(9.0),
        ..AnalysisSnapshot::default()
    }
    .with_band(Band::Sub, 0.0)
    .with_band(Band::Bass, 0.0)
    .with_band(Band::LowMid, -60.0)
    .with_band(Band::Mid, -30.0)
    .with_band(Band::HighMid, 0.0)
    .with_band(Band::Presence, -70.0)
    .with_band(Band::Air, -90.0)
}

fn snapshots() -> Vec<AnalysisSnapshot> {
    vec![
        scenario_a_snapshot(),
        clean_snapshot(),
        collision_snapshot(),
        AnalysisSnapshot::default(),
        extreme_snapshot(),
    ]
}

#[test]
fn test_derived_params_always_bounded() {
    for snapshot in snapshots() {
        for target in TARGETS {
            let specifics = resolve_specifics(target);
            for decision in all_decisions() {
                let (_, params) = plan_params(&decision, &snapshot, &specifics);
                assert!((GAIN_MIN_DB..=GAIN_MAX_DB).contains(&params.gain_db));
                assert!((0.0..=TUBE_DRIVE_MAX).contains(&params.tube_drive_amount));
                assert!((0.0..=EXCITER_MAX).contains(&params.exciter_amount));
                assert!((WIDTH_MIN..=WIDTH_MAX).contains(&params.width_amount));
                assert!(params.low_mono_hz <= 320.0);
            }
        }
    }
}

#[test]
fn test_clamp_idempotent_on_derived_params() {
    for snapshot in snapshots() {
        let clamp = SafetyClamp::for_snapshot(&snapshot);
        let specifics = resolve_specifics(DistributionTarget::Club);
        for decision in all_decisions() {
            let (_, once) = plan_params(&decision, &snapshot, &specifics);
            assert_eq!(clamp.apply(&once), once);
        }
    }
}

#[test]
fn test_eq_order_survives_clamp() {
    let snapshot = scenario_a_snapshot()
        .with_band(Band::LowMid, -12.0)
        .with_band(Band::Air, -34.0);
    let specifics = resolve_specifics(DistributionTarget::Streaming);
    let decision = Decision::default();

    let derivation = mastering_engine::derive(&decision, &snapshot, &specifics);
    let (_, clamped) = plan_params(&decision, &snapshot, &specifics);

    let before: Vec<f64> = derivation.params.eq_adjustments.iter().map(|e| e.frequency_hz).collect();
    let after: Vec<f64> = clamped.eq_adjustments.iter().map(|e| e.frequency_hz).collect();
    assert!(!before.is_empty());
    assert_eq!(before, after);
}

#[test]
fn test_monotonic_risk_suppression() {
    let baseline = clean_snapshot();
    let worse = [
        AnalysisSnapshot {
            true_peak: -0.5,
            ..baseline.clone()
        },
        AnalysisSnapshot {
            true_peak: -0.5,
            crest_factor: 8.0,
            ..baseline.clone()
        },
        AnalysisSnapshot {
            true_peak: -0.3,
            crest_factor: 7.0,
            phase_correlation: 0.1,
            ..baseline.clone()
        },
    ];

    for target in TARGETS {
        let specifics = resolve_specifics(target);
        for decision in all_decisions() {
            let (_, base) = plan_params(&decision, &baseline, &specifics);
            for snapshot in &worse {
                let (_, risky) = plan_params(&decision, snapshot, &specifics);
                assert!(risky.tube_drive_amount <= base.tube_drive_amount + 1e-12);
                assert!(risky.low_contour_amount <= base.low_contour_amount + 1e-12);
                assert!(risky.width_amount <= base.width_amount + 1e-12);
            }
        }
    }
}

#[test]
fn test_risk_suppression_past_zero_phase_and_full_scale() {
    // Each step is worse than the last: true peak climbs through 0 dBTP,
    // phase falls through 0, crest keeps dropping
    let steps: Vec<AnalysisSnapshot> = (0..8)
        .map(|i| AnalysisSnapshot {
            true_peak: -8.0 + 1.5 * i as f64,
            crest_factor: 14.0 - i as f64,
            dynamic_range: Some(12.0),
            phase_correlation: 0.3 - 0.2 * i as f64,
            ..clean_snapshot()
        })
        .collect();

    for target in TARGETS {
        let specifics = resolve_specifics(target);
        for decision in all_decisions() {
            let derived: Vec<_> = steps
                .iter()
                .map(|snapshot| plan_params(&decision, snapshot, &specifics).1)
                .collect();
            for pair in derived.windows(2) {
                assert!(pair[1].tube_drive_amount <= pair[0].tube_drive_amount + 1e-12);
                assert!(pair[1].low_contour_amount <= pair[0].low_contour_amount + 1e-12);
                assert!(pair[1].width_amount <= pair[0].width_amount + 1e-12);
            }
        }
    }
}

#[test]
fn test_scenario_a_gain_hits_ceiling() {
    let specifics = resolve_specifics(DistributionTarget::Club);
    let gain = static_gain(&scenario_a_snapshot(), &specifics);
    assert!((gain.raw_db - 7.5).abs() < 1e-9);
    assert_eq!(gain.bounded_db, 3.0);

    let (_, params) = plan_params(&Decision::default(), &scenario_a_snapshot(), &specifics);
    assert_eq!(params.gain_db, 3.0);
}

#[test]
fn test_scenario_b_intent_orders_amounts() {
    let conservative = Decision {
        saturation_need: SaturationNeed::None,
        high_freq_treatment: HighFreqTreatment::Leave,
        stereo_intent: StereoIntent::Narrow,
        ..Decision::default()
    };
    let aggressive = Decision {
        saturation_need: SaturationNeed::Heavy,
        high_freq_treatment: HighFreqTreatment::Lift,
        stereo_intent: StereoIntent::Wide,
        ..Decision::default()
    };

    for snapshot in [scenario_a_snapshot(), clean_snapshot()] {
        for target in TARGETS {
            let specifics = resolve_specifics(target);
            let (_, low) = plan_params(&conservative, &snapshot, &specifics);
            let (_, high) = plan_params(&aggressive, &snapshot, &specifics);

            assert_eq!(low.target_loudness, high.target_loudness);
            assert_eq!(low.limiter_ceiling_db, high.limiter_ceiling_db);
            assert!(low.tube_drive_amount < high.tube_drive_amount);
            assert!(low.exciter_amount < high.exciter_amount);
            assert!(low.width_amount < high.width_amount);
        }
    }
}

#[test]
fn test_scenario_c_collision_overrides_intent() {
    let snapshot = collision_snapshot();
    for target in TARGETS {
        let specifics = resolve_specifics(target);
        for decision in all_decisions() {
            let (derivation, params) = plan_params(&decision, &snapshot, &specifics);
            assert!(derivation.collision);
            assert!(params.width_amount <= 1.05, "width {}", params.width_amount);
            assert!(params.low_contour_amount < 0.25, "contour {}", params.low_contour_amount);
            assert!(params.low_mono_hz >= 220.0, "low mono {}", params.low_mono_hz);
        }
    }
}

#[test]
fn test_policy_never_from_decision() {
    let snapshot = clean_snapshot();
    for target in TARGETS {
        let specifics = resolve_specifics(target);
        for decision in all_decisions() {
            let derivation = mastering_engine::derive(&decision, &snapshot, &specifics);
            assert_eq!(derivation.params.target_loudness, specifics.target_loudness);
            assert_eq!(derivation.params.limiter_ceiling_db, specifics.target_peak);
        }
    }
}

#[test]
fn test_normalizer_is_total() {
    let inputs = [
        json!(null),
        json!(42),
        json!("heavy"),
        json!([1, 2, 3]),
        json!({}),
        json!({"kickSafety": 3, "saturationNeed": null, "confidence": "high"}),
        json!({"kick_safety": "DANGER", "stereo_intent": " wide ", "confidence": 7}),
        json!({"transientHandling": {"nested": true}, "confidence": -2.0}),
    ];

    for input in inputs {
        let decision = normalize(&RawDecision::from_value(input));
        assert!((0.0..=1.0).contains(&decision.confidence));
    }

    let repaired = normalize(&RawDecision::from_value(
        json!({"kick_safety": "DANGER", "stereo_intent": " wide ", "confidence": 7}),
    ));
    assert_eq!(repaired.kick_safety.name(), "danger");
    assert_eq!(repaired.stereo_intent, StereoIntent::Wide);
    assert_eq!(repaired.confidence, 1.0);
}

#[test]
fn test_reconcile_identity_for_every_decision() {
    for decision in all_decisions() {
        assert_eq!(reconcile(&decision, &decision), decision);
    }
}
