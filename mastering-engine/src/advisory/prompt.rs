//! Oracle prompt text

use std::fmt::Write;

use mastering_common::{
    AnalysisSnapshot, Band, Decision, HighFreqTreatment, KickSafety, OrdinalField, SaturationNeed, Specifics,
    StereoIntent, TransientHandling,
};

/// First question to the primary oracle
pub fn initial_prompt(snapshot: &AnalysisSnapshot, specifics: &Specifics) -> String {
    let mut prompt = preamble(snapshot, specifics);
    prompt.push_str("Choose the mastering intent for this track.\n\n");
    prompt.push_str(&schema());
    prompt
}

/// Second opinion on the primary's decision
pub fn review_prompt(snapshot: &AnalysisSnapshot, specifics: &Specifics, initial: &Decision) -> String {
    let mut prompt = preamble(snapshot, specifics);
    prompt.push_str("Another engineer proposed this mastering intent:\n");
    prompt.push_str(&decision_json(initial));
    prompt.push_str(
        "\n\nReview it against the measurements. Keep fields you agree with, change the ones you \
         do not, and set confidence to how sure you are of your version.\n\n",
    );
    prompt.push_str(&schema());
    prompt
}

/// Final round: the primary sees both versions
pub fn consensus_prompt(
    snapshot: &AnalysisSnapshot,
    specifics: &Specifics,
    initial: &Decision,
    review: &Decision,
) -> String {
    let mut prompt = preamble(snapshot, specifics);
    prompt.push_str("Your earlier proposal:\n");
    prompt.push_str(&decision_json(initial));
    prompt.push_str("\n\nA reviewer's version:\n");
    prompt.push_str(&decision_json(review));
    prompt.push_str("\n\nSettle on one final mastering intent.\n\n");
    prompt.push_str(&schema());
    prompt
}

fn preamble(snapshot: &AnalysisSnapshot, specifics: &Specifics) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "You are a mastering engineer preparing a track for {}.", specifics.label);
    let _ = writeln!(text, "{}", specifics.context_text);
    let _ = writeln!(
        text,
        "Target: {:.1} LUFS integrated, true peak at or below {:.1} dBTP.\n",
        specifics.target_loudness, specifics.target_peak
    );

    let _ = writeln!(text, "Measurements:");
    let _ = writeln!(text, "- integrated loudness: {:.1} LUFS", snapshot.loudness);
    let _ = writeln!(text, "- true peak: {:.1} dBTP", snapshot.true_peak);
    let _ = writeln!(text, "- crest factor: {:.1} dB", snapshot.crest_factor);
    let _ = writeln!(text, "- dynamic range: {:.1} dB", snapshot.dynamic_range_db());
    let _ = writeln!(text, "- stereo width: {:.0}/100", snapshot.stereo_width);
    let _ = writeln!(text, "- phase correlation: {:.2}", snapshot.phase_correlation);
    let _ = writeln!(text, "- distortion: {:.2} %", snapshot.distortion_percent);
    let _ = writeln!(text, "- noise floor: {:.1} dB", snapshot.noise_floor_db);

    for (band, level) in &snapshot.bands {
        let _ = writeln!(text, "- {} band: {:.1} dB", band_label(*band), level);
    }

    let diagnostics = [
        ("low-end crest", snapshot.low_end_crest_db, "dB"),
        ("sub energy ratio", snapshot.sub_energy_ratio, ""),
        ("low-end to low-mid ratio", snapshot.low_end_to_low_mid_ratio, ""),
        ("bass mono compatibility", snapshot.bass_mono_compatibility, "/100"),
        ("transient density", snapshot.transient_density, ""),
        ("low-end distortion risk", snapshot.distortion_risk_score, "/6"),
    ];
    for (label, value, unit) in diagnostics {
        if let Some(value) = value {
            let _ = writeln!(text, "- {label}: {value:.2}{unit}");
        }
    }

    text.push('\n');
    text
}

fn band_label(band: Band) -> &'static str {
    match band {
        Band::Sub => "sub",
        Band::Bass => "bass",
        Band::LowMid => "low-mid",
        Band::Mid => "mid",
        Band::HighMid => "high-mid",
        Band::Presence => "presence",
        Band::Air => "air",
    }
}

fn choices<T: OrdinalField>() -> String {
    T::ALL.iter().map(|v| format!("\"{}\"", v.name())).collect::<Vec<_>>().join(" | ")
}

fn schema() -> String {
    format!(
        "Reply with exactly one JSON object and nothing else:\n\
         {{\n  \"kickSafety\": {},\n  \"saturationNeed\": {},\n  \"transientHandling\": {},\n  \
         \"highFreqTreatment\": {},\n  \"stereoIntent\": {},\n  \"confidence\": <number 0..1>\n}}\n",
        choices::<KickSafety>(),
        choices::<SaturationNeed>(),
        choices::<TransientHandling>(),
        choices::<HighFreqTreatment>(),
        choices::<StereoIntent>(),
    )
}

fn decision_json(decision: &Decision) -> String {
    serde_json::to_string_pretty(decision).unwrap_or_default()
}
