//! Specifics resolver: distribution target → fixed platform policy

use mastering_common::{DistributionTarget, Specifics};

/// Resolve the loudness/peak policy for a distribution target
///
/// Total over the closed target enum; there is no failure path.
pub fn resolve_specifics(target: DistributionTarget) -> Specifics {
    match target {
        DistributionTarget::Streaming => Specifics {
            target_loudness: -14.0,
            target_peak: -1.0,
            label: "Streaming".to_string(),
            context_text: "Streaming platforms normalize playback to about -14 LUFS. \
                Preserve dynamics and transient detail; keep true peak at or below -1 dBTP \
                so lossy encoding does not clip."
                .to_string(),
        },
        DistributionTarget::Club => Specifics {
            target_loudness: -8.0,
            target_peak: -0.8,
            label: "Club".to_string(),
            context_text: "Club and PA systems: loud, dense master around -8 LUFS. \
                Low end must stay mono-safe and punchy on large subwoofers; \
                avoid wide or out-of-phase bass."
                .to_string(),
        },
    }
}
