//! In-process offline renderer
//!
//! Chain order: gain, EQ cascade, tube drive, low contour, exciter, stereo
//! width with low mono, peak limiter at the ceiling.

use std::sync::Arc;

use async_trait::async_trait;
use mastering_common::{EqAdjustment, EqType, Params};

use super::{RenderBoundary, RenderError, RenderedBuffer, SourceAudio, TrialRender};
use crate::dsp::{db_to_linear, Biquad, BiquadCoeffs};

const DEFAULT_CROSSOVER_HZ: f64 = 120.0;
const DEFAULT_LIMITER_RELEASE_S: f64 = 0.1;
const EXCITER_CORNER_HZ: f64 = 3_000.0;
const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Renders trial masters on the blocking pool
#[derive(Debug, Clone, Default)]
pub struct OfflineRenderer;

impl OfflineRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Run the chain synchronously
    pub fn process(params: &Params, source: &SourceAudio) -> RenderedBuffer {
        let fs = source.sample_rate() as f64;
        let mut left: Vec<f64> = source.left().iter().map(|&s| s as f64).collect();
        let mut right: Vec<f64> = source.right().iter().map(|&s| s as f64).collect();

        let gain = db_to_linear(params.gain_db);
        for s in left.iter_mut().chain(right.iter_mut()) {
            *s *= gain;
        }

        apply_eq(&mut left, &params.eq_adjustments, fs);
        apply_eq(&mut right, &params.eq_adjustments, fs);

        if params.tube_drive_amount > 0.0 {
            apply_tube(&mut left, params.tube_drive_amount);
            apply_tube(&mut right, params.tube_drive_amount);
        }

        let crossover = params
            .timing
            .as_ref()
            .map(|t| t.crossover_hz)
            .unwrap_or(DEFAULT_CROSSOVER_HZ);
        if params.low_contour_amount > 0.0 {
            apply_low_contour(&mut left, params.low_contour_amount, crossover, fs);
            apply_low_contour(&mut right, params.low_contour_amount, crossover, fs);
        }

        if params.exciter_amount > 0.0 {
            apply_exciter(&mut left, params.exciter_amount, fs);
            apply_exciter(&mut right, params.exciter_amount, fs);
        }

        apply_width(&mut left, &mut right, params.width_amount, params.low_mono_hz, fs);

        let release_s = params
            .timing
            .as_ref()
            .map(|t| t.limiter_release_s)
            .unwrap_or(DEFAULT_LIMITER_RELEASE_S);
        apply_limiter(&mut left, &mut right, params.limiter_ceiling_db, release_s, fs);

        RenderedBuffer::new(
            source.sample_rate(),
            left.into_iter().map(|s| s as f32).collect(),
            right.into_iter().map(|s| s as f32).collect(),
        )
    }
}

#[async_trait]
impl RenderBoundary for OfflineRenderer {
    async fn render(&self, params: &Params, source: Arc<SourceAudio>) -> Result<Arc<dyn TrialRender>, RenderError> {
        if source.is_empty() {
            return Err(RenderError::EmptyBuffer);
        }

        tracing::debug!(
            gain_db = params.gain_db,
            ceiling_db = params.limiter_ceiling_db,
            frames = source.len(),
            "Rendering trial master"
        );

        let params = params.clone();
        let rendered = tokio::task::spawn_blocking(move || Self::process(&params, &source))
            .await
            .map_err(|e| RenderError::Join(e.to_string()))?;

        Ok(Arc::new(rendered))
    }
}

fn apply_eq(samples: &mut [f64], adjustments: &[EqAdjustment], fs: f64) {
    if adjustments.is_empty() {
        return;
    }

    let nyquist_guard = fs * 0.45;
    let mut filters: Vec<Biquad> = adjustments
        .iter()
        .map(|adj| {
            let frequency = adj.frequency_hz.clamp(20.0, nyquist_guard);
            let coeffs = match adj.eq_type {
                EqType::Lowshelf => BiquadCoeffs::low_shelf(frequency, adj.q, adj.gain_db, fs),
                EqType::Highshelf => BiquadCoeffs::high_shelf(frequency, adj.q, adj.gain_db, fs),
                EqType::Peak => BiquadCoeffs::peaking(frequency, adj.q, adj.gain_db, fs),
            };
            Biquad::new(coeffs)
        })
        .collect();

    for s in samples.iter_mut() {
        *s = filters.iter_mut().fold(*s, |x, f| f.process(x));
    }
}

/// Unity small-signal gain, rounding peaks as drive rises
fn apply_tube(samples: &mut [f64], drive: f64) {
    let k = 1.0 + drive;
    for s in samples.iter_mut() {
        *s = (k * *s).tanh() / k;
    }
}

/// Lift and soften the band below the crossover
fn apply_low_contour(samples: &mut [f64], amount: f64, crossover_hz: f64, fs: f64) {
    let mut low_pass = Biquad::new(BiquadCoeffs::low_pass(crossover_hz.clamp(20.0, fs * 0.45), BUTTERWORTH_Q, fs));
    let lift = 0.25 * amount;
    for s in samples.iter_mut() {
        let low = low_pass.process(*s);
        *s += lift * (2.0 * low).tanh() / 2.0;
    }
}

/// Add harmonics generated from the top end
fn apply_exciter(samples: &mut [f64], amount: f64, fs: f64) {
    let mut high_pass = Biquad::new(BiquadCoeffs::high_pass(EXCITER_CORNER_HZ.min(fs * 0.45), BUTTERWORTH_Q, fs));
    for s in samples.iter_mut() {
        let high = high_pass.process(*s);
        *s += amount * (4.0 * high).tanh();
    }
}

/// Scale the side channel, keeping everything below `low_mono_hz` mono
fn apply_width(left: &mut [f64], right: &mut [f64], width: f64, low_mono_hz: f64, fs: f64) {
    let mut side_low = Biquad::new(BiquadCoeffs::low_pass(low_mono_hz.clamp(20.0, fs * 0.45), BUTTERWORTH_Q, fs));

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let mid = (*l + *r) * 0.5;
        let side = (*l - *r) * 0.5;
        let side = (side - side_low.process(side)) * width;
        *l = mid + side;
        *r = mid - side;
    }
}

/// Instant-attack peak limiter with exponential release, then a hard ceiling
fn apply_limiter(left: &mut [f64], right: &mut [f64], ceiling_db: f64, release_s: f64, fs: f64) {
    let ceiling = db_to_linear(ceiling_db);
    let release = (-1.0 / (release_s.max(1e-3) * fs)).exp();
    let mut envelope = 1.0_f64;

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let peak = l.abs().max(r.abs());
        let target = if peak > ceiling { ceiling / peak } else { 1.0 };

        envelope = if target < envelope {
            target
        } else {
            target + (envelope - target) * release
        };

        *l = (*l * envelope).clamp(-ceiling, ceiling);
        *r = (*r * envelope).clamp(-ceiling, ceiling);
    }
}
