//! BS.1770 loudness and true-peak measurement
//!
//! Channel energies are K-weighted, cut into 400 ms blocks with 75 % overlap,
//! then gated at -70 LUFS absolute and -10 LU relative. True peak uses 4x
//! Catmull-Rom interpolation between samples.

use crate::dsp::{linear_to_db, Biquad, BiquadCoeffs};

const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_LU: f64 = -10.0;
const LUFS_OFFSET: f64 = -0.691;

/// Reported loudness for silent or fully gated audio
pub const SILENCE_LUFS: f64 = -70.0;
/// Reported true peak for digital silence
pub const SILENCE_PEAK_DB: f64 = -144.0;

/// Loudness and true peak of one stretch of audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Integrated loudness (LUFS)
    pub loudness: f64,
    /// True peak (dBTP)
    pub true_peak_db: f64,
}

/// Measure a multichannel segment
pub fn measure(channels: &[&[f32]], sample_rate: u32) -> Measurement {
    Measurement {
        loudness: integrated_loudness(channels, sample_rate).unwrap_or(SILENCE_LUFS),
        true_peak_db: true_peak_db(channels),
    }
}

/// Integrated loudness, or `None` for empty or silent input
///
/// Segments shorter than one block are measured as a single block.
pub fn integrated_loudness(channels: &[&[f32]], sample_rate: u32) -> Option<f64> {
    let len = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    if len == 0 || sample_rate == 0 {
        return None;
    }

    let block = ((sample_rate as f64 * 0.4).round() as usize).clamp(1, len);
    let hop = (block / 4).max(1);

    // Per-block energy summed across channels
    let weighted: Vec<Vec<f64>> = channels
        .iter()
        .map(|c| k_weight(&c[..len], sample_rate))
        .collect();

    let mut blocks = Vec::new();
    let mut start = 0;
    while start + block <= len {
        let energy: f64 = weighted
            .iter()
            .map(|c| mean_square(&c[start..start + block]))
            .sum();
        blocks.push(energy);
        start += hop;
    }

    let absolute = lufs_to_energy(ABSOLUTE_GATE_LUFS);
    let gated: Vec<f64> = blocks.into_iter().filter(|&e| e > absolute).collect();
    if gated.is_empty() {
        return None;
    }

    let relative = lufs_to_energy(energy_to_lufs(mean(&gated)) + RELATIVE_GATE_LU);
    let kept: Vec<f64> = gated.into_iter().filter(|&e| e >= relative).collect();
    if kept.is_empty() {
        return None;
    }

    Some(energy_to_lufs(mean(&kept))).filter(|l| l.is_finite())
}

/// True peak across all channels (dBTP)
pub fn true_peak_db(channels: &[&[f32]]) -> f64 {
    let peak = channels
        .iter()
        .map(|c| channel_true_peak(c))
        .fold(0.0_f64, f64::max);

    if peak > 0.0 {
        linear_to_db(peak)
    } else {
        SILENCE_PEAK_DB
    }
}

fn channel_true_peak(samples: &[f32]) -> f64 {
    let mut peak = samples
        .iter()
        .map(|s| (*s as f64).abs())
        .fold(0.0_f64, f64::max);

    for i in 1..samples.len().saturating_sub(2) {
        let p0 = samples[i - 1] as f64;
        let p1 = samples[i] as f64;
        let p2 = samples[i + 1] as f64;
        let p3 = samples[i + 2] as f64;

        for step in 1..4 {
            let t = step as f64 * 0.25;
            let t2 = t * t;
            let t3 = t2 * t;
            let v = 0.5
                * ((2.0 * p1)
                    + (-p0 + p2) * t
                    + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
                    + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3);
            peak = peak.max(v.abs());
        }
    }
    peak
}

fn k_weight(samples: &[f32], sample_rate: u32) -> Vec<f64> {
    let fs = sample_rate as f64;
    let mut shelf = Biquad::new(BiquadCoeffs::k_weighting_shelf(fs));
    let mut high_pass = Biquad::new(BiquadCoeffs::k_weighting_high_pass(fs));

    samples
        .iter()
        .map(|&s| high_pass.process(shelf.process(s as f64)))
        .collect()
}

fn mean_square(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn energy_to_lufs(energy: f64) -> f64 {
    if energy <= 0.0 {
        return f64::NEG_INFINITY;
    }
    LUFS_OFFSET + 10.0 * energy.log10()
}

fn lufs_to_energy(lufs: f64) -> f64 {
    10.0_f64.powf((lufs - LUFS_OFFSET) / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f64, amplitude: f64, seconds: f64, sample_rate: u32) -> Vec<f32> {
        let n = (seconds * sample_rate as f64) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                ((2.0 * std::f64::consts::PI * frequency * t).sin() * amplitude) as f32
            })
            .collect()
    }

    #[test]
    fn test_silence_is_gated() {
        let silent = vec![0.0f32; 48_000];
        assert!(integrated_loudness(&[&silent, &silent], 48_000).is_none());
        let m = measure(&[&silent, &silent], 48_000);
        assert_eq!(m.loudness, SILENCE_LUFS);
        assert_eq!(m.true_peak_db, SILENCE_PEAK_DB);
    }

    #[test]
    fn test_empty_input() {
        assert!(integrated_loudness(&[], 48_000).is_none());
        assert!(integrated_loudness(&[&[]], 48_000).is_none());
    }

    #[test]
    fn test_stereo_sine_loudness() {
        // 997 Hz at -6 dBFS in both channels sits close to -6 LUFS
        let tone = sine(997.0, 0.5, 2.0, 48_000);
        let lufs = integrated_loudness(&[&tone, &tone], 48_000).unwrap();
        assert!((lufs + 6.0).abs() < 0.5, "got {lufs}");
    }

    #[test]
    fn test_gain_shifts_loudness_one_to_one() {
        let loud = sine(440.0, 0.5, 2.0, 44_100);
        let quiet = sine(440.0, 0.25, 2.0, 44_100);
        let a = integrated_loudness(&[&loud, &loud], 44_100).unwrap();
        let b = integrated_loudness(&[&quiet, &quiet], 44_100).unwrap();
        assert!((a - b - 6.02).abs() < 0.05);
    }

    #[test]
    fn test_short_segment_measured_as_one_block() {
        let tone = sine(1000.0, 0.5, 0.1, 48_000);
        assert!(integrated_loudness(&[&tone, &tone], 48_000).is_some());
    }

    #[test]
    fn test_true_peak_of_sine() {
        let tone = sine(1000.0, 0.5, 0.5, 48_000);
        let peak = true_peak_db(&[&tone]);
        assert!((peak + 6.02).abs() < 0.2, "got {peak}");
    }

    #[test]
    fn test_true_peak_sees_between_samples() {
        // Quarter-rate tone sampled off its crests
        let samples: Vec<f32> = (0..64)
            .map(|i| ((i as f64 * std::f64::consts::FRAC_PI_2) + std::f64::consts::FRAC_PI_4).sin() as f32)
            .collect();
        let sample_peak = linear_to_db(samples.iter().map(|s| s.abs() as f64).fold(0.0, f64::max));
        assert!(true_peak_db(&[&samples]) > sample_peak);
    }
}
