//! Render boundary
//!
//! The correction loop only sees rendering through [`RenderBoundary`]: hand it
//! parameters plus source audio, get back something it can measure by window.
//! [`OfflineRenderer`] is the in-process implementation; tests substitute
//! deterministic stubs.

mod offline;

use std::sync::Arc;

use async_trait::async_trait;
use mastering_common::Params;
use thiserror::Error;

use crate::measure::{self, Measurement};

pub use offline::OfflineRenderer;

/// Lowest sample rate a source may carry (Hz)
///
/// Every filter corner in the render chain must sit below Nyquist.
pub const MIN_SAMPLE_RATE_HZ: u32 = 1_000;

/// Render errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Renderer cannot be reached or is not set up
    #[error("Renderer unavailable: {0}")]
    Unavailable(String),

    /// Render ran but failed
    #[error("Render failed: {0}")]
    Failed(String),

    #[error("Unsupported sample rate: {0} Hz (minimum 1000 Hz)")]
    UnsupportedSampleRate(u32),

    /// Source or rendered buffer holds no samples
    #[error("Empty audio buffer")]
    EmptyBuffer,

    /// Background render task died
    #[error("Render task join error: {0}")]
    Join(String),
}

/// Decoded stereo source material
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAudio {
    sample_rate: u32,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl SourceAudio {
    /// Stereo source; channels must have equal length
    pub fn stereo(sample_rate: u32, left: Vec<f32>, right: Vec<f32>) -> Result<Self, RenderError> {
        if left.len() != right.len() {
            return Err(RenderError::Failed(format!(
                "Channel length mismatch: {} vs {}",
                left.len(),
                right.len()
            )));
        }
        if left.is_empty() {
            return Err(RenderError::EmptyBuffer);
        }
        if sample_rate < MIN_SAMPLE_RATE_HZ {
            return Err(RenderError::UnsupportedSampleRate(sample_rate));
        }
        Ok(Self {
            sample_rate,
            left,
            right,
        })
    }

    /// Mono source duplicated to both channels
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self, RenderError> {
        Self::stereo(sample_rate, samples.clone(), samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn duration_s(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }
}

/// A finished trial render that can be measured by window
pub trait TrialRender: Send + Sync {
    /// Frames per channel
    fn len(&self) -> usize;

    fn sample_rate(&self) -> u32;

    /// Measure `len` frames starting at `start`, clipped to the buffer
    fn measure(&self, start: usize, len: usize) -> Measurement;

    /// Measure the whole render
    fn measure_all(&self) -> Measurement {
        self.measure(0, self.len())
    }
}

/// Produces trial renders from parameters
#[async_trait]
pub trait RenderBoundary: Send + Sync {
    async fn render(&self, params: &Params, source: Arc<SourceAudio>) -> Result<Arc<dyn TrialRender>, RenderError>;
}

/// Rendered stereo samples
#[derive(Debug, Clone)]
pub struct RenderedBuffer {
    sample_rate: u32,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl RenderedBuffer {
    pub fn new(sample_rate: u32, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self {
            sample_rate,
            left,
            right,
        }
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }
}

impl TrialRender for RenderedBuffer {
    fn len(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn measure(&self, start: usize, len: usize) -> Measurement {
        let total = TrialRender::len(self);
        let start = start.min(total);
        let end = start.saturating_add(len).min(total);
        measure::measure(
            &[&self.left[start..end], &self.right[start..end]],
            self.sample_rate,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_rejects_mismatched_channels() {
        let result = SourceAudio::stereo(48_000, vec![0.0; 10], vec![0.0; 9]);
        assert!(matches!(result, Err(RenderError::Failed(_))));
    }

    #[test]
    fn test_source_rejects_empty() {
        assert!(matches!(
            SourceAudio::mono(48_000, Vec::new()),
            Err(RenderError::EmptyBuffer)
        ));
    }

    #[test]
    fn test_source_rejects_sample_rate_below_filter_range() {
        for rate in [0, 44, 999] {
            assert!(matches!(
                SourceAudio::mono(rate, vec![0.0; 10]),
                Err(RenderError::UnsupportedSampleRate(r)) if r == rate
            ));
        }
        assert!(SourceAudio::mono(MIN_SAMPLE_RATE_HZ, vec![0.0; 10]).is_ok());
    }

    #[test]
    fn test_source_duration() {
        let source = SourceAudio::mono(48_000, vec![0.0; 96_000]).unwrap();
        assert_eq!(source.len(), 96_000);
        assert!((source.duration_s() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rendered_measure_clips_window() {
        let buffer = RenderedBuffer::new(48_000, vec![0.25; 48_000], vec![0.25; 48_000]);
        let inside = buffer.measure(24_000, 24_000);
        let overhang = buffer.measure(24_000, 1_000_000);
        assert_eq!(inside, overhang);
    }
}
