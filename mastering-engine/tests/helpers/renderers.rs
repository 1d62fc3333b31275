//! Synthetic render boundaries

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mastering_common::Params;
use mastering_engine::measure::Measurement;
use mastering_engine::{RenderBoundary, RenderError, SourceAudio, TrialRender};
use tokio::sync::Notify;

pub fn silent_source(sample_rate: u32, seconds: f64) -> Arc<SourceAudio> {
    let frames = (sample_rate as f64 * seconds) as usize;
    Arc::new(SourceAudio::mono(sample_rate, vec![0.0; frames]).unwrap())
}

pub fn sine_source(sample_rate: u32, seconds: f64, frequency: f64, amplitude: f64) -> Arc<SourceAudio> {
    let frames = (sample_rate as f64 * seconds) as usize;
    let samples = (0..frames)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            ((2.0 * std::f64::consts::PI * frequency * t).sin() * amplitude) as f32
        })
        .collect();
    Arc::new(SourceAudio::mono(sample_rate, samples).unwrap())
}

/// Same reading for every window
struct FlatRender {
    len: usize,
    sample_rate: u32,
    reading: Measurement,
}

impl TrialRender for FlatRender {
    fn len(&self) -> usize {
        self.len
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn measure(&self, _start: usize, _len: usize) -> Measurement {
        self.reading
    }
}

/// loudness = gain_db + loudness_offset, peak = gain_db + peak_offset
pub struct LinearRenderer {
    pub loudness_offset: f64,
    pub peak_offset: f64,
    renders: AtomicU32,
}

impl LinearRenderer {
    pub fn new(loudness_offset: f64, peak_offset: f64) -> Arc<Self> {
        Arc::new(Self {
            loudness_offset,
            peak_offset,
            renders: AtomicU32::new(0),
        })
    }

    pub fn renders(&self) -> u32 {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderBoundary for LinearRenderer {
    async fn render(&self, params: &Params, source: Arc<SourceAudio>) -> Result<Arc<dyn TrialRender>, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FlatRender {
            len: source.len(),
            sample_rate: source.sample_rate(),
            reading: Measurement {
                loudness: params.gain_db + self.loudness_offset,
                true_peak_db: params.gain_db + self.peak_offset,
            },
        }))
    }
}

/// Quiet body with a louder, hotter final section
///
/// Windows starting in the back half read `outro_boost_db` louder; only
/// windows reaching the last `hot_tail` frames see the hot peak. Whole-buffer
/// loudness is the body level.
pub struct SectionedRenderer {
    pub body_loudness_offset: f64,
    pub body_peak_offset: f64,
    pub outro_boost_db: f64,
    pub hot_peak_offset: f64,
    pub hot_tail: usize,
}

struct SectionedRender {
    len: usize,
    sample_rate: u32,
    gain_db: f64,
    shape: SectionShape,
}

#[derive(Clone, Copy)]
struct SectionShape {
    body_loudness_offset: f64,
    body_peak_offset: f64,
    outro_boost_db: f64,
    hot_peak_offset: f64,
    hot_tail: usize,
}

impl TrialRender for SectionedRender {
    fn len(&self) -> usize {
        self.len
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn measure(&self, start: usize, len: usize) -> Measurement {
        let end = (start + len).min(self.len);
        let s = self.shape;
        let whole = start == 0 && end == self.len;

        let loudness = if !whole && start >= self.len / 2 {
            self.gain_db + s.body_loudness_offset + s.outro_boost_db
        } else {
            self.gain_db + s.body_loudness_offset
        };
        let peak = if end + s.hot_tail > self.len {
            self.gain_db + s.hot_peak_offset
        } else {
            self.gain_db + s.body_peak_offset
        };

        Measurement {
            loudness,
            true_peak_db: peak,
        }
    }
}

#[async_trait]
impl RenderBoundary for SectionedRenderer {
    async fn render(&self, params: &Params, source: Arc<SourceAudio>) -> Result<Arc<dyn TrialRender>, RenderError> {
        Ok(Arc::new(SectionedRender {
            len: source.len(),
            sample_rate: source.sample_rate(),
            gain_db: params.gain_db,
            shape: SectionShape {
                body_loudness_offset: self.body_loudness_offset,
                body_peak_offset: self.body_peak_offset,
                outro_boost_db: self.outro_boost_db,
                hot_peak_offset: self.hot_peak_offset,
                hot_tail: self.hot_tail,
            },
        }))
    }
}

pub struct FailingRenderer;

#[async_trait]
impl RenderBoundary for FailingRenderer {
    async fn render(&self, _params: &Params, _source: Arc<SourceAudio>) -> Result<Arc<dyn TrialRender>, RenderError> {
        Err(RenderError::Failed("synthetic failure".to_string()))
    }
}

/// Holds every render until released
pub struct GatedRenderer {
    inner: Arc<LinearRenderer>,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedRenderer {
    pub fn new(inner: Arc<LinearRenderer>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl RenderBoundary for GatedRenderer {
    async fn render(&self, params: &Params, source: Arc<SourceAudio>) -> Result<Arc<dyn TrialRender>, RenderError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.render(params, source).await
    }
}
