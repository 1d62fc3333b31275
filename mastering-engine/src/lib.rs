//! # Mastering Engine
//!
//! Turns an analysis snapshot plus categorical mastering intent into bounded
//! DSP parameters, then verifies them against rendered audio:
//!
//! - [`specifics`]: distribution target → loudness/peak policy
//! - [`decision`]: oracle output repair and two-decision reconciliation
//! - [`risk`]: low-end distortion risk score
//! - [`deriver`]: intent + analysis → raw parameters
//! - [`clamp`]: bounds and pressure de-rating for any parameter set
//! - [`render`] / [`measure`]: trial rendering and BS.1770 measurement
//! - [`correction`]: render/measure/adjust loop
//! - [`advisory`]: oracle clients and the two-oracle panel
//! - [`pipeline`] / [`session`]: attempt orchestration and cancellation

pub mod advisory;
pub mod clamp;
pub mod correction;
pub mod decision;
pub mod deriver;
pub mod dsp;
pub mod error;
pub mod measure;
pub mod pipeline;
pub mod render;
pub mod risk;
pub mod session;
pub mod specifics;

pub use clamp::{clamp_params, PressureProfile, SafetyClamp};
pub use correction::{Correction, CorrectionError, CorrectionLoop, CorrectionOutcome};
pub use decision::{normalize, reconcile};
pub use deriver::{derive, derive_params, static_gain, Derivation, GainEstimate};
pub use error::MasteringError;
pub use pipeline::{plan_params, MasteringPipeline, MasteringReport, MasteringRequest};
pub use render::{OfflineRenderer, RenderBoundary, RenderError, SourceAudio, TrialRender};
pub use risk::{evaluate_risk, low_end_collision};
pub use session::{AttemptHandle, MasteringSession};
pub use specifics::resolve_specifics;
