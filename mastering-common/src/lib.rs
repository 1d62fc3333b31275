//! # Mastering Common Library
//!
//! Shared code for the mastering workspace including:
//! - Domain types (analysis snapshot, distribution specifics, decisions, parameters)
//! - Event types (MasteringEvent enum) and the broadcast EventBus
//! - Configuration loading and logging setup
//! - Common error type

pub mod analysis;
pub mod config;
pub mod decision;
pub mod error;
pub mod events;
pub mod params;
pub mod specifics;

pub use analysis::{AnalysisSnapshot, Band, WindowSnapshot};
pub use decision::{
    Decision, HighFreqTreatment, KickSafety, OrdinalField, RawDecision, SaturationNeed,
    StereoIntent, TransientHandling,
};
pub use error::{Error, Result};
pub use params::{AdaptiveTiming, CorrectionResult, EqAdjustment, EqType, Params};
pub use specifics::{DistributionTarget, Specifics};
