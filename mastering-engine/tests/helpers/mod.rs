//! Test Helper Utilities
//!
//! Shared fixtures for mastering-engine integration tests

#![allow(dead_code)]

pub mod oracles;
pub mod renderers;
pub mod snapshots;

pub use oracles::ScriptedOracle;
pub use renderers::{sine_source, silent_source, FailingRenderer, GatedRenderer, LinearRenderer, SectionedRenderer};
pub use snapshots::{all_decisions, clean_snapshot, collision_snapshot, scenario_a_snapshot};
