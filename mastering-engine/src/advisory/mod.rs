//! Advisory oracle layer
//!
//! Oracles are opaque text services. Their output crosses into the engine
//! through exactly one door: [`parse_decision`], which extracts a JSON object
//! and repairs it into a valid [`Decision`](mastering_common::Decision).

mod http_client;
mod panel;
mod prompt;
mod response;

use async_trait::async_trait;
use thiserror::Error;

pub use http_client::HttpOracle;
pub use panel::{AdvisoryPanel, DecisionPath, PanelDecision};
pub use prompt::{consensus_prompt, initial_prompt, review_prompt};
pub use response::{extract_json_object, parse_decision};

/// Oracle errors
#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response carried no JSON object at all
    #[error("No decision in oracle response: {0}")]
    NoDecision(String),

    #[error("Oracle request timed out")]
    Timeout,

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),
}

/// A text-generation service asked for categorical decisions
#[async_trait]
pub trait AdvisoryOracle: Send + Sync {
    /// Label used in logs
    fn name(&self) -> &str;

    /// Send a prompt, return the raw response text
    async fn query(&self, prompt: &str) -> Result<String, AdvisoryError>;
}
