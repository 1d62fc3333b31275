//! Two-oracle decision panel
//!
//! Protocol with both oracles configured:
//! 1. primary proposes
//! 2. reviewer reviews the proposal
//! 3. primary settles given both
//!
//! The reviewer is optional: if it is missing or fails, the primary's
//! proposal stands alone. If the settling round fails, the two versions are
//! reconciled by confidence-weighted voting. Only a primary failure in step 1
//! is fatal.

use std::fmt;
use std::sync::Arc;

use mastering_common::config::OracleSettings;
use mastering_common::{AnalysisSnapshot, Decision, Specifics};

use super::http_client::HttpOracle;
use super::prompt::{consensus_prompt, initial_prompt, review_prompt};
use super::response::parse_decision;
use super::{AdvisoryError, AdvisoryOracle};
use crate::decision::reconcile;

/// How the final decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPath {
    /// No oracle configured; field defaults used
    Default,
    /// Primary alone
    Solo,
    /// Primary settled after review
    Consensus,
    /// Settling failed; proposal and review merged locally
    Reconciled,
}

impl DecisionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionPath::Default => "default",
            DecisionPath::Solo => "solo",
            DecisionPath::Consensus => "consensus",
            DecisionPath::Reconciled => "reconciled",
        }
    }
}

impl fmt::Display for DecisionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelDecision {
    pub decision: Decision,
    pub path: DecisionPath,
}

/// Primary plus optional reviewer
#[derive(Clone, Default)]
pub struct AdvisoryPanel {
    primary: Option<Arc<dyn AdvisoryOracle>>,
    reviewer: Option<Arc<dyn AdvisoryOracle>>,
}

impl AdvisoryPanel {
    /// A lone reviewer is promoted to primary
    pub fn new(primary: Option<Arc<dyn AdvisoryOracle>>, reviewer: Option<Arc<dyn AdvisoryOracle>>) -> Self {
        match (primary, reviewer) {
            (None, Some(reviewer)) => {
                tracing::warn!(oracle = reviewer.name(), "Only a reviewer oracle configured, using it as primary");
                Self {
                    primary: Some(reviewer),
                    reviewer: None,
                }
            }
            (primary, reviewer) => Self { primary, reviewer },
        }
    }

    /// Build HTTP oracles from configuration
    pub fn from_settings(settings: &OracleSettings) -> Result<Self, AdvisoryError> {
        let primary = settings
            .primary
            .as_ref()
            .map(|c| HttpOracle::from_endpoint("primary", c).map(|o| Arc::new(o) as Arc<dyn AdvisoryOracle>))
            .transpose()?;
        let reviewer = settings
            .reviewer
            .as_ref()
            .map(|c| HttpOracle::from_endpoint("reviewer", c).map(|o| Arc::new(o) as Arc<dyn AdvisoryOracle>))
            .transpose()?;
        Ok(Self::new(primary, reviewer))
    }

    pub fn is_configured(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_reviewer(&self) -> bool {
        self.reviewer.is_some()
    }

    /// Run the protocol for one track
    pub async fn decide(&self, snapshot: &AnalysisSnapshot, specifics: &Specifics) -> Result<PanelDecision, AdvisoryError> {
        let Some(primary) = &self.primary else {
            tracing::info!(path = "default", "No advisory oracle configured, using default decision");
            return Ok(PanelDecision {
                decision: Decision::default(),
                path: DecisionPath::Default,
            });
        };

        let initial = ask(primary.as_ref(), &initial_prompt(snapshot, specifics)).await?;

        let Some(reviewer) = &self.reviewer else {
            return Ok(finish(initial, DecisionPath::Solo));
        };

        let review = match ask(reviewer.as_ref(), &review_prompt(snapshot, specifics, &initial)).await {
            Ok(review) => review,
            Err(e) => {
                tracing::warn!(oracle = reviewer.name(), error = %e, "Review failed, keeping primary decision");
                return Ok(finish(initial, DecisionPath::Solo));
            }
        };

        match ask(primary.as_ref(), &consensus_prompt(snapshot, specifics, &initial, &review)).await {
            Ok(settled) => Ok(finish(settled, DecisionPath::Consensus)),
            Err(e) => {
                tracing::warn!(oracle = primary.name(), error = %e, "Consensus round failed, reconciling locally");
                Ok(finish(reconcile(&initial, &review), DecisionPath::Reconciled))
            }
        }
    }
}

async fn ask(oracle: &dyn AdvisoryOracle, prompt: &str) -> Result<Decision, AdvisoryError> {
    let text = oracle.query(prompt).await?;
    parse_decision(&text)
}

fn finish(decision: Decision, path: DecisionPath) -> PanelDecision {
    tracing::info!(
        path = path.as_str(),
        confidence = decision.confidence,
        "Advisory decision ready"
    );
    PanelDecision { decision, path }
}
