//! Scripted advisory oracles

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mastering_engine::advisory::{AdvisoryError, AdvisoryOracle};

/// Replies from a fixed script and records every prompt it saw
pub struct ScriptedOracle {
    name: &'static str,
    replies: Mutex<VecDeque<Result<String, AdvisoryError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(name: &'static str, replies: Vec<Result<&str, AdvisoryError>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdvisoryOracle for ScriptedOracle {
    fn name(&self) -> &str {
        self.name
    }

    async fn query(&self, prompt: &str) -> Result<String, AdvisoryError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AdvisoryError::Network("script exhausted".to_string())))
    }
}
