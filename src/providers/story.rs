// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::llm::{CompletionRequest, LanguageModel};
use crate::gateway::{required_str, Capability, CapabilityError, Params};

pub const STORY_NAME: &str = "story";
pub const DEFAULT_STORY_PRICE: u64 = 2000;

const SYSTEM_PROMPT: &str = "You are a creative story writer. Generate engaging and imaginative \
stories based on the given prompt.";

/// Short story generation from a prompt.
pub struct StoryCapability {
    model: Arc<dyn LanguageModel>,
    price: u64,
}

impl StoryCapability {
    pub fn new(model: Arc<dyn LanguageModel>, price: u64) -> Self {
        Self { model, price }
    }
}

#[async_trait]
impl Capability for StoryCapability {
    fn name(&self) -> &str {
        STORY_NAME
    }

    fn price(&self) -> u64 {
        self.price
    }

    fn validate(&self, params: &Params) -> Result<(), CapabilityError> {
        required_str(params, "prompt").map(|_| ())
    }

    async fn call(&self, params: &Params) -> Result<Params, CapabilityError> {
        let prompt = required_str(params, "prompt")?;
        let story = self
            .model
            .complete(CompletionRequest {
                system: SYSTEM_PROMPT.to_string(),
                prompt: prompt.to_string(),
                temperature: 0.7,
                max_tokens: 1000,
            })
            .await
            .map_err(|e| CapabilityError::Provider(e.to_string()))?;

        let mut result = Params::new();
        result.insert("prompt".into(), Value::from(prompt));
        result.insert("story".into(), Value::from(story));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use serde_json::json;

    #[tokio::test]
    async fn generates_story() {
        let model = Arc::new(ScriptedModel::new("Once upon a time"));
        let story = StoryCapability::new(model.clone(), DEFAULT_STORY_PRICE);
        let params = json!({"prompt": "a fox"}).as_object().cloned().unwrap();

        assert!(story.validate(&params).is_ok());
        let result = story.call(&params).await.unwrap();
        assert_eq!(result["story"], "Once upon a time");
        assert_eq!(result["prompt"], "a fox");
        assert_eq!(model.last_request().unwrap().temperature, 0.7);
    }

    #[test]
    fn prompt_is_required() {
        let story = StoryCapability::new(Arc::new(ScriptedModel::new("x")), DEFAULT_STORY_PRICE);
        assert!(story.validate(&Params::new()).is_err());
    }
}
