// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! News article summarization from a URL or inline text.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::llm::{CompletionRequest, LanguageModel};
use crate::gateway::{optional_str, Capability, CapabilityError, Params};

pub const SUMMARIZER_NAME: &str = "summarizer";
pub const DEFAULT_SUMMARIZER_PRICE: u64 = 1000;

const SYSTEM_PROMPT: &str = "You are a professional news summarizer. Provide concise and \
informative summaries of news articles.";

enum Article<'a> {
    Url(&'a str),
    Text(&'a str),
}

fn parse(params: &Params) -> Result<Article<'_>, CapabilityError> {
    if let Some(url) = optional_str(params, "article_url") {
        url::Url::parse(url).map_err(|e| {
            CapabilityError::InvalidParams(format!("Invalid article_url: {e}"))
        })?;
        return Ok(Article::Url(url));
    }
    optional_str(params, "article_text")
        .map(Article::Text)
        .ok_or_else(|| {
            CapabilityError::InvalidParams(
                "Either article_url or article_text must be provided".to_string(),
            )
        })
}

pub struct SummarizerCapability {
    model: Arc<dyn LanguageModel>,
    price: u64,
}

impl SummarizerCapability {
    pub fn new(model: Arc<dyn LanguageModel>, price: u64) -> Self {
        Self { model, price }
    }
}

#[async_trait]
impl Capability for SummarizerCapability {
    fn name(&self) -> &str {
        SUMMARIZER_NAME
    }

    fn price(&self) -> u64 {
        self.price
    }

    fn validate(&self, params: &Params) -> Result<(), CapabilityError> {
        parse(params).map(|_| ())
    }

    async fn call(&self, params: &Params) -> Result<Params, CapabilityError> {
        let article = parse(params)?;
        let (subject, source) = match article {
            Article::Url(url) => (format!(" from URL: {url}"), url),
            Article::Text(text) => (format!(": {text}"), "text"),
        };
        let prompt = format!(
            "Summarize the following article{subject}\n\
             Focus on the main points and key takeaways.\n\
             Keep the summary concise and informative."
        );

        let summary = self
            .model
            .complete(CompletionRequest {
                system: SYSTEM_PROMPT.to_string(),
                prompt,
                temperature: 0.3,
                max_tokens: 500,
            })
            .await
            .map_err(|e| CapabilityError::Provider(e.to_string()))?;

        let mut result = Params::new();
        result.insert("summary".into(), Value::from(summary));
        result.insert("source".into(), Value::from(source));
        Ok(result)
    }
}
