// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Capability providers.
//!
//! Each provider builds a prompt from its parameters and delegates to a
//! [`LanguageModel`](llm::LanguageModel).

pub mod llm;
pub mod story;
pub mod summarizer;
pub mod translator;

use std::sync::Arc;

pub use llm::{CompletionRequest, LanguageModel, LlmError, OpenAiChatClient};
pub use story::StoryCapability;
pub use summarizer::SummarizerCapability;
pub use translator::{TranslatorCapability, SUPPORTED_LANGUAGES};

use crate::config::Prices;
use crate::gateway::CapabilityRegistry;

/// Registry with the built-in capabilities at the configured prices.
pub fn default_registry(model: Arc<dyn LanguageModel>, prices: &Prices) -> CapabilityRegistry {
    CapabilityRegistry::new()
        .register(Arc::new(TranslatorCapability::new(model.clone(), prices.translator)))
        .register(Arc::new(SummarizerCapability::new(model.clone(), prices.summarizer)))
        .register(Arc::new(StoryCapability::new(model, prices.story)))
}
