// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Text translation between a fixed set of languages.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::llm::{CompletionRequest, LanguageModel};
use crate::gateway::{optional_str, required_str, Capability, CapabilityError, Params};

pub const TRANSLATOR_NAME: &str = "translator";
pub const DEFAULT_TRANSLATOR_PRICE: u64 = 1500;

/// Supported language codes and display names.
pub const SUPPORTED_LANGUAGES: [(&str, &str); 12] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("nl", "Dutch"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("zh", "Chinese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
];

const SYSTEM_PROMPT: &str = "You are a professional translator. Provide accurate translations \
while preserving context and cultural nuances.";

pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

pub struct TranslatorCapability {
    model: Arc<dyn LanguageModel>,
    price: u64,
}

impl TranslatorCapability {
    pub fn new(model: Arc<dyn LanguageModel>, price: u64) -> Self {
        Self { model, price }
    }
}

struct Translation<'a> {
    text: &'a str,
    target: &'a str,
    target_name: &'static str,
    source: Option<&'a str>,
    source_name: &'static str,
}

fn parse(params: &Params) -> Result<Translation<'_>, CapabilityError> {
    let text = required_str(params, "text")?;
    let target = required_str(params, "target_language")?;
    let target_name = language_name(target).ok_or_else(|| {
        CapabilityError::InvalidParams(format!("Unsupported target language: {target}"))
    })?;
    let source = optional_str(params, "source_language");
    let source_name = match source {
        Some(code) => language_name(code).ok_or_else(|| {
            CapabilityError::InvalidParams(format!("Unsupported source language: {code}"))
        })?,
        None => "auto-detected",
    };
    Ok(Translation {
        text,
        target,
        target_name,
        source,
        source_name,
    })
}

#[async_trait]
impl Capability for TranslatorCapability {
    fn name(&self) -> &str {
        TRANSLATOR_NAME
    }

    fn price(&self) -> u64 {
        self.price
    }

    fn validate(&self, params: &Params) -> Result<(), CapabilityError> {
        parse(params).map(|_| ())
    }

    async fn call(&self, params: &Params) -> Result<Params, CapabilityError> {
        let t = parse(params)?;
        let prompt = format!(
            "Translate the following text from {} to {}.\n\
             Preserve the context, tone, and any cultural references.\n\
             Text to translate: {}",
            t.source_name, t.target_name, t.text
        );

        let translated = self
            .model
            .complete(CompletionRequest {
                system: SYSTEM_PROMPT.to_string(),
                prompt,
                temperature: 0.3,
                max_tokens: 1000,
            })
            .await
            .map_err(|e| CapabilityError::Provider(e.to_string()))?;

        let mut result = Params::new();
        result.insert("original_text".into(), Value::from(t.text));
        result.insert("translated_text".into(), Value::from(translated));
        result.insert("source_language".into(), Value::from(t.source.unwrap_or("auto")));
        result.insert("target_language".into(), Value::from(t.target));
        result.insert("source_language_name".into(), Value::from(t.source_name));
        result.insert("target_language_name".into(), Value::from(t.target_name));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn validates_languages() {
        let translator = TranslatorCapability::new(Arc::new(ScriptedModel::new("x")), 1500);

        assert!(translator
            .validate(&params(json!({"text": "hi", "target_language": "es"})))
            .is_ok());
        assert!(translator
            .validate(&params(json!({"text": "hi", "target_language": "xx"})))
            .is_err());
        assert!(translator
            .validate(&params(json!({"text": "hi", "target_language": "es", "source_language": "tlh"})))
            .is_err());
        assert!(translator.validate(&params(json!({"target_language": "es"}))).is_err());
    }

    #[tokio::test]
    async fn builds_prompt_and_result() {
        let model = Arc::new(ScriptedModel::new("hola"));
        let translator = TranslatorCapability::new(model.clone(), 1500);

        let result = translator
            .call(&params(json!({"text": "hello", "target_language": "es", "source_language": "en"})))
            .await
            .unwrap();
        assert_eq!(result["translated_text"], "hola");
        assert_eq!(result["source_language_name"], "English");
        assert_eq!(result["target_language_name"], "Spanish");

        let request = model.last_request().unwrap();
        assert!(request.prompt.contains("from English to Spanish"));
        assert!(request.prompt.ends_with("hello"));
        assert_eq!(request.max_tokens, 1000);
    }

    #[tokio::test]
    async fn auto_detects_missing_source() {
        let translator = TranslatorCapability::new(Arc::new(ScriptedModel::new("bonjour")), 1500);
        let result = translator
            .call(&params(json!({"text": "hello", "target_language": "fr"})))
            .await
            .unwrap();
        assert_eq!(result["source_language"], "auto");
        assert_eq!(result["source_language_name"], "auto-detected");
    }

    #[tokio::test]
    async fn model_failure_is_provider_error() {
        let translator = TranslatorCapability::new(Arc::new(ScriptedModel::failing()), 1500);
        let err = translator
            .call(&params(json!({"text": "hello", "target_language": "fr"})))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Provider(_)));
    }
}
