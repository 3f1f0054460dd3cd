//! # Structured Extraction
//!
//! Turns raw receipt or voice text into `LineItem`s by prompting an LLM for
//! strict JSON. Any failure along the way (provider error, malformed JSON,
//! wrong shape) becomes `Extraction::Degraded` instead of an error, so callers
//! always get a valid, possibly empty, item list plus the reason it is empty.

use crate::{
    prompts::TaskPrompts,
    providers::ai::AiProvider,
    types::{Extraction, LineItem, SourceKind},
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, raw_text: &str, kind: SourceKind) -> Extraction;
}

/// The provider and prompts used for one source kind.
#[derive(Debug, Clone)]
pub struct ExtractionTask {
    pub provider: Arc<dyn AiProvider>,
    pub prompts: TaskPrompts,
}

/// The LLM-backed `StructuredExtractor`.
#[derive(Debug, Clone, Default)]
pub struct LlmStructuredExtractor {
    tasks: HashMap<SourceKind, ExtractionTask>,
}

impl LlmStructuredExtractor {
    /// Uses one provider with the default prompts for both source kinds.
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self::default()
            .with_task(
                SourceKind::Receipt,
                ExtractionTask {
                    provider: provider.clone(),
                    prompts: TaskPrompts::defaults_for(SourceKind::Receipt),
                },
            )
            .with_task(
                SourceKind::Voice,
                ExtractionTask {
                    provider,
                    prompts: TaskPrompts::defaults_for(SourceKind::Voice),
                },
            )
    }

    pub fn with_task(mut self, kind: SourceKind, task: ExtractionTask) -> Self {
        self.tasks.insert(kind, task);
        self
    }
}

#[async_trait]
impl StructuredExtractor for LlmStructuredExtractor {
    async fn extract(&self, raw_text: &str, kind: SourceKind) -> Extraction {
        if raw_text.trim().is_empty() {
            debug!(%kind, "No raw text; skipping the AI call");
            return Extraction::Ok(Vec::new());
        }

        let Some(task) = self.tasks.get(&kind) else {
            error!(%kind, "No extraction task configured");
            return Extraction::degraded(format!("no extraction task configured for {kind}"));
        };

        let user_prompt = task.prompts.render_user_prompt(raw_text);
        debug!(%kind, system_prompt = %task.prompts.system_prompt, user_prompt = %user_prompt, "--> Sending prompts to AI Provider");

        let response = match task
            .provider
            .generate(&task.prompts.system_prompt, &user_prompt)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(%kind, error = %e, "AI provider call failed; extraction degraded");
                return Extraction::degraded(format!("AI provider request failed: {e}"));
            }
        };

        debug!(%kind, "<-- Response from AI: {}", response);

        match parse_line_items(&response) {
            Ok(items) => {
                info!(%kind, items = items.len(), "Structured extraction finished");
                Extraction::Ok(items)
            }
            Err(reason) => {
                error!(%kind, %reason, "Could not parse AI response; extraction degraded");
                Extraction::Degraded { reason }
            }
        }
    }
}

fn fenced_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+-]*[^\S\n]*\n(.*?)\n?[^\S\n]*```")
            .expect("fence pattern is valid")
    })
}

/// Removes a markdown code fence wrapped around an LLM response.
///
/// The opening fence line (with any language tag) and the closing fence line
/// are both dropped. Text without a fence comes back trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(body) = fenced_block().captures(trimmed).and_then(|c| c.get(1)) {
        return body.as_str().trim();
    }
    match trimmed.strip_prefix("```") {
        // Unterminated or single-line fence.
        Some(rest) => {
            let rest = rest.strip_suffix("```").unwrap_or(rest);
            match rest.split_once('\n') {
                Some((_tag, body)) => body.trim(),
                None => rest.trim(),
            }
        }
        None => trimmed,
    }
}

/// Parses an LLM response into line items.
///
/// Accepts a JSON array of item objects, optionally fenced, or an object with
/// an `items` array. The error is a human-readable reason.
pub fn parse_line_items(response: &str) -> Result<Vec<LineItem>, String> {
    let body = strip_code_fence(response);
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("AI response is not valid JSON: {e}"))?;

    let array = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("items") {
            Some(items @ Value::Array(_)) => items,
            _ => return Err("AI response is a JSON object without an 'items' array".to_string()),
        },
        other => {
            return Err(format!(
                "AI response is not a JSON array (got {})",
                json_kind(&other)
            ))
        }
    };

    serde_json::from_value(array).map_err(|e| format!("AI response items are malformed: {e}"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
