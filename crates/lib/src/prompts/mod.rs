//! # Prompt Template Modules
//!
//! This module organizes the prompt templates used by the structured extraction
//! adapter. Defaults live in `tasks`; the server may override them per task.

pub mod tasks;

use crate::types::SourceKind;

/// The placeholder in user prompts that is replaced by the extracted raw text.
pub const RAW_TEXT_PLACEHOLDER: &str = "{raw_text}";

/// A system/user prompt pair for one extraction task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPrompts {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl TaskPrompts {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
        }
    }

    /// The compiled-in prompts for a source kind.
    pub fn defaults_for(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Receipt => Self::new(
                tasks::RECEIPT_EXTRACTION_SYSTEM_PROMPT,
                tasks::RECEIPT_EXTRACTION_USER_PROMPT,
            ),
            SourceKind::Voice => Self::new(
                tasks::VOICE_EXTRACTION_SYSTEM_PROMPT,
                tasks::VOICE_EXTRACTION_USER_PROMPT,
            ),
        }
    }

    /// Fills the user prompt with the raw text.
    ///
    /// A template without the placeholder gets the text appended, so an
    /// override can never silently drop the input.
    pub fn render_user_prompt(&self, raw_text: &str) -> String {
        if self.user_prompt.contains(RAW_TEXT_PLACEHOLDER) {
            self.user_prompt.replace(RAW_TEXT_PLACEHOLDER, raw_text)
        } else {
            format!("{}\n\n{}", self.user_prompt.trim_end(), raw_text)
        }
    }
}
