//! # Finovia
//!
//! Receipt and voice purchase extraction. Raw text comes from an external OCR
//! engine or speech recognizer, a hosted LLM turns it into line items, and the
//! items are totaled.

pub mod errors;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod structured;
pub mod total;
pub mod types;
pub mod uploads;

pub use errors::{ExtractError, PipelineError, PromptError, UploadError};
pub use pipeline::Pipeline;
pub use types::{Extraction, ExtractionRequest, ExtractionResult, ExtractionStatus, LineItem, SourceKind};
