//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. The `AppState` holds the configuration, the
//! extraction pipeline with all of its collaborators, and the upload store.

use crate::config::AppConfig;
use finovia::{
    extract::{
        ocr::TesseractOcr, speech::create_recognizer, transcode::FfmpegTranscoder,
        AudioTextExtractor, OcrTextExtractor,
    },
    prompts::TaskPrompts,
    providers::{ai::AiProvider, factory::create_provider},
    structured::{ExtractionTask, LlmStructuredExtractor},
    uploads::UploadStore,
    Pipeline, SourceKind,
};
use std::{collections::HashMap, sync::Arc};
use tracing::info;

/// A fully resolved task configuration with non-optional fields.
#[derive(Clone, Debug)]
pub struct ResolvedTask {
    pub provider: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    pub pipeline: Pipeline,
    pub upload_store: Arc<UploadStore>,
}

impl AppState {
    /// Assembles a state from already-built parts.
    pub fn from_parts(config: AppConfig, pipeline: Pipeline, upload_store: UploadStore) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            upload_store: Arc::new(upload_store),
        }
    }
}

/// Validates the configured tasks and fills in every required field.
pub fn resolve_tasks(config: &AppConfig) -> anyhow::Result<HashMap<String, ResolvedTask>> {
    let mut resolved_tasks = HashMap::new();
    for (name, task_config) in &config.tasks {
        let provider = task_config.provider.clone().ok_or_else(|| {
            anyhow::anyhow!("Resolved task '{name}' is missing required 'provider' field")
        })?;
        let system_prompt = task_config.system_prompt.clone().ok_or_else(|| {
            anyhow::anyhow!("Resolved task '{name}' is missing required 'system_prompt' field")
        })?;
        let user_prompt = task_config.user_prompt.clone().ok_or_else(|| {
            anyhow::anyhow!("Resolved task '{name}' is missing required 'user_prompt' field")
        })?;

        resolved_tasks.insert(
            name.clone(),
            ResolvedTask {
                provider,
                system_prompt,
                user_prompt,
            },
        );
    }
    Ok(resolved_tasks)
}

/// Builds the shared application state from the configuration.
///
/// This function initializes all necessary services:
/// - an AI provider client for each entry in the `providers` section;
/// - the structured extractor, wiring each extraction task to its provider;
/// - the OCR engine, audio transcoder and speech recognizer;
/// - the upload store.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let timeout = config.timeouts.external();

    let mut ai_providers: HashMap<String, Arc<dyn AiProvider>> = HashMap::new();
    for (name, provider_config) in &config.providers {
        let provider = create_provider(name, provider_config, Some(timeout))?;
        ai_providers.insert(name.clone(), Arc::from(provider));
    }

    let tasks = resolve_tasks(&config)?;
    let mut structured = LlmStructuredExtractor::default();
    for kind in [SourceKind::Receipt, SourceKind::Voice] {
        let task_name = kind.task_name();
        let task = tasks.get(task_name).ok_or_else(|| {
            anyhow::anyhow!("Configuration for task '{task_name}' not found.")
        })?;
        let provider = ai_providers.get(&task.provider).ok_or_else(|| {
            anyhow::anyhow!(
                "Provider '{}' for task '{task_name}' not found in providers map.",
                task.provider
            )
        })?;
        structured = structured.with_task(
            kind,
            ExtractionTask {
                provider: provider.clone(),
                prompts: TaskPrompts::new(task.system_prompt.clone(), task.user_prompt.clone()),
            },
        );
        info!(task = %task_name, provider = %task.provider, "Configured extraction task.");
    }

    let ocr = TesseractOcr::new(
        config.ocr.binary.clone(),
        config.ocr.languages.clone(),
        timeout,
    );
    let transcoder = FfmpegTranscoder::new(config.transcoder.binary.clone(), timeout);
    let recognizer = create_recognizer(&config.speech, Some(timeout))?;

    let pipeline = Pipeline::new(
        Arc::new(OcrTextExtractor::new(Arc::new(ocr))),
        Arc::new(AudioTextExtractor::new(
            Arc::new(transcoder),
            Arc::from(recognizer),
        )),
        Arc::new(structured),
    );

    let upload_store = UploadStore::new(
        &config.uploads.root_dir,
        config.uploads.max_files_per_category,
    );
    info!(root = %config.uploads.root_dir, "Initialized upload store.");

    Ok(AppState::from_parts(config, pipeline, upload_store))
}
