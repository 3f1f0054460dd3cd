//! # Application Configuration
//!
//! This module defines the configuration structure for the `finovia-server` and
//! provides the logic for loading it from a `config.yml` file and environment
//! variables.

use config::{
    Config as ConfigBuilder, Environment, File, FileFormat, Value as ConfigValue,
    ValueKind as ConfigValueKind,
};
use finovia::extract::speech::SpeechConfig;
use finovia::prompts::tasks::*;
use finovia::providers::factory::ProviderConfig;
use finovia::SourceKind;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The address or host name to bind. Loaded from `FINOVIA_HOST` env var.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// A map of named, reusable AI provider configurations.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// A map of tasks, each specifying a provider and prompts.
    pub tasks: HashMap<String, TaskConfig>,
}

fn default_port() -> u16 {
    5000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Where uploads are stored and how many are kept.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    #[serde(default = "default_upload_root")]
    pub root_dir: String,
    /// `0` keeps every upload.
    #[serde(default = "default_max_files_per_category")]
    pub max_files_per_category: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_upload_root() -> String {
    "uploads".to_string()
}

fn default_max_files_per_category() -> usize {
    100
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            root_dir: default_upload_root(),
            max_files_per_category: default_max_files_per_category(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_binary")]
    pub binary: String,
    /// Tesseract language codes joined by `+`, e.g. `eng+tha`.
    #[serde(default = "default_ocr_languages")]
    pub languages: String,
}

fn default_ocr_binary() -> String {
    "tesseract".to_string()
}

fn default_ocr_languages() -> String {
    "eng".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: default_ocr_binary(),
            languages: default_ocr_languages(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscoderConfig {
    #[serde(default = "default_transcoder_binary")]
    pub binary: String,
}

fn default_transcoder_binary() -> String {
    "ffmpeg".to_string()
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            binary: default_transcoder_binary(),
        }
    }
}

/// Bounds every call to an external binary or remote API.
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutsConfig {
    #[serde(default = "default_external_secs")]
    pub external_secs: u64,
}

fn default_external_secs() -> u64 {
    120
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            external_secs: default_external_secs(),
        }
    }
}

impl TimeoutsConfig {
    pub fn external(&self) -> Duration {
        Duration::from_secs(self.external_secs)
    }
}

/// Defines the prompts and provider for a specific application task.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TaskConfig {
    /// The key of the provider to use from the `providers` map.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<String>,
}

/// Constructs a `config::Value` map of the default, hardcoded tasks from the library.
/// This serves as the base layer of configuration.
fn build_default_tasks() -> HashMap<String, ConfigValue> {
    let tasks = vec![
        (
            SourceKind::Receipt.task_name(),
            (
                "default",
                RECEIPT_EXTRACTION_SYSTEM_PROMPT,
                RECEIPT_EXTRACTION_USER_PROMPT,
            ),
        ),
        (
            SourceKind::Voice.task_name(),
            (
                "default",
                VOICE_EXTRACTION_SYSTEM_PROMPT,
                VOICE_EXTRACTION_USER_PROMPT,
            ),
        ),
    ];

    tasks
        .into_iter()
        .map(|(name, (provider, sys, user))| {
            let mut table = HashMap::new();
            table.insert("provider".to_string(), ConfigValue::from(provider));
            table.insert("system_prompt".to_string(), ConfigValue::from(sys));
            table.insert("user_prompt".to_string(), ConfigValue::from(user));
            (
                name.to_string(),
                ConfigValue::new(None, ConfigValueKind::Table(table)),
            )
        })
        .collect()
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(format!("Invalid substitution pattern: {e}")))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

fn unprefixed_overrides() -> config::Map<String, String> {
    env::var("PORT")
        .ok()
        .map(|port| ("port".to_string(), port))
        .into_iter()
        .collect()
}

/// Loads the application configuration from a file and environment variables.
///
/// - `port` is overridden by `PORT`.
/// - Any key is overridden by `FINOVIA_...` variables (e.g., `FINOVIA_HOST`,
///   `FINOVIA_UPLOADS__ROOT_DIR`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults from the library.
        .set_default("tasks", build_default_tasks())?;

    // Layer 2: Main Config (with Fallback)
    let main_config_path = if let Some(override_path) = config_path_override {
        override_path.to_string()
    } else {
        let user_config_path = format!("{base_path}/config.yml");
        if std::path::Path::new(&user_config_path).exists() {
            info!("Loading user-defined configuration from '{user_config_path}'.");
            user_config_path
        } else {
            let provider = env::var("AI_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
            let fallback_path = format!("{base_path}/config.{provider}.yml");
            info!("'{user_config_path}' not found. Falling back to '{fallback_path}' based on AI_PROVIDER='{provider}'.");
            fallback_path
        }
    };

    let main_content = read_and_substitute(&main_config_path)?
        .ok_or_else(|| ConfigError::NotFound(format!("Main config file not found at '{main_config_path}'. Please ensure 'config.yml' exists or your AI_PROVIDER is set to load a valid template ('gemini' or 'local').")))?;
    builder = builder.add_source(File::from_str(&main_content, FileFormat::Yaml));

    // Layer 3: User Prompt Overrides (Optional)
    let user_prompt_path = format!("{base_path}/prompt.yml");
    if let Some(user_prompts_content) = read_and_substitute(&user_prompt_path)? {
        info!("Loading user prompt overrides from '{user_prompt_path}'.");
        builder = builder.add_source(File::from_str(&user_prompts_content, FileFormat::Yaml));
    }

    let settings = builder
        // Layer 4: `PORT` is the only unprefixed variable read. Shells often
        // export `HOST` as the machine's name, so it is not taken from here.
        .add_source(Environment::default().source(Some(unprefixed_overrides())))
        // Layer 5: Load prefixed environment variables for deeper overrides.
        .add_source(
            Environment::with_prefix("FINOVIA")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
