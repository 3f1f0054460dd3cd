//! # Speech Recognition
//!
//! Cloud speech-to-text clients. Each takes a normalized WAV file and returns
//! the transcript; silence is reported as `ExtractError::NoSpeech`.

use super::transcode::TARGET_SAMPLE_RATE;
use crate::errors::ExtractError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{multipart, Client as ReqwestClient};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const GOOGLE_SPEECH_API_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";
pub const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

#[async_trait]
pub trait SpeechRecognizer: Send + Sync + Debug {
    async fn recognize(&self, wav_path: &Path) -> Result<String, ExtractError>;
}

/// Selects and configures the speech recognizer.
#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    /// "google" or "whisper".
    #[serde(default = "default_speech_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Only used by the whisper provider.
    #[serde(default)]
    pub model: Option<String>,
}

fn default_speech_provider() -> String {
    "google".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: default_speech_provider(),
            api_url: None,
            api_key: None,
            language: default_language(),
            model: None,
        }
    }
}

/// Builds the recognizer named by `config.provider`.
pub fn create_recognizer(
    config: &SpeechConfig,
    timeout: Option<Duration>,
) -> Result<Box<dyn SpeechRecognizer>, ExtractError> {
    let api_key = config.api_key.clone().filter(|k| !k.is_empty());
    let api_url = config.api_url.clone().filter(|u| !u.is_empty());
    let recognizer: Box<dyn SpeechRecognizer> = match config.provider.as_str() {
        "google" => Box::new(GoogleSpeechRecognizer::new(
            api_url.unwrap_or_else(|| GOOGLE_SPEECH_API_URL.to_string()),
            api_key,
            config.language.clone(),
            timeout,
        )?),
        "whisper" => Box::new(WhisperRecognizer::new(
            api_url.unwrap_or_else(|| WHISPER_API_URL.to_string()),
            api_key,
            config.model.clone().unwrap_or_else(|| "whisper-1".to_string()),
            Some(config.language.clone()),
            timeout,
        )?),
        other => {
            return Err(ExtractError::SpeechApi(format!(
                "Unsupported speech provider '{other}'"
            )))
        }
    };
    info!(provider = %config.provider, "Configured speech recognizer.");
    Ok(recognizer)
}

fn build_client(timeout: Option<Duration>) -> Result<ReqwestClient, ExtractError> {
    let mut builder = ReqwestClient::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

async fn read_audio(path: &Path) -> Result<Vec<u8>, ExtractError> {
    tokio::fs::read(path).await.map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// --- Google Cloud Speech-to-Text ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Deserialize, Debug)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Deserialize, Debug)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Deserialize, Debug)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
}

/// Google Cloud Speech-to-Text v1 `speech:recognize`.
#[derive(Clone)]
pub struct GoogleSpeechRecognizer {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    language: String,
}

impl Debug for GoogleSpeechRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSpeechRecognizer")
            .field("api_url", &self.api_url)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl GoogleSpeechRecognizer {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        language: String,
        timeout: Option<Duration>,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url,
            api_key,
            language,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeechRecognizer {
    async fn recognize(&self, wav_path: &Path) -> Result<String, ExtractError> {
        let audio = read_audio(wav_path).await?;
        let request_body = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: TARGET_SAMPLE_RATE,
                language_code: &self.language,
            },
            audio: RecognitionAudio {
                content: general_purpose::STANDARD.encode(&audio),
            },
        };

        let mut request = self.client.post(&self.api_url).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::SpeechApi(format!("{status}: {error_text}")));
        }

        let body: RecognizeResponse = response.json().await?;
        let transcript = body
            .results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        debug!(chars = transcript.len(), "Google speech transcript received");

        if transcript.is_empty() {
            return Err(ExtractError::NoSpeech);
        }
        Ok(transcript)
    }
}

// --- OpenAI-compatible transcription ---

#[derive(Deserialize, Debug)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// An OpenAI-compatible `/v1/audio/transcriptions` endpoint (Whisper and friends).
#[derive(Clone, Debug)]
pub struct WhisperRecognizer {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
    model: String,
    language: Option<String>,
}

impl WhisperRecognizer {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: String,
        language: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url,
            api_key,
            model,
            language,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    async fn recognize(&self, wav_path: &Path) -> Result<String, ExtractError> {
        let audio = read_audio(wav_path).await?;
        let file_name = wav_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());
        let file_part = multipart::Part::bytes(audio)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        let mut form = multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());
        // The endpoint wants ISO-639-1 ("en"), not a BCP-47 tag ("en-US").
        if let Some(language) = &self.language {
            let iso = language.split('-').next().unwrap_or(language).to_lowercase();
            form = form.text("language", iso);
        }

        let mut request = self.client.post(&self.api_url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::SpeechApi(format!("{status}: {error_text}")));
        }

        let body: TranscriptionResponse = response.json().await?;
        let transcript = body.text.trim().to_string();
        if transcript.is_empty() {
            return Err(ExtractError::NoSpeech);
        }
        Ok(transcript)
    }
}
