use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to an AI provider.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("AI provider is not configured: {0}")]
    MissingAiProvider(String),
}

/// Errors raised by the OCR engine, the audio transcoder or the speech recognizer.
///
/// The pipeline never surfaces these directly to HTTP callers; they are logged
/// and collapsed into empty text.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to spawn '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{binary}' exited with {status}: {stderr}")]
    CommandFailed {
        binary: String,
        status: String,
        stderr: String,
    },
    #[error("'{0}' did not finish within {1:?}")]
    Timeout(String, Duration),
    #[error("Failed to parse OCR output: {0}")]
    OcrOutput(#[from] csv::Error),
    #[error("Failed to send request to speech service: {0}")]
    SpeechRequest(#[from] reqwest::Error),
    #[error("Speech service returned an error: {0}")]
    SpeechApi(String),
    #[error("No speech detected")]
    NoSpeech,
}

/// Errors raised while receiving and storing an upload.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingInput,
    #[error("Empty filename")]
    EmptyFilename,
    #[error("Failed to store upload at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors the pipeline surfaces to its caller.
///
/// Only the voice-audio path has one: empty text after transcription. Every
/// other failure degrades into the result instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Couldn't transcribe audio")]
    Transcription { reason: String },
}
