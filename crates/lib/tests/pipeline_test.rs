//! # Pipeline Tests
//!
//! End-to-end runs of the extraction pipeline with fake OCR, transcoding,
//! speech and LLM collaborators.

use finovia::extract::{AudioTextExtractor, OcrTextExtractor};
use finovia::prompts::tasks::{RECEIPT_EXTRACTION_SYSTEM_PROMPT, VOICE_EXTRACTION_SYSTEM_PROMPT};
use finovia::structured::LlmStructuredExtractor;
use finovia::{ExtractionRequest, ExtractionStatus, LineItem, Pipeline, PipelineError};
use finovia_test_utils::{FakeOcrEngine, FakeSpeechRecognizer, FakeTranscoder, MockAiProvider};
use std::path::PathBuf;
use std::sync::Arc;

const RECEIPT_JSON: &str = r#"[{"item": "BANANA", "quantity": 2, "unit": null, "price": 1.50}, {"item": "WATERMELON", "quantity": 1, "unit": null, "price": 4.00}]"#;
const VOICE_JSON: &str = r#"[{"item": "banana", "quantity": 2, "unit": null, "price": 1}, {"item": "coffee", "quantity": 1, "unit": null, "price": 2}]"#;

fn pipeline(
    ocr: FakeOcrEngine,
    recognizer: FakeSpeechRecognizer,
    mock: &MockAiProvider,
) -> Pipeline {
    Pipeline::new(
        Arc::new(OcrTextExtractor::new(Arc::new(ocr))),
        Arc::new(AudioTextExtractor::new(
            Arc::new(FakeTranscoder::passthrough()),
            Arc::new(recognizer),
        )),
        Arc::new(LlmStructuredExtractor::new(Arc::new(mock.clone()))),
    )
}

fn upload(name: &str) -> PathBuf {
    PathBuf::from("uploads").join(name)
}

#[tokio::test]
async fn test_receipt_pipeline_totals_items() -> anyhow::Result<()> {
    let mock = MockAiProvider::new();
    mock.add_response(RECEIPT_EXTRACTION_SYSTEM_PROMPT, RECEIPT_JSON);
    let pipeline = pipeline(
        FakeOcrEngine::with_text("BANANA 2 x 1.50\nWATERMELON 4.00"),
        FakeSpeechRecognizer::silent(),
        &mock,
    );

    let result = pipeline
        .run(ExtractionRequest::receipt(upload("receipt.jpg")))
        .await?;

    assert_eq!(result.raw_text, "BANANA 2 x 1.50\nWATERMELON 4.00");
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0], LineItem::new("BANANA", 2.0, Some(1.5)));
    assert_eq!(result.total, 7.0);
    assert_eq!(result.extraction, ExtractionStatus::Ok);
    Ok(())
}

#[tokio::test]
async fn test_receipt_ocr_failure_is_degraded_not_an_error() -> anyhow::Result<()> {
    let mock = MockAiProvider::new();
    let pipeline = pipeline(FakeOcrEngine::failing(), FakeSpeechRecognizer::silent(), &mock);

    let result = pipeline
        .run(ExtractionRequest::receipt(upload("blurry.jpg")))
        .await?;

    assert_eq!(result.raw_text, "");
    assert!(result.items.is_empty());
    assert_eq!(result.total, 0.0);
    match result.extraction {
        ExtractionStatus::Degraded { reason } => {
            assert!(reason.starts_with("text extraction failed"), "{reason}")
        }
        other => panic!("expected degraded status, got {other:?}"),
    }
    assert!(mock.get_calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_receipt_with_blank_ocr_output_returns_empty_items() -> anyhow::Result<()> {
    let mock = MockAiProvider::new();
    let pipeline = pipeline(FakeOcrEngine::with_text(""), FakeSpeechRecognizer::silent(), &mock);

    let result = pipeline.process_receipt(&upload("blank.png")).await;

    assert!(result.items.is_empty());
    assert_eq!(result.total, 0.0);
    assert_eq!(result.extraction, ExtractionStatus::Ok);
    assert!(mock.get_calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_receipt_llm_failure_keeps_raw_text() -> anyhow::Result<()> {
    let mock = MockAiProvider::new();
    mock.add_response(RECEIPT_EXTRACTION_SYSTEM_PROMPT, "not json at all");
    let pipeline = pipeline(
        FakeOcrEngine::with_text("MILK 2.50"),
        FakeSpeechRecognizer::silent(),
        &mock,
    );

    let result = pipeline.process_receipt(&upload("milk.jpg")).await;

    assert_eq!(result.raw_text, "MILK 2.50");
    assert!(result.items.is_empty());
    assert_eq!(result.total, 0.0);
    assert!(matches!(result.extraction, ExtractionStatus::Degraded { .. }));
    Ok(())
}

#[tokio::test]
async fn test_voice_audio_pipeline() -> anyhow::Result<()> {
    let mock = MockAiProvider::new();
    mock.add_response(VOICE_EXTRACTION_SYSTEM_PROMPT, VOICE_JSON);
    let pipeline = pipeline(
        FakeOcrEngine::failing(),
        FakeSpeechRecognizer::with_transcript("  I bought two bananas and a coffee  "),
        &mock,
    );

    let result = pipeline
        .run(ExtractionRequest::voice_audio(upload("note.m4a")))
        .await?;

    assert_eq!(result.raw_text, "I bought two bananas and a coffee");
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.total, 4.0);
    Ok(())
}

#[tokio::test]
async fn test_voice_audio_without_speech_is_an_error() {
    let mock = MockAiProvider::new();
    let pipeline = pipeline(FakeOcrEngine::failing(), FakeSpeechRecognizer::silent(), &mock);

    let result = pipeline
        .run(ExtractionRequest::voice_audio(upload("silence.wav")))
        .await;

    let err = result.expect_err("silence should not produce a result");
    assert!(matches!(err, PipelineError::Transcription { .. }));
    assert_eq!(err.to_string(), "Couldn't transcribe audio");
    assert!(mock.get_calls().is_empty());
}

#[tokio::test]
async fn test_voice_audio_recognizer_failure_is_an_error() {
    let mock = MockAiProvider::new();
    let pipeline = pipeline(FakeOcrEngine::failing(), FakeSpeechRecognizer::failing(), &mock);

    let result = pipeline.process_voice_audio(&upload("note.ogg")).await;

    match result {
        Err(PipelineError::Transcription { reason }) => assert!(reason.contains("429"), "{reason}"),
        other => panic!("expected a transcription error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_voice_audio_transcoder_failure_is_an_error() {
    let mock = MockAiProvider::new();
    let transcoder = FakeTranscoder::failing();
    let pipeline = Pipeline::new(
        Arc::new(OcrTextExtractor::new(Arc::new(FakeOcrEngine::failing()))),
        Arc::new(AudioTextExtractor::new(
            Arc::new(transcoder.clone()),
            Arc::new(FakeSpeechRecognizer::with_transcript("never reached")),
        )),
        Arc::new(LlmStructuredExtractor::new(Arc::new(mock.clone()))),
    );

    let result = pipeline.process_voice_audio(&upload("corrupt.mp3")).await;

    assert!(matches!(result, Err(PipelineError::Transcription { .. })));
    assert_eq!(transcoder.get_calls(), vec![upload("corrupt.mp3")]);
}

#[tokio::test]
async fn test_voice_audio_transcoder_failure_removes_partial_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let audio = dir.path().join("note.m4a");
    std::fs::write(&audio, b"m4a bytes")?;
    let transcoder = FakeTranscoder::failing_with_partial_output();
    let pipeline = Pipeline::new(
        Arc::new(OcrTextExtractor::new(Arc::new(FakeOcrEngine::failing()))),
        Arc::new(AudioTextExtractor::new(
            Arc::new(transcoder.clone()),
            Arc::new(FakeSpeechRecognizer::with_transcript("never reached")),
        )),
        Arc::new(LlmStructuredExtractor::new(Arc::new(MockAiProvider::new()))),
    );

    let result = pipeline.run(ExtractionRequest::voice_audio(audio.clone())).await;

    assert!(matches!(result, Err(PipelineError::Transcription { .. })));
    assert!(audio.exists());
    assert!(!dir.path().join("note.m4a.wav").exists());
    Ok(())
}

#[tokio::test]
async fn test_voice_text_is_used_verbatim() -> anyhow::Result<()> {
    let mock = MockAiProvider::new();
    mock.add_response(VOICE_EXTRACTION_SYSTEM_PROMPT, VOICE_JSON);
    let pipeline = pipeline(FakeOcrEngine::failing(), FakeSpeechRecognizer::failing(), &mock);
    let text = "I bought two bananas for 1 each and a coffee for 2";

    let result = pipeline.run(ExtractionRequest::voice_text(text)).await?;

    assert_eq!(result.raw_text, text);
    assert_eq!(result.total, 4.0);
    assert!(mock.get_calls()[0].1.contains(text));
    Ok(())
}

#[tokio::test]
async fn test_voice_text_llm_failure_degrades() -> anyhow::Result<()> {
    let mock = MockAiProvider::new();
    let pipeline = pipeline(FakeOcrEngine::failing(), FakeSpeechRecognizer::failing(), &mock);

    let result = pipeline.process_voice_text("two apples".to_string()).await;

    assert_eq!(result.raw_text, "two apples");
    assert!(result.items.is_empty());
    assert_eq!(result.total, 0.0);
    assert!(matches!(result.extraction, ExtractionStatus::Degraded { .. }));
    Ok(())
}
