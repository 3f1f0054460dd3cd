//! # Receipt Endpoint Tests
//!
//! `POST /parse_receipt` with fake OCR and LLM collaborators, plus the real
//! OCR path failing on a missing binary.

mod common;

use anyhow::Result;
use common::TestApp;
use finovia::prompts::tasks::RECEIPT_EXTRACTION_SYSTEM_PROMPT;
use finovia_test_utils::{FakeOcrEngine, FakeSpeechRecognizer, MockAiProvider};
use reqwest::{multipart, StatusCode};
use serde_json::{json, Value};

const RECEIPT_TEXT: &str = "2 BANANA 1.50\nWATERMELON 4.00\nTOTAL 7.00";
const RECEIPT_JSON: &str = "```json\n[\n  {\"item\": \"BANANA\", \"quantity\": 2, \"unit\": null, \"price\": 1.50},\n  {\"item\": \"WATERMELON\", \"quantity\": 1, \"unit\": null, \"price\": 4.00}\n]\n```";

async fn app_with_receipt(ai: MockAiProvider) -> Result<TestApp> {
    TestApp::spawn_with_fakes(
        FakeOcrEngine::with_text(RECEIPT_TEXT),
        FakeSpeechRecognizer::silent(),
        ai,
    )
    .await
}

#[tokio::test]
async fn test_parse_receipt_returns_items_and_total() -> Result<()> {
    // Arrange
    let ai = MockAiProvider::new();
    ai.add_response(RECEIPT_EXTRACTION_SYSTEM_PROMPT, RECEIPT_JSON);
    let app = app_with_receipt(ai.clone()).await?;

    // Act
    let response = app
        .post_file("/parse_receipt", "receipt.jpg", b"\xff\xd8\xff\xe0 fake jpeg")
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["raw_text"], RECEIPT_TEXT);
    assert_eq!(body["total"].as_f64(), Some(7.0));
    assert_eq!(body["extraction"], json!({"status": "ok"}));
    assert_eq!(
        body["items"],
        json!([
            {"item": "BANANA", "quantity": 2, "unit": null, "price": 1.5},
            {"item": "WATERMELON", "quantity": 1, "unit": null, "price": 4.0}
        ])
    );

    let saved = app.upload_root.join("ocr_images").join("receipt.jpg");
    assert_eq!(body["image"], saved.display().to_string());
    assert_eq!(std::fs::read(&saved)?, b"\xff\xd8\xff\xe0 fake jpeg");

    let calls = ai.get_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.contains(RECEIPT_TEXT));
    Ok(())
}

#[tokio::test]
async fn test_parse_receipt_without_file_part() -> Result<()> {
    let app = app_with_receipt(MockAiProvider::new()).await?;
    let form = multipart::Form::new().text("note", "no image here");

    let response = app
        .client
        .post(format!("{}/parse_receipt", app.address))
        .multipart(form)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"error": "No file uploaded"}));
    Ok(())
}

#[tokio::test]
async fn test_parse_receipt_with_non_multipart_body() -> Result<()> {
    let app = app_with_receipt(MockAiProvider::new()).await?;

    let response = app
        .client
        .post(format!("{}/parse_receipt", app.address))
        .json(&json!({"file": "receipt.jpg"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "No file uploaded");
    Ok(())
}

#[tokio::test]
async fn test_parse_receipt_with_empty_filename() -> Result<()> {
    let app = app_with_receipt(MockAiProvider::new()).await?;

    let response = app.post_file("/parse_receipt", "", b"bytes").await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"error": "Empty filename"}));
    assert!(!app.upload_root.join("ocr_images").exists());
    Ok(())
}

#[tokio::test]
async fn test_parse_receipt_llm_failure_is_degraded() -> Result<()> {
    // No response programmed: every AI call fails.
    let app = app_with_receipt(MockAiProvider::new()).await?;

    let response = app.post_file("/parse_receipt", "receipt.png", b"png").await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["raw_text"], RECEIPT_TEXT);
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["total"].as_f64(), Some(0.0));
    assert_eq!(body["extraction"]["status"], "degraded");
    assert!(body["extraction"]["reason"]
        .as_str()
        .is_some_and(|r| r.contains("AI provider request failed")));
    Ok(())
}

#[tokio::test]
async fn test_parse_receipt_ocr_failure_is_degraded() -> Result<()> {
    // The configured OCR binary does not exist.
    let app = TestApp::spawn().await?;
    let chat = app.mock_chat_response("[]").await;

    let response = app.post_file("/parse_receipt", "receipt.jpg", b"jpeg").await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["raw_text"], "");
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["total"].as_f64(), Some(0.0));
    assert_eq!(body["extraction"]["status"], "degraded");
    assert!(body["extraction"]["reason"]
        .as_str()
        .is_some_and(|r| r.starts_with("text extraction failed")));
    // The LLM is never asked about empty text.
    assert_eq!(chat.hits_async().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_parse_receipt_path_components_are_stripped() -> Result<()> {
    let ai = MockAiProvider::new();
    ai.add_response(RECEIPT_EXTRACTION_SYSTEM_PROMPT, "[]");
    let app = app_with_receipt(ai).await?;

    let response = app
        .post_file("/parse_receipt", "../../escape.jpg", b"jpeg")
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.upload_root.join("ocr_images").join("escape.jpg").exists());
    Ok(())
}

#[tokio::test]
async fn test_parse_receipt_rejects_oversized_upload() -> Result<()> {
    let ai = MockAiProvider::new();
    ai.add_response(RECEIPT_EXTRACTION_SYSTEM_PROMPT, RECEIPT_JSON);
    let app = app_with_receipt(ai.clone()).await?;
    let oversized = vec![0u8; common::TEST_UPLOAD_LIMIT * 2];

    let response = app
        .post_file("/parse_receipt", "huge.jpg", &oversized)
        .await?;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"error": "File too large"}));
    assert!(!app.upload_root.join("ocr_images").join("huge.jpg").exists());
    assert!(ai.get_calls().is_empty());
    Ok(())
}
