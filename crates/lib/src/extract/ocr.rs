//! # OCR Engines
//!
//! An `OcrEngine` turns an image into recognized lines, each with a bounding
//! box and a confidence. The shipped engine drives the `tesseract` CLI.

use super::command;
use crate::errors::ExtractError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// The smallest box covering both `self` and `other`.
    pub fn union(self, other: BoundingBox) -> BoundingBox {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = (self.left + self.width as i32).max(other.left + other.width as i32);
        let bottom = (self.top + self.height as i32).max(other.top + other.height as i32);
        BoundingBox {
            left,
            top,
            width: (right - left).max(0) as u32,
            height: (bottom - top).max(0) as u32,
        }
    }
}

/// One line of recognized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub bbox: BoundingBox,
    pub text: String,
    /// Recognition confidence in `0.0..=1.0`.
    pub confidence: f32,
}

#[async_trait]
pub trait OcrEngine: Send + Sync + Debug {
    /// Recognizes text in the image at `image_path`, in reading order.
    async fn read_text(&self, image_path: &Path) -> Result<Vec<OcrLine>, ExtractError>;
}

/// Runs `tesseract <image> stdout -l <languages> tsv` and groups the word rows into lines.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    languages: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, languages: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.into(),
            timeout,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn read_text(&self, image_path: &Path) -> Result<Vec<OcrLine>, ExtractError> {
        let args = [
            image_path.as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&self.languages),
            OsStr::new("tsv"),
        ];
        let stdout = command::run(&self.binary, args, self.timeout).await?;
        let lines = parse_tsv(&String::from_utf8_lossy(&stdout))?;
        debug!(
            image = %image_path.display(),
            lines = lines.len(),
            "Tesseract recognized text"
        );
        Ok(lines)
    }
}

const WORD_LEVEL: u32 = 5;

// (page, block, paragraph, line)
type LineKey = (u32, u32, u32, u32);

/// One row of Tesseract's TSV output, matched to its header by name.
#[derive(Debug, Deserialize)]
struct TsvRow {
    level: u32,
    page_num: u32,
    block_num: u32,
    par_num: u32,
    line_num: u32,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    conf: f32,
    #[serde(default)]
    text: String,
}

struct LineBuilder {
    bbox: BoundingBox,
    words: Vec<String>,
    confidence_sum: f32,
}

/// Parses Tesseract's TSV output into lines.
///
/// Word rows (level 5) sharing page, block, paragraph and line numbers form
/// one line; rows with empty text or negative confidence are skipped.
pub fn parse_tsv(tsv: &str) -> Result<Vec<OcrLine>, ExtractError> {
    // Recognized text may contain quote characters, so quoting is off.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(tsv.as_bytes());

    let mut order: Vec<LineKey> = Vec::new();
    let mut lines: HashMap<LineKey, LineBuilder> = HashMap::new();

    for row in reader.deserialize::<TsvRow>() {
        let row = row?;
        if row.level != WORD_LEVEL || row.text.is_empty() || row.conf < 0.0 {
            continue;
        }

        let key = (row.page_num, row.block_num, row.par_num, row.line_num);
        let bbox = BoundingBox {
            left: row.left,
            top: row.top,
            width: row.width.max(0) as u32,
            height: row.height.max(0) as u32,
        };

        match lines.get_mut(&key) {
            Some(line) => {
                line.bbox = line.bbox.union(bbox);
                line.words.push(row.text);
                line.confidence_sum += row.conf;
            }
            None => {
                order.push(key);
                lines.insert(
                    key,
                    LineBuilder {
                        bbox,
                        words: vec![row.text],
                        confidence_sum: row.conf,
                    },
                );
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|key| lines.remove(&key))
        .map(|line| OcrLine {
            bbox: line.bbox,
            confidence: line.confidence_sum / line.words.len() as f32 / 100.0,
            text: line.words.join(" "),
        })
        .collect())
}
