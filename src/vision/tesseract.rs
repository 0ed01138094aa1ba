//! Tesseract OCR backend
//!
//! Pipes the frame as PNG into the `tesseract` command line tool and reads
//! its TSV report back. Word rows become elements, grouped into lines by
//! (block, paragraph, line) and into blocks by block number.

use async_trait::async_trait;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::ocr::{
    RecognitionError, TextBlock, TextDetection, TextElement, TextLine, TextRecognizer,
};
use crate::capture::CapturedFrame;

/// TSV `level` of word rows
const WORD_LEVEL: u32 = 5;

/// Recognizer backed by the tesseract executable
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        let binary = binary.into();
        let language = language.into();
        info!(
            "Using tesseract backend {:?} with language {}",
            binary, language
        );
        Self { binary, language }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, frame: &CapturedFrame) -> Result<TextDetection, RecognitionError> {
        let png = encode_png(frame)?;

        debug!(
            "tesseract: processing {}x{} {} frame ({} PNG bytes)",
            frame.width,
            frame.height,
            frame.source,
            png.len()
        );

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", self.language.as_str(), "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecognitionError::Unavailable(format!("{:?}: {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecognitionError::Failed("tesseract stdin unavailable".to_string()))?;
        stdin
            .write_all(&png)
            .await
            .map_err(|e| RecognitionError::Failed(format!("writing image to tesseract: {}", e)))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RecognitionError::Failed(format!("waiting for tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8(output.stdout)
            .map_err(|e| RecognitionError::MalformedOutput(e.to_string()))?;

        let detection = parse_tsv(&tsv)?;
        debug!(
            "tesseract: {} blocks, {} chars for {}",
            detection.blocks.len(),
            detection.char_count(),
            frame.source
        );
        Ok(detection)
    }
}

/// Encode a frame as PNG for the tesseract stdin reader
fn encode_png(frame: &CapturedFrame) -> Result<Vec<u8>, RecognitionError> {
    let mut png = Vec::new();
    frame
        .to_rgba_image()
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| RecognitionError::Failed(format!("encoding PNG: {}", e)))?;
    Ok(png)
}

/// One word row of the TSV report
struct WordRow {
    block: u32,
    line: (u32, u32, u32),
    element: TextElement,
}

/// Column positions looked up from the TSV header
struct Columns {
    level: usize,
    block: usize,
    paragraph: usize,
    line: usize,
    conf: usize,
    text: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, RecognitionError> {
        let names: Vec<&str> = header.split('\t').map(str::trim).collect();
        let find = |name: &str| {
            names.iter().position(|n| *n == name).ok_or_else(|| {
                RecognitionError::MalformedOutput(format!("TSV header lacks '{}' column", name))
            })
        };

        Ok(Self {
            level: find("level")?,
            block: find("block_num")?,
            paragraph: find("par_num")?,
            line: find("line_num")?,
            conf: find("conf")?,
            text: find("text")?,
        })
    }
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    row: usize,
) -> Result<T, RecognitionError> {
    fields
        .get(index)
        .and_then(|f| f.trim().parse().ok())
        .ok_or_else(|| {
            RecognitionError::MalformedOutput(format!("bad value in column {} of row {}", index, row))
        })
}

/// Parse a tesseract TSV report into blocks, lines and elements
pub fn parse_tsv(tsv: &str) -> Result<TextDetection, RecognitionError> {
    let mut rows = tsv.lines().enumerate();
    let (_, header) = rows
        .next()
        .ok_or_else(|| RecognitionError::MalformedOutput("empty TSV output".to_string()))?;
    let columns = Columns::from_header(header)?;

    let mut words = Vec::new();
    for (row, line) in rows {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();

        let level: u32 = parse_field(&fields, columns.level, row)?;
        if level != WORD_LEVEL {
            continue;
        }

        let text = fields.get(columns.text).map(|t| t.trim()).unwrap_or("");
        if text.is_empty() {
            continue;
        }

        let conf: f32 = parse_field(&fields, columns.conf, row)?;
        let confidence = (conf >= 0.0).then(|| (conf / 100.0).clamp(0.0, 1.0));

        let block: u32 = parse_field(&fields, columns.block, row)?;
        let paragraph: u32 = parse_field(&fields, columns.paragraph, row)?;
        let line_num: u32 = parse_field(&fields, columns.line, row)?;

        words.push(WordRow {
            block,
            line: (block, paragraph, line_num),
            element: TextElement::new(text, confidence),
        });
    }

    Ok(group_words(words))
}

/// Group consecutive word rows into lines and blocks, keeping report order
fn group_words(words: Vec<WordRow>) -> TextDetection {
    let mut grouped: Vec<(u32, Vec<((u32, u32, u32), Vec<TextElement>)>)> = Vec::new();

    for word in words {
        let new_block = grouped.last().map_or(true, |(b, _)| *b != word.block);
        if new_block {
            grouped.push((word.block, Vec::new()));
        }

        if let Some((_, lines)) = grouped.last_mut() {
            let new_line = lines.last().map_or(true, |(l, _)| *l != word.line);
            if new_line {
                lines.push((word.line, Vec::new()));
            }
            if let Some((_, elements)) = lines.last_mut() {
                elements.push(word.element);
            }
        }
    }

    let blocks = grouped
        .into_iter()
        .map(|(_, lines)| {
            TextBlock::from_lines(
                lines
                    .into_iter()
                    .map(|(_, elements)| TextLine::from_elements(elements))
                    .collect(),
            )
        })
        .collect();

    TextDetection::from_blocks(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn report(rows: &[&str]) -> String {
        let mut tsv = String::from(HEADER);
        for row in rows {
            tsv.push('\n');
            tsv.push_str(row);
        }
        tsv
    }

    #[test]
    fn test_parse_groups_blocks_and_lines() {
        let tsv = report(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t",
            "2\t1\t1\t0\t0\t0\t10\t10\t200\t40\t-1\t",
            "4\t1\t1\t1\t1\t0\t10\t10\t200\t20\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t10\t80\t20\t96.5\tTotal",
            "5\t1\t1\t1\t1\t2\t95\t10\t60\t20\t90\tdue",
            "5\t1\t1\t1\t2\t1\t10\t32\t70\t20\t80\t42.00",
            "2\t1\t2\t0\t0\t0\t10\t100\t200\t20\t-1\t",
            "5\t1\t2\t1\t1\t1\t10\t100\t90\t20\t70\tThanks",
        ]);

        let detection = parse_tsv(&tsv).unwrap();
        assert_eq!(detection.blocks.len(), 2);
        assert_eq!(detection.blocks[0].lines.len(), 2);
        assert_eq!(detection.blocks[0].lines[0].text, "Total due");
        assert_eq!(detection.text, "Total due\n42.00\nThanks");

        let first = &detection.blocks[0].lines[0].elements[0];
        assert!((first.confidence.unwrap() - 0.965).abs() < 1e-6);
    }

    #[test]
    fn test_negative_confidence_is_unreported() {
        let tsv = report(&["5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\tfaint"]);
        let detection = parse_tsv(&tsv).unwrap();
        assert_eq!(detection.blocks[0].lines[0].elements[0].confidence, None);
    }

    #[test]
    fn test_blank_words_are_skipped() {
        let tsv = report(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t95\t ",
            "5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t95\t",
        ]);
        let detection = parse_tsv(&tsv).unwrap();
        assert!(detection.blocks.is_empty());
        assert!(detection.text.is_empty());
    }

    #[test]
    fn test_header_only_is_empty_detection() {
        let detection = parse_tsv(HEADER).unwrap();
        assert_eq!(detection, TextDetection::default());
    }

    #[test]
    fn test_empty_output_is_malformed() {
        assert!(matches!(parse_tsv(""), Err(RecognitionError::MalformedOutput(_))));
    }

    #[test]
    fn test_bad_number_is_malformed() {
        let tsv = report(&["5\t1\tX\t1\t1\t1\t0\t0\t10\t10\t95\tword"]);
        assert!(matches!(parse_tsv(&tsv), Err(RecognitionError::MalformedOutput(_))));
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let tsv = "level\tblock_num\ttext\n5\t1\tword";
        assert!(matches!(parse_tsv(tsv), Err(RecognitionError::MalformedOutput(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let recognizer = TesseractRecognizer::new("/nonexistent/tesseract-binary", "eng");
        let frame = CapturedFrame::from_rgb(vec![255; 3 * 4], 2, 2, "CameraX").unwrap();

        let result = recognizer.recognize(&frame).await;
        assert!(matches!(result, Err(RecognitionError::Unavailable(_))));
    }
}
