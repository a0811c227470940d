use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;

/// Represents a line of OCR text with confidence score (0-100)
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// Represents a single word from OCR with confidence score (0-100)
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

/// An OCR primitive that turns a preprocessed image into text lines.
pub trait OcrEngine: Send {
    fn recognize(&self, img: &GrayImage) -> Result<Vec<OcrLine>>;
}

/// Runs the tesseract CLI with TSV output.
pub struct TesseractEngine {
    paths: TesseractPaths,
    language: String,
    psm: u8,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths, language: &str, psm: u8) -> Self {
        Self {
            paths,
            language: language.to_string(),
            psm,
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, img: &GrayImage) -> Result<Vec<OcrLine>> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        // Tesseract appends .tsv to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut command = Command::new(&self.paths.executable);
        command.arg(temp_input.path()).arg(&output_base);
        if let Some(tessdata) = &self.paths.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        let output = command
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output()
            .with_context(|| format!("Failed to run {}", self.paths.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_output(&tsv_content))
    }
}

fn finish_line(words: Vec<OcrWord>) -> Option<OcrLine> {
    if words.is_empty() {
        return None;
    }
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Some(OcrLine { text, words, confidence })
}

/// Parses Tesseract TSV output into lines of words.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Only level 5 (word) rows with a
/// non-negative confidence and non-empty text are kept.
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current_words: Vec<OcrWord> = Vec::new();

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }
        let text = fields[11].trim();
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        if current_key.is_some_and(|k| k != key) {
            lines.extend(finish_line(std::mem::take(&mut current_words)));
        }
        current_key = Some(key);

        current_words.push(OcrWord {
            text: text.to_string(),
            confidence: conf,
        });
    }

    lines.extend(finish_line(current_words));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_groups_words_into_lines() {
        let tsv = format!(
            "{}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t100\t20\t-1\t\n\
             5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t90.0\t$1,234\n\
             5\t1\t1\t1\t1\t2\t12\t0\t10\t10\t70.0\tchips\n\
             5\t1\t1\t1\t2\t1\t0\t12\t10\t10\t80.0\tFLOP\n",
            HEADER
        );
        let lines = parse_tsv_output(&tsv);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "$1,234 chips");
        assert_eq!(lines[0].words.len(), 2);
        assert!((lines[0].confidence - 80.0).abs() < 1e-3);
        assert_eq!(lines[1].text, "FLOP");
    }

    #[test]
    fn test_parse_tsv_skips_empty_and_negative_conf() {
        let tsv = format!(
            "{}\n\
             5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\tghost\n\
             5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t55\t \n",
            HEADER
        );
        assert!(parse_tsv_output(&tsv).is_empty());
    }

    #[test]
    fn test_parse_tsv_tolerates_short_rows() {
        let tsv = format!("{}\n5\t1\t1\n", HEADER);
        assert!(parse_tsv_output(&tsv).is_empty());
    }
}
