//! Region Reader: one named region of one frame to raw text + confidence.

use image::RgbaImage;

use super::engine::OcrEngine;
use super::preprocess::preprocess_region;
use crate::config::{OcrConfig, RegionSpec};

/// Unparsed OCR output for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub text: String,
    /// 0.0 (nothing legible) to 1.0
    pub confidence: f32,
}

impl RawReading {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn unreadable() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

/// Reads a region of a frame. Never fails; problems become `unreadable()`.
pub trait ReadRegion {
    fn read(&self, frame: &RgbaImage, region: &RegionSpec) -> RawReading;
}

/// Preprocesses a crop and hands it to an OCR engine.
pub struct RegionReader<E> {
    engine: E,
    config: OcrConfig,
}

impl<E: OcrEngine> RegionReader<E> {
    pub fn new(engine: E, config: OcrConfig) -> Self {
        Self { engine, config }
    }
}

impl<E: OcrEngine> ReadRegion for RegionReader<E> {
    fn read(&self, frame: &RgbaImage, region: &RegionSpec) -> RawReading {
        let img = preprocess_region(frame, &region.rect, &self.config);
        if img.width() == 0 || img.height() == 0 {
            log::debug!("Region '{}' is empty after cropping", region.name);
            return RawReading::unreadable();
        }

        let lines = match self.engine.recognize(&img) {
            Ok(lines) => lines,
            Err(e) => {
                log::debug!("OCR failed for region '{}': {:#}", region.name, e);
                return RawReading::unreadable();
            }
        };

        let words: Vec<_> = lines.iter().flat_map(|l| l.words.iter()).collect();
        if words.is_empty() {
            return RawReading::unreadable();
        }
        let mean = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        RawReading::new(&text, mean / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldKind, RelativeRect};
    use crate::ocr::engine::{OcrLine, OcrWord};
    use anyhow::{anyhow, Result};
    use image::GrayImage;

    struct FixedEngine(Vec<OcrLine>);

    impl OcrEngine for FixedEngine {
        fn recognize(&self, _img: &GrayImage) -> Result<Vec<OcrLine>> {
            Ok(self.0.clone())
        }
    }

    struct FailingEngine;

    impl OcrEngine for FailingEngine {
        fn recognize(&self, _img: &GrayImage) -> Result<Vec<OcrLine>> {
            Err(anyhow!("tesseract exploded"))
        }
    }

    fn line(words: &[(&str, f32)]) -> OcrLine {
        let words: Vec<OcrWord> = words
            .iter()
            .map(|(t, c)| OcrWord { text: t.to_string(), confidence: *c })
            .collect();
        OcrLine {
            text: words.iter().map(|w| w.text.clone()).collect::<Vec<_>>().join(" "),
            confidence: 0.0,
            words,
        }
    }

    fn pot_region() -> RegionSpec {
        RegionSpec::new("pot", RelativeRect::new(0.25, 0.25, 0.5, 0.5), FieldKind::Money)
    }

    #[test]
    fn test_confidence_is_mean_word_confidence() {
        let reader = RegionReader::new(
            FixedEngine(vec![line(&[("Pot:", 60.0), ("$4.50", 100.0)])]),
            OcrConfig::default(),
        );
        let frame = RgbaImage::new(40, 40);
        let reading = reader.read(&frame, &pot_region());

        assert_eq!(reading.text, "Pot: $4.50");
        assert!((reading.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_engine_error_is_unreadable() {
        let reader = RegionReader::new(FailingEngine, OcrConfig::default());
        let reading = reader.read(&RgbaImage::new(40, 40), &pot_region());
        assert_eq!(reading, RawReading::unreadable());
    }

    #[test]
    fn test_empty_crop_is_unreadable() {
        let reader = RegionReader::new(FixedEngine(vec![line(&[("1", 99.0)])]), OcrConfig::default());
        let reading = reader.read(&RgbaImage::new(1, 1), &pot_region());
        assert_eq!(reading, RawReading::unreadable());
    }

    #[test]
    fn test_no_words_is_unreadable() {
        let reader = RegionReader::new(FixedEngine(Vec::new()), OcrConfig::default());
        let reading = reader.read(&RgbaImage::new(40, 40), &pot_region());
        assert_eq!(reading.confidence, 0.0);
        assert!(reading.text.is_empty());
    }
}
