pub mod engine;
pub mod preprocess;
pub mod reader;
pub mod setup;

pub use engine::{OcrEngine, OcrLine, OcrWord, TesseractEngine};
pub use reader::{RawReading, ReadRegion, RegionReader};
pub use setup::ensure_tesseract;

use anyhow::Result;

use crate::config::OcrConfig;

/// Builds the production region reader backed by the tesseract CLI.
pub fn tesseract_reader(config: &OcrConfig) -> Result<RegionReader<TesseractEngine>> {
    let paths = ensure_tesseract(config)?;
    let engine = TesseractEngine::new(paths, &config.language, config.psm);
    Ok(RegionReader::new(engine, config.clone()))
}
