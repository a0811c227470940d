use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::OcrConfig;
use crate::paths;

/// Resolved tesseract installation.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets tesseract use its compiled-in tessdata location
    pub tessdata: Option<PathBuf>,
}

/// Per-user data directory for a portable tesseract copy.
pub fn get_user_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poker-hand-tracker")
        .join("tesseract")
}

fn executable_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

/// True when `program --version` runs and exits successfully.
fn runs_on_path(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Finds the tesseract executable: configured path, bundled copy next to
/// the executable, per-user copy, PATH, then common install locations.
pub fn find_tesseract_executable(config: &OcrConfig) -> Result<PathBuf> {
    if let Some(path) = &config.tesseract_path {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(anyhow!("Configured tesseract_path does not exist: {}", path.display()));
    }

    let exe = executable_name("tesseract");
    for dir in [paths::get_tesseract_dir(), get_user_tesseract_dir()] {
        let candidate = dir.join(&exe);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    if runs_on_path("tesseract") {
        return Ok(PathBuf::from("tesseract"));
    }

    let common_paths = [
        "/usr/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/opt/homebrew/bin/tesseract",
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    ];
    for path in &common_paths {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR or set ocr.tesseract_path."))
}

fn has_language(dir: &Path, language: &str) -> bool {
    dir.join(format!("{}.traineddata", language)).exists()
}

/// Finds a tessdata directory holding `<language>.traineddata`.
///
/// Returns `None` when nothing explicit is found so tesseract falls back to
/// its own default.
pub fn find_tessdata_dir(config: &OcrConfig) -> Option<PathBuf> {
    if let Some(dir) = &config.tessdata_dir {
        return Some(dir.clone());
    }

    let mut candidates = vec![
        paths::get_tesseract_dir().join("tessdata"),
        get_user_tesseract_dir().join("tessdata"),
    ];
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates.into_iter().find(|dir| has_language(dir, &config.language))
}

/// Resolves the full installation once at startup.
pub fn ensure_tesseract(config: &OcrConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config)?;
    let tessdata = find_tessdata_dir(config);
    log::info!(
        "Tesseract: {} (tessdata: {})",
        executable.display(),
        tessdata
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "default".to_string())
    );
    Ok(TesseractPaths { executable, tessdata })
}

/// Finds ffmpeg for video sampling.
pub fn find_ffmpeg() -> Result<PathBuf> {
    let bundled = paths::get_exe_dir().join(executable_name("ffmpeg"));
    if bundled.exists() {
        return Ok(bundled);
    }
    if runs_on_path("ffmpeg") {
        return Ok(PathBuf::from("ffmpeg"));
    }
    Err(anyhow!("ffmpeg not found. Install ffmpeg to process video files."))
}
