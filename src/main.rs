//! Poker Hand Tracker
//!
//! Reads a poker table from recorded video, a frame directory, or a live
//! snapshot folder, segments the stream into hands and writes one record
//! per player per hand.

mod chips;
mod config;
mod logging;
mod ocr;
mod parse;
mod paths;
mod pipeline;
mod reconcile;
mod report;
mod segmentation;
mod state;
mod storage;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::config::{RegionRole, TrackerConfig};
use crate::pipeline::{
    run_batch, run_live, DirectorySource, FrameDiffer, FrameSource, HandProcessor, PauseSignal,
    RunSummary, StopSignal, VideoFileSource,
};
use crate::storage::{CsvHandStore, HandStore, SqliteHandStore};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Configuration file (default: config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database for hands and players
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Also write hands.csv and players.csv into this directory
    #[arg(long = "csv-dir", global = true)]
    csv_dir: Option<PathBuf>,
    /// Write a JSON report with all hands and statistics when done
    #[arg(long, global = true)]
    json: Option<PathBuf>,
    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Less log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Process a recorded video file or a directory of frames
    Batch { input: PathBuf },
    /// Follow a folder that a recorder keeps writing snapshots into
    Live {
        #[arg(long = "frames-dir")]
        frames_dir: PathBuf,
        /// Stop after this many seconds (otherwise press Enter or type q)
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Check that tesseract and ffmpeg can be found
    Check,
    /// Write the default configuration to a file
    InitConfig { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = paths::ensure_directories() {
        eprintln!("Warning: failed to create output directories: {}", e);
    }
    logging::init(logging::level_from_flags(cli.verbose, cli.quiet));

    let result = run(&cli);
    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    result
}

fn run(cli: &Cli) -> Result<()> {
    if let Command::InitConfig { path } = &cli.command {
        TrackerConfig::save_default(path)?;
        log::info!("Default configuration written to {}", path.display());
        return Ok(());
    }

    let config_path = cli.config.clone().unwrap_or_else(TrackerConfig::default_path);
    let config = TrackerConfig::load(&config_path)?;

    match &cli.command {
        Command::Check => check(&config),
        Command::Batch { input } => {
            let mut source = open_batch_source(input, &config)?;
            let mut processor = build_processor(cli, &config)?;
            let summary = run_batch(source.as_mut(), &mut processor, &StopSignal::new());
            finish(cli, &processor, &summary)
        }
        Command::Live {
            frames_dir,
            duration,
        } => {
            let mut source = DirectorySource::follow(frames_dir)?;
            let mut processor = build_processor(cli, &config)?;
            let stop = StopSignal::new();
            let pause = PauseSignal::new();
            spawn_controls(&stop, &pause, *duration);

            log::info!(
                "Following {} (Enter or q to stop, p to pause, r to resume)",
                frames_dir.display()
            );
            let summary = run_live(
                &mut source,
                &mut processor,
                &config.capture,
                differ_for(&config),
                &stop,
                &pause,
            );
            finish(cli, &processor, &summary)
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

fn check(config: &TrackerConfig) -> Result<()> {
    let tesseract = ocr::ensure_tesseract(&config.ocr)?;
    log::info!("tesseract: {}", tesseract.executable.display());
    match &tesseract.tessdata {
        Some(dir) => log::info!("tessdata: {}", dir.display()),
        None => log::info!("tessdata: tesseract default"),
    }
    match ocr::setup::find_ffmpeg() {
        Ok(ffmpeg) => log::info!("ffmpeg: {}", ffmpeg.display()),
        Err(e) => log::warn!("ffmpeg not available, video input disabled: {:#}", e),
    }
    log::info!("{} regions configured", config.regions.len());
    Ok(())
}

fn open_batch_source(input: &Path, config: &TrackerConfig) -> Result<Box<dyn FrameSource>> {
    let capture = &config.capture;
    if input.is_dir() {
        // Frame directories are treated as 30 fps recordings
        let interval_ms = (1000.0 / capture.video_sampling_fps()).round() as u64;
        let source = DirectorySource::new(input, capture.sample_every_n_frames, interval_ms)?;
        Ok(Box::new(source))
    } else if input.is_file() {
        let source = VideoFileSource::open(input, capture.video_sampling_fps())?;
        Ok(Box::new(source))
    } else {
        Err(anyhow!("Input not found: {}", input.display()))
    }
}

fn build_processor(
    cli: &Cli,
    config: &TrackerConfig,
) -> Result<HandProcessor<ocr::RegionReader<ocr::TesseractEngine>>> {
    let reader = ocr::tesseract_reader(&config.ocr)?;

    let db_path = cli.db.clone().unwrap_or_else(paths::get_default_db_path);
    let mut stores: Vec<Box<dyn HandStore>> = vec![Box::new(SqliteHandStore::open(&db_path)?)];
    log::info!("Database: {}", db_path.display());
    if let Some(dir) = &cli.csv_dir {
        stores.push(Box::new(CsvHandStore::open(dir)?));
        log::info!("CSV output: {}", dir.display());
    }

    Ok(HandProcessor::new(reader, config, Box::new(stores)))
}

/// Differencing looks at the regions that are actually read.
fn differ_for(config: &TrackerConfig) -> FrameDiffer {
    let rects = config
        .regions
        .iter()
        .filter(|r| !matches!(r.role(), Some(RegionRole::SeatCards(_) | RegionRole::CommunityCards)))
        .map(|r| r.rect)
        .collect();
    FrameDiffer::new(rects, config.capture.diff_threshold)
}

/// Reads console commands until a stop or the end of input: `p` pauses,
/// `r` resumes, an empty line or `q` stops.
fn watch_console(input: impl BufRead, stop: &StopSignal, pause: &PauseSignal) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Console input failed, commands disabled: {}", e);
                return;
            }
        };
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "q" | "quit" | "stop" => {
                log::info!("Stop requested");
                stop.request();
                return;
            }
            "p" | "pause" => {
                log::info!("Pause requested");
                pause.pause();
            }
            "r" | "resume" => {
                log::info!("Resume requested");
                pause.resume();
            }
            other => log::warn!("Unknown command '{}' (q, p, r)", other),
        }
    }
    log::info!("Console input closed; live capture runs until --duration or the process is killed");
}

/// Console commands on one thread, the `duration` timeout on another.
fn spawn_controls(stop: &StopSignal, pause: &PauseSignal, duration: Option<u64>) {
    let on_input = stop.clone();
    let pause = pause.clone();
    thread::spawn(move || watch_console(std::io::stdin().lock(), &on_input, &pause));

    if let Some(secs) = duration {
        let on_timeout = stop.clone();
        thread::spawn(move || {
            if !on_timeout.wait(Duration::from_secs(secs)) {
                log::info!("Capture duration of {}s reached", secs);
                on_timeout.request();
            }
        });
    }
}

fn finish<R: ocr::ReadRegion>(cli: &Cli, processor: &HandProcessor<R>, summary: &RunSummary) -> Result<()> {
    log::info!("Run finished: {}", summary);
    if summary.processor.storage_errors > 0 {
        log::warn!("{} storage writes failed", summary.processor.storage_errors);
    }

    if let Some(path) = &cli.json {
        let report = report::CaptureReport::new(processor.records(), processor.players());
        report::export_to_json(&report, path)
            .with_context(|| format!("Failed to export report to {}", path.display()))?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_closed_console_does_not_stop() {
        let stop = StopSignal::new();
        watch_console(Cursor::new(""), &stop, &PauseSignal::new());
        assert!(!stop.is_requested());
    }

    #[test]
    fn test_console_pause_resume_and_stop() {
        let stop = StopSignal::new();
        let pause = PauseSignal::new();

        watch_console(Cursor::new("p\n"), &stop, &pause);
        assert!(pause.is_paused());
        assert!(!stop.is_requested());

        watch_console(Cursor::new("R\nhello\n"), &stop, &pause);
        assert!(!pause.is_paused());
        assert!(!stop.is_requested());

        watch_console(Cursor::new("p\n\np\n"), &stop, &pause);
        assert!(stop.is_requested());
    }
}
