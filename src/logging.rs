//! Console + file logging behind the `log` facade.
//!
//! The terminal gets the requested level; `logs/poker_tracker.log` next to
//! the executable gets at least DEBUG.

use log::LevelFilter;
use simplelog::{
    format_description, ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::OpenOptions;

use crate::paths;

/// Installs the terminal and file loggers and a panic hook that logs panics.
///
/// A log file that cannot be opened leaves terminal logging only.
pub fn init(level: LevelFilter) {
    let mut builder = ConfigBuilder::new();
    builder
        .set_location_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_time_format_custom(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        ));
    let _ = builder.set_time_offset_to_local();
    let config = builder.build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    let path = paths::get_logs_dir().join("poker_tracker.log");
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => loggers.push(WriteLogger::new(level.max(LevelFilter::Debug), config, file)),
        Err(e) => eprintln!("Warning: cannot open log file {}: {}", path.display(), e),
    }

    if CombinedLogger::init(loggers).is_ok() {
        std::panic::set_hook(Box::new(|panic_info| {
            let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            let location = panic_info
                .location()
                .map(|l| format!(" at {}:{}", l.file(), l.line()))
                .unwrap_or_default();
            log::error!("PANIC: {}{}", msg, location);
        }));
    }
}

/// Maps `-v`/`-q` counts to a level filter.
pub fn level_from_flags(verbose: u8, quiet: u8) -> LevelFilter {
    match verbose as i16 - quiet as i16 {
        i16::MIN..=-2 => LevelFilter::Error,
        -1 => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
