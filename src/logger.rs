use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

use crate::error::{Error, Result};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Settings handed to [`init`] by the binary. The library itself never installs a logger.
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub level: LevelFilter,
    /// Optional plain-text copy of everything written to the console.
    pub log_file: Option<PathBuf>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        LoggerOptions { level: LevelFilter::Info, log_file: None }
    }
}

impl LoggerOptions {
    /// Maps `-v`/`-q` counts onto a level filter, starting at `info`.
    pub fn from_verbosity(verbose: u8, quiet: bool, log_file: Option<PathBuf>) -> Self {
        let level = if quiet {
            LevelFilter::Warn
        } else {
            match verbose {
                0 => LevelFilter::Info,
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        };
        LoggerOptions { level, log_file }
    }
}

/// Initializes the global logger.
///
/// Should be called once at the very beginning of `main`. `RUST_LOG`, when set to a
/// plain level (`RUST_LOG=debug`), takes precedence over the level in `options`.
pub fn init(options: &LoggerOptions) -> Result<()> {
    let level = std::env::var("RUST_LOG").ok().and_then(|value| value.parse::<LevelFilter>().ok()).unwrap_or(options.level);

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console_config = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!("[{} {} {}] {}", Local::now().format(TIME_FORMAT), colors.color(record.level()), record.target(), message))
        })
        .chain(std::io::stderr());

    let mut base_config = Dispatch::new().level(level).level_for("glob", LevelFilter::Warn).chain(console_config);

    // A log file that cannot be opened still leaves console logging installed.
    let file_result = options.log_file.as_deref().map(open_log_file).transpose();
    let file_error = match file_result {
        Ok(Some(file_config)) => {
            base_config = base_config.chain(file_config);
            None
        }
        Ok(None) => None,
        Err(e) => Some(e),
    };

    base_config.apply().unwrap_or_else(|e| {
        eprintln!("Failed to apply logger configuration: {}", e);
    });

    match file_error {
        Some(e) => Err(e),
        None => {
            log::debug!("Logger initialized at level {}.", level);
            Ok(())
        }
    }
}

fn open_log_file(log_file_path: &Path) -> Result<Dispatch> {
    if let Some(dir) = log_file_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let file = fern::log_file(log_file_path).map_err(|e| Error::io(log_file_path, e))?;

    Ok(Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{} {} {}] {}", Local::now().format(TIME_FORMAT), record.level(), record.target(), message))
        })
        .chain(file))
}
