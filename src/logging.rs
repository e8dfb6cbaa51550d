use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::error::DownloadError;

/// Send all log records to an append-only file
///
/// Records from this crate pass at `level`; dependencies only at warn.
/// `RUST_LOG` still overrides both.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> Result<(), DownloadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_CRATE_NAME"), level)
        .parse_default_env()
        .target(Target::Pipe(Box::new(file)))
        .try_init()
        .map_err(|e| DownloadError::LoggerError(e.to_string()))
}
