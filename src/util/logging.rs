use std::path::Path;

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

/// Starts the file logger once per process. `RUST_LOG` overrides the level.
/// `duplicate` selects which records are mirrored to stderr.
pub fn init(log_dir: &Path, duplicate: Duplicate) -> anyhow::Result<()> {
    LOGGER.get_or_try_init(|| -> anyhow::Result<LoggerHandle> {
        std::fs::create_dir_all(log_dir)?;
        let handle = Logger::try_with_env_or_str("info")?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir)
                    .basename("pdf2audio")
                    .suffix("log"),
            )
            .rotate(
                Criterion::AgeOrSize(Age::Day, 5_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(7),
            )
            .duplicate_to_stderr(duplicate)
            .start()?;
        Ok(handle)
    })?;
    Ok(())
}
