//! Tracing subscriber setup: non-blocking stdout plus a daily rotated file under `log.dir`.

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Keeps the non-blocking writers alive; dropping it flushes pending lines.
pub struct LogGuards {
    _stdout: WorkerGuard,
    _file: WorkerGuard,
}

/// Daily rotated `nexus.<date>.log` files, pruned to `max_files` unless it is `0`.
pub fn file_appender(cfg: &LogConfig) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(&cfg.dir)?;
    let mut builder =
        RollingFileAppender::builder().rotation(Rotation::DAILY).filename_prefix("nexus").filename_suffix("log");
    if cfg.max_files > 0 {
        builder = builder.max_log_files(cfg.max_files);
    }
    Ok(builder.build(&cfg.dir)?)
}

/// Installs the global subscriber. `RUST_LOG` wins over `log.level` when set.
pub fn init(cfg: &LogConfig) -> anyhow::Result<LogGuards> {
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender(cfg)?);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .try_init()?;
    Ok(LogGuards { _stdout: stdout_guard, _file: file_guard })
}
