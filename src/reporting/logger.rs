//! Run logger
//!
//! Events go through a `tracing::Dispatch` owned by the logger rather than a
//! process-wide subscriber. Lines look like
//! `2026-10-19 14:03:11,512 - INFO - Renamed: a.jpg -> 90015098.jpg`.

use anyhow::{Context, Result};
use std::fmt::{self, Display};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

pub use tracing_subscriber::filter::LevelFilter;

/// Log file used when none is configured
pub const DEFAULT_LOG_FILE: &str = "hashrename.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Where run log lines go
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console: bool,
    /// Appended to, created if missing
    pub file: Option<PathBuf>,
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console: true,
            file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            level: LevelFilter::INFO,
        }
    }
}

/// `<timestamp> - <LEVEL> - <message>`
#[derive(Debug, Clone, Copy, Default)]
pub struct DashFormat;

impl<S, N> FormatEvent<S, N> for DashFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now();
        write!(
            writer,
            "{} - {} - ",
            now.format(TIMESTAMP_FORMAT),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Logger handed to every stage of a run
#[derive(Clone)]
pub struct RunLogger {
    dispatch: Dispatch,
}

impl RunLogger {
    /// Build a logger writing to stderr and/or a log file
    pub fn new(config: &LogConfig) -> Result<Self> {
        let console = config
            .console
            .then(|| tracing_subscriber::fmt::layer().event_format(DashFormat).with_writer(io::stderr));

        let file = match &config.file {
            Some(path) => {
                let handle = open_log_file(path)?;
                Some(
                    tracing_subscriber::fmt::layer()
                        .event_format(DashFormat)
                        .with_ansi(false)
                        .with_writer(Mutex::new(handle)),
                )
            }
            None => None,
        };

        let subscriber = tracing_subscriber::registry()
            .with(console.with_filter(config.level))
            .with(file.with_filter(config.level));

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// Logger writing formatted lines to an arbitrary writer
    pub fn with_writer<W>(make_writer: W, level: LevelFilter) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let layer = tracing_subscriber::fmt::layer()
            .event_format(DashFormat)
            .with_ansi(false)
            .with_writer(make_writer)
            .with_filter(level);

        Self {
            dispatch: Dispatch::new(tracing_subscriber::registry().with(layer)),
        }
    }

    /// Logger that drops everything
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    pub fn debug(&self, message: impl Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::debug!("{}", message));
    }

    pub fn info(&self, message: impl Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::info!("{}", message));
    }

    pub fn warn(&self, message: impl Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::warn!("{}", message));
    }

    pub fn error(&self, message: impl Display) {
        tracing::dispatcher::with_default(&self.dispatch, || tracing::error!("{}", message));
    }
}

impl fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLogger").finish_non_exhaustive()
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
