use crate::shared::paths::{ensure_dir, get_log_dir};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Areas that get their own log file; everything else goes to `system.log`.
const AREAS: [&str; 3] = ["tags", "files", "storage"];

/// Guards that must be kept alive to ensure logs are flushed
static LOGGING_GUARDS: OnceCell<Vec<WorkerGuard>> = OnceCell::new();

/// Multi-target writer that routes logs to different files based on target
struct AreaWriter {
    writers: HashMap<String, tracing_appender::non_blocking::NonBlocking>,
    system_writer: tracing_appender::non_blocking::NonBlocking,
}

impl<'a> MakeWriter<'a> for AreaWriter {
    type Writer = Box<dyn std::io::Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        Box::new(self.system_writer.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        let target = meta.target();

        for (area, writer) in &self.writers {
            if target == area || target.starts_with(&format!("{}::", area)) {
                return Box::new(writer.clone());
            }
        }

        Box::new(self.system_writer.clone())
    }
}

/// Initialize per-area rolling log files under the default log directory.
pub fn init_logging() -> std::io::Result<()> {
    init_logging_in(&get_log_dir())
}

/// Initialize logging into `log_dir`. Calling it twice is a no-op.
pub fn init_logging_in(log_dir: &Path) -> std::io::Result<()> {
    if LOGGING_GUARDS.get().is_some() {
        return Ok(());
    }

    ensure_dir(log_dir)?;

    let mut guards = Vec::new();
    let mut writers = HashMap::new();

    for area in AREAS {
        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, log_dir, format!("{}.log", area));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        writers.insert(area.to_string(), non_blocking);
        guards.push(guard);
    }

    let system_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "system.log");
    let (system_writer, system_guard) = tracing_appender::non_blocking(system_appender);
    guards.push(system_guard);

    let writer = AreaWriter {
        writers,
        system_writer,
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let _ = LOGGING_GUARDS.set(guards);

    tracing::info!(target: "system", "Logging initialized at {:?}", log_dir);

    Ok(())
}

