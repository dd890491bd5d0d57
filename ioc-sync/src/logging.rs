use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// Dropping the guard flushes the non-blocking writer; it must outlive the sync.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_NAME: &str = "ioc-sync.log";

/// Brings up the daily-rolling file appender plus a stderr layer, pruning log
/// files older than the retention window first.
pub fn init(log_dir: &Path, level: &str, retention_days: u64) -> anyhow::Result<()> {
  fs::create_dir_all(log_dir)?;
  prune_old_logs(log_dir, retention_days);

  let (file_writer, guard) =
    tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME));
  let _ = FILE_GUARD.set(guard);

  let filter = tracing_subscriber::EnvFilter::try_new(level)
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_target(true),
    )
    .with(
      tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_target(true),
    )
    .init();

  Ok(())
}

/// Best-effort removal of rotated log files past the retention window.
/// A sync must never fail because housekeeping could not stat or delete a file.
fn prune_old_logs(log_dir: &Path, retention_days: u64) {
  if retention_days == 0 {
    return;
  }

  let cutoff = SystemTime::now()
    .checked_sub(Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60)))
    .unwrap_or(SystemTime::UNIX_EPOCH);

  let Ok(entries) = fs::read_dir(log_dir) else {
    return;
  };

  for entry in entries.flatten() {
    let name = entry.file_name();
    let name = name.to_string_lossy();
    if name != LOG_FILE_NAME && !name.starts_with("ioc-sync.log.") {
      continue;
    }

    let expired = entry
      .metadata()
      .and_then(|md| md.modified())
      .map(|modified| modified < cutoff)
      .unwrap_or(false);

    if expired {
      let _ = fs::remove_file(entry.path());
    }
  }
}
