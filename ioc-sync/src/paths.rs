use std::path::{Path, PathBuf};

/// Working directory for config and logs. The database location is its own
/// config value, so it can live inside a version-controlled checkout while
/// logs stay out of it.
pub fn base_dir() -> PathBuf {
  std::env::var_os("IOC_SYNC_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_path(base: &Path) -> PathBuf {
  base.join("config.toml")
}

pub fn logs_dir(base: &Path) -> PathBuf {
  base.join("logs")
}
