use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Config {
  pub feed: FeedConfig,
  pub database: DatabaseConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
  #[serde(default = "default_feed_url")]
  pub url: String,

  #[serde(default = "default_timeout_seconds")]
  pub timeout_seconds: u64,

  #[serde(default = "default_max_feed_bytes")]
  pub max_feed_bytes: usize,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      url: default_feed_url(),
      timeout_seconds: default_timeout_seconds(),
      max_feed_bytes: default_max_feed_bytes(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
  #[serde(default = "default_database_path")]
  pub path: PathBuf,
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      path: default_database_path(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_log_level")]
  pub level: String,

  #[serde(default = "default_retention_days")]
  pub retention_days: u64,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      retention_days: default_retention_days(),
    }
  }
}

fn default_feed_url() -> String {
  "https://raw.githubusercontent.com/wiz-sec/wiz-research-iocs/main/reports/shai-hulud/packages.csv"
    .to_string()
}

fn default_timeout_seconds() -> u64 {
  30
}

fn default_max_feed_bytes() -> usize {
  10 * 1024 * 1024
}

fn default_database_path() -> PathBuf {
  PathBuf::from("compromised-packages.json")
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_retention_days() -> u64 {
  14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
  #[serde(default)]
  pub feed: Option<FeedConfig>,

  #[serde(default)]
  pub database: Option<DatabaseConfig>,

  #[serde(default)]
  pub logging: Option<LoggingConfig>,
}

impl ConfigFile {
  fn normalize(self) -> Config {
    let mut cfg = Config::default();
    if let Some(feed) = self.feed {
      cfg.feed = feed;
    }
    if let Some(database) = self.database {
      cfg.database = database;
    }
    if let Some(logging) = self.logging {
      cfg.logging = logging;
    }
    cfg
  }
}

/// Loads the config, writing defaults when the file is missing. An
/// unparseable file is backed up and replaced with defaults rather than
/// blocking the sync.
pub fn load_or_create_default(path: &Path) -> anyhow::Result<Config> {
  let parent = path
    .parent()
    .ok_or_else(|| anyhow::anyhow!("config path has no parent: {}", path.display()))?;
  if !parent.as_os_str().is_empty() {
    fs::create_dir_all(parent)?;
  }

  if !path.exists() {
    let cfg = Config::default();
    write_atomic(path, &toml::to_string_pretty(&to_config_file(&cfg))?)?;
    return Ok(cfg);
  }

  let raw = fs::read_to_string(path)?;
  match toml::from_str::<ConfigFile>(&raw) {
    Ok(file) => Ok(file.normalize()),
    Err(e) => {
      let cfg = Config::default();
      let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
      let backup = path.with_file_name(format!(
        "{}.bad-{ts}",
        path.file_name().unwrap_or_default().to_string_lossy()
      ));
      let _ = fs::rename(path, &backup);
      write_atomic(path, &toml::to_string_pretty(&to_config_file(&cfg))?)?;
      eprintln!(
        "ioc-sync: invalid config at {} (backed up to {}): {e}",
        path.display(),
        backup.display()
      );
      Ok(cfg)
    }
  }
}

fn to_config_file(cfg: &Config) -> ConfigFile {
  ConfigFile {
    feed: Some(cfg.feed.clone()),
    database: Some(cfg.database.clone()),
    logging: Some(cfg.logging.clone()),
  }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
  let parent = path
    .parent()
    .ok_or_else(|| anyhow::anyhow!("file path has no parent: {}", path.display()))?;
  let parent = if parent.as_os_str().is_empty() {
    Path::new(".")
  } else {
    parent
  };

  let tmp = parent.join(format!(
    ".{}.tmp",
    path.file_name().unwrap_or_default().to_string_lossy()
  ));
  fs::write(&tmp, contents)?;
  fs::rename(&tmp, path)?;
  Ok(())
}
