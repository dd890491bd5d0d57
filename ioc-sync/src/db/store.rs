use super::schema::Database;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and writes the persisted database at a caller-chosen location.
///
/// The path is injected at construction so tests (and future multi-feed
/// setups) can point a store anywhere without touching process-global state.
pub struct DatabaseStore {
  path: PathBuf,
}

impl DatabaseStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Returns the previously persisted database, or `None` when there is
  /// nothing usable. A missing or corrupt file must not block a sync; both
  /// cases fall back to first-run seeding in the merger.
  pub fn load(&self) -> Option<Database> {
    let raw = match fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        tracing::info!(path = %self.path.display(), "no existing database; treating as first sync");
        return None;
      }
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "failed to read existing database; treating as absent");
        return None;
      }
    };

    match serde_json::from_str::<Database>(&raw) {
      Ok(db) => Some(db),
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "existing database is not valid JSON; treating as absent");
        None
      }
    }
  }

  /// Serializes the database as pretty-printed JSON with a trailing newline
  /// and writes it atomically. The only durable effect of a sync.
  pub fn save(&self, db: &Database) -> anyhow::Result<()> {
    let mut raw = serde_json::to_string_pretty(db).context("serialize database")?;
    raw.push('\n');
    write_atomic(&self.path, &raw)
  }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
  let parent = path
    .parent()
    .ok_or_else(|| anyhow::anyhow!("database path has no parent: {}", path.display()))?;
  let parent = if parent.as_os_str().is_empty() {
    Path::new(".")
  } else {
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    parent
  };

  let tmp = parent.join(format!(
    ".{}.tmp",
    path.file_name().unwrap_or_default().to_string_lossy()
  ));
  fs::write(&tmp, contents).with_context(|| format!("write {}", tmp.display()))?;
  fs::rename(&tmp, path)
    .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::schema::{PackageEntry, Severity};

  fn sample_db() -> Database {
    let mut db = Database::default();
    db.last_updated = "2025-09-20T10:00:00.000Z".to_string();
    db.packages.push(PackageEntry {
      name: "left-pad-utils".to_string(),
      severity: Severity::Critical,
      affected_versions: vec!["1.2.3".to_string()],
    });
    db
  }

  #[test]
  fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatabaseStore::new(dir.path().join("compromised-packages.json"));

    store.save(&sample_db()).unwrap();
    let loaded = store.load().expect("database should load back");
    assert_eq!(loaded, sample_db());
  }

  #[test]
  fn saved_file_is_pretty_json_with_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatabaseStore::new(dir.path().join("compromised-packages.json"));

    store.save(&sample_db()).unwrap();
    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.ends_with("}\n"), "file must end with a single trailing newline");
    assert!(raw.contains("\n  \"version\""), "output should be indented");
    assert!(raw.contains("\"affectedVersions\""), "fields use the persisted camelCase names");
  }

  #[test]
  fn load_missing_file_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatabaseStore::new(dir.path().join("nope.json"));
    assert!(store.load().is_none());
  }

  #[test]
  fn load_corrupt_file_is_absent_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compromised-packages.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = DatabaseStore::new(path);
    assert!(store.load().is_none());
  }

  #[test]
  fn save_overwrites_prior_content() {
    let dir = tempfile::tempdir().unwrap();
    let store = DatabaseStore::new(dir.path().join("compromised-packages.json"));

    store.save(&sample_db()).unwrap();
    let mut next = sample_db();
    next.packages.clear();
    store.save(&next).unwrap();

    let loaded = store.load().unwrap();
    assert!(loaded.packages.is_empty());
  }
}
