pub mod config;
pub mod db;
pub mod drift;
pub mod feed;
pub mod logging;
pub mod merge;
pub mod paths;

use chrono::Utc;
use db::store::DatabaseStore;

/// Entry point behind `main`: loads config, brings up logging, runs one sync.
pub fn run() -> anyhow::Result<()> {
  let base = paths::base_dir();
  let cfg = config::load_or_create_default(&paths::config_path(&base))?;

  logging::init(&paths::logs_dir(&base), &cfg.logging.level, cfg.logging.retention_days)?;

  run_sync(&cfg)
}

/// One synchronization pass: fetch, parse, merge against the previous
/// snapshot, write once, report drift. The complete next database is built
/// in memory before anything touches disk, so a failure anywhere before the
/// final write leaves the previous file untouched.
pub fn run_sync(cfg: &config::Config) -> anyhow::Result<()> {
  tracing::info!(url = %cfg.feed.url, "fetching compromised package feed");
  let body = feed::fetch::fetch_feed(&cfg.feed)?;

  let parsed = feed::parser::parse_feed(&body);
  tracing::info!(
    records = parsed.records.len(),
    skipped = parsed.skipped_rows,
    "parsed feed"
  );

  let store = DatabaseStore::new(cfg.database.path.clone());
  let previous = store.load();

  let next = merge::merge_database(&parsed.records, previous.as_ref(), Utc::now(), &cfg.feed.url);
  let report = drift::compute_drift(&parsed, previous.as_ref(), &next);

  store.save(&next)?;
  tracing::info!(
    path = %store.path().display(),
    packages = next.packages.len(),
    "database written"
  );

  print!("{}", report.render());
  Ok(())
}
