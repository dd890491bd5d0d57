use crate::db::schema::{
  default_feed_description, Database, DataSource, PackageEntry, DEFAULT_DB_VERSION,
};
use crate::feed::parser::PackageRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::{BTreeSet, HashMap};

/// How one top-level database field is produced during a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
  /// Rebuilt from the current run regardless of prior content.
  Overwrite,
  /// Carried over verbatim from the previous database; seeded with a default
  /// when no previous database exists.
  PreserveOrSeed,
  /// Fully replaced by the freshly parsed feed records.
  ReplaceFromFeed,
}

/// Field-by-field merge policy, in persisted field order. `merge_database`
/// implements exactly this table; the tests hold the two together.
pub const MERGE_POLICY: &[(&str, MergeRule)] = &[
  ("version", MergeRule::PreserveOrSeed),
  ("lastUpdated", MergeRule::Overwrite),
  ("dataSource", MergeRule::Overwrite),
  ("attackInfo", MergeRule::PreserveOrSeed),
  ("indicators", MergeRule::PreserveOrSeed),
  ("acknowledgements", MergeRule::PreserveOrSeed),
  ("packages", MergeRule::ReplaceFromFeed),
];

pub fn rule_for(field: &str) -> Option<MergeRule> {
  MERGE_POLICY
    .iter()
    .find(|(name, _)| *name == field)
    .map(|(_, rule)| *rule)
}

/// Produces the next database snapshot from the parsed records and the
/// previous snapshot (if any). Pure with respect to `now`: callers pass the
/// sync timestamp in, so the result is fully determined by its arguments.
pub fn merge_database(
  records: &[PackageRecord],
  previous: Option<&Database>,
  now: DateTime<Utc>,
  feed_url: &str,
) -> Database {
  let seed = Database::default();
  let timestamp = iso_timestamp(now);

  Database {
    version: previous
      .map(|p| p.version.clone())
      .unwrap_or_else(|| DEFAULT_DB_VERSION.to_string()),
    last_updated: timestamp.clone(),
    data_source: DataSource {
      url: feed_url.to_string(),
      description: default_feed_description(),
      sources: union_sources(records),
      fetched_at: timestamp,
    },
    attack_info: previous
      .map(|p| p.attack_info.clone())
      .unwrap_or(seed.attack_info),
    indicators: previous
      .map(|p| p.indicators.clone())
      .unwrap_or(seed.indicators),
    acknowledgements: previous
      .map(|p| p.acknowledgements.clone())
      .unwrap_or(seed.acknowledgements),
    packages: collapse_packages(records),
  }
}

pub fn iso_timestamp(t: DateTime<Utc>) -> String {
  t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Sorted, duplicate-free union of every source seen across the new records.
fn union_sources(records: &[PackageRecord]) -> Vec<String> {
  let set: BTreeSet<&str> = records
    .iter()
    .flat_map(|r| r.sources.iter().map(String::as_str))
    .collect();
  set.into_iter().map(str::to_string).collect()
}

/// Reduces parsed records to persisted entries. A package reported by several
/// vendor rows collapses to one entry: the first occurrence keeps its
/// position in feed order and later version selectors are appended if new.
fn collapse_packages(records: &[PackageRecord]) -> Vec<PackageEntry> {
  let mut by_name: HashMap<&str, usize> = HashMap::new();
  let mut out: Vec<PackageEntry> = Vec::new();

  for record in records {
    match by_name.get(record.name.as_str()) {
      Some(&i) => {
        for version in &record.affected_versions {
          if !out[i].affected_versions.contains(version) {
            out[i].affected_versions.push(version.clone());
          }
        }
      }
      None => {
        by_name.insert(record.name.as_str(), out.len());
        out.push(PackageEntry {
          name: record.name.clone(),
          severity: record.severity,
          affected_versions: record.affected_versions.clone(),
        });
      }
    }
  }

  out
}
