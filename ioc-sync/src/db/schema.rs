use serde::{Deserialize, Serialize};

pub const DEFAULT_DB_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

/// One entry of the persisted `packages` array. Reporting sources are
/// intentionally absent here; they only survive in `dataSource.sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
  pub name: String,
  pub severity: Severity,
  pub affected_versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSource {
  pub url: String,
  pub description: String,
  pub sources: Vec<String>,
  pub fetched_at: String,
}

impl Default for DataSource {
  fn default() -> Self {
    Self {
      url: String::new(),
      description: default_feed_description(),
      sources: Vec::new(),
      fetched_at: String::new(),
    }
  }
}

pub fn default_feed_description() -> String {
  "Aggregated vendor IOC feed of npm packages compromised by the Shai-Hulud worm".to_string()
}

/// Curated campaign narrative. Carried over verbatim across syncs; these
/// defaults only ever appear in a first-run database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttackInfo {
  pub name: String,
  pub alias: String,
  pub first_detected: String,
  pub description: String,
}

impl Default for AttackInfo {
  fn default() -> Self {
    Self {
      name: "Shai-Hulud npm supply chain attack".to_string(),
      alias: "Shai-Hulud".to_string(),
      first_detected: "2025-09-15".to_string(),
      description: "Self-replicating worm that trojanizes npm packages, harvests developer and CI credentials, and republishes itself through compromised maintainer accounts.".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Indicators {
  pub malicious_file_paths: Vec<String>,
  pub workflow_names: Vec<String>,
  pub file_hashes: Vec<FileHash>,
  pub github: GithubIndicators,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHash {
  pub sha256: String,
  pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubIndicators {
  pub branch_names: Vec<String>,
  pub repo_descriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Acknowledgement {
  pub name: String,
  pub url: String,
}

/// The persisted database root. Field order here is the serialization order,
/// which keeps the written JSON diffable across syncs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Database {
  pub version: String,
  pub last_updated: String,
  pub data_source: DataSource,
  pub attack_info: AttackInfo,
  pub indicators: Indicators,
  pub acknowledgements: Vec<Acknowledgement>,
  pub packages: Vec<PackageEntry>,
}

impl Default for Database {
  fn default() -> Self {
    Self {
      version: DEFAULT_DB_VERSION.to_string(),
      last_updated: String::new(),
      data_source: DataSource::default(),
      attack_info: AttackInfo::default(),
      indicators: Indicators::default(),
      acknowledgements: Vec::new(),
      packages: Vec::new(),
    }
  }
}
