use crate::db::schema::Database;
use crate::feed::parser::ParsedFeed;
use std::fmt::Write as _;

pub const WILDCARD_SELECTOR: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCount {
  pub source: String,
  pub records: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
  Increase,
  Decrease,
  Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDelta {
  pub previous: usize,
  pub current: usize,
  pub change: i64,
  pub kind: DeltaKind,
}

/// Aggregate statistics over one sync, derived purely from the parsed feed
/// and the two snapshots. Computing a report never fails and writes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
  /// Records per originating source, descending; ties keep the order in
  /// which a source was first seen in the feed.
  pub source_counts: Vec<SourceCount>,
  /// Persisted package count after this sync.
  pub current_packages: usize,
  /// `None` on the first sync.
  pub delta: Option<PackageDelta>,
  /// Among the previous snapshot's packages, how many listed only the
  /// wildcard selector. `None` on the first sync.
  pub wildcard_migrated: Option<usize>,
  pub skipped_rows: usize,
}

pub fn compute_drift(
  parsed: &ParsedFeed,
  previous: Option<&Database>,
  next: &Database,
) -> DriftReport {
  DriftReport {
    source_counts: count_sources(parsed),
    current_packages: next.packages.len(),
    delta: previous.map(|p| package_delta(p.packages.len(), next.packages.len())),
    wildcard_migrated: previous.map(count_wildcard_only),
    skipped_rows: parsed.skipped_rows,
  }
}

fn count_sources(parsed: &ParsedFeed) -> Vec<SourceCount> {
  let mut counts: Vec<SourceCount> = Vec::new();

  for record in &parsed.records {
    for source in &record.sources {
      match counts.iter_mut().find(|c| &c.source == source) {
        Some(entry) => entry.records += 1,
        None => counts.push(SourceCount {
          source: source.clone(),
          records: 1,
        }),
      }
    }
  }

  // Stable sort keeps first-seen order among equal counts.
  counts.sort_by(|a, b| b.records.cmp(&a.records));
  counts
}

fn package_delta(previous: usize, current: usize) -> PackageDelta {
  let change = current as i64 - previous as i64;
  let kind = match change {
    c if c > 0 => DeltaKind::Increase,
    c if c < 0 => DeltaKind::Decrease,
    _ => DeltaKind::Unchanged,
  };
  PackageDelta {
    previous,
    current,
    change,
    kind,
  }
}

/// Entries whose version list is exactly the single wildcard selector. The
/// current feed pins explicit versions, so these count as "previously
/// unresolved, now resolved".
fn count_wildcard_only(previous: &Database) -> usize {
  previous
    .packages
    .iter()
    .filter(|p| p.affected_versions.len() == 1 && p.affected_versions[0] == WILDCARD_SELECTOR)
    .count()
}

impl DriftReport {
  /// Operator-facing summary printed after a successful sync.
  pub fn render(&self) -> String {
    let mut out = String::new();

    match &self.delta {
      Some(delta) => {
        let _ = writeln!(
          out,
          "Packages: {} (previous {}, {})",
          delta.current,
          delta.previous,
          describe_change(delta)
        );
      }
      None => {
        let _ = writeln!(out, "Packages: {} (first sync)", self.current_packages);
      }
    }

    if self.source_counts.is_empty() {
      out.push_str("Sources: none attributed\n");
    } else {
      let listed: Vec<String> = self
        .source_counts
        .iter()
        .map(|c| format!("{} ({})", c.source, c.records))
        .collect();
      let _ = writeln!(out, "Sources: {}", listed.join(", "));
    }

    if let Some(migrated) = self.wildcard_migrated {
      let _ = writeln!(out, "Wildcard-only entries resolved to explicit versions: {migrated}");
    }

    let _ = writeln!(out, "Malformed feed rows skipped: {}", self.skipped_rows);
    out
  }
}

fn describe_change(delta: &PackageDelta) -> String {
  match delta.kind {
    DeltaKind::Increase => format!("+{}", delta.change),
    DeltaKind::Decrease => delta.change.to_string(),
    DeltaKind::Unchanged => "unchanged".to_string(),
  }
}
