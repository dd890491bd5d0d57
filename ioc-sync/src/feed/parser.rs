use crate::db::schema::Severity;

/// Every record published by the current feed is a confirmed worm
/// compromise, so the parser stamps one fixed severity. Per-row severity is
/// an extension point of the database schema, not of the feed format.
pub const FEED_SEVERITY: Severity = Severity::Critical;

/// One parsed feed row. `sources` is transient: it feeds provenance and the
/// drift report but is dropped from the persisted package entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRecord {
  pub name: String,
  pub severity: Severity,
  pub affected_versions: Vec<String>,
  pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
  pub records: Vec<PackageRecord>,
  /// Data rows discarded for a missing name or empty version list. Blank
  /// lines are not counted.
  pub skipped_rows: usize,
}

/// Parses the raw feed text into package records.
///
/// Rows look like `name,versions,sources` where `versions` and `sources` are
/// comma-separated lists that may be double-quoted to embed literal commas.
/// The first row is a header and is always skipped. Pure: no state is carried
/// between calls.
pub fn parse_feed(text: &str) -> ParsedFeed {
  let mut parsed = ParsedFeed::default();

  for line in text.lines().skip(1) {
    if line.trim().is_empty() {
      continue;
    }

    let fields = split_quoted(line);
    let name = fields.first().cloned().unwrap_or_default();
    let affected_versions = fields.get(1).map(|f| split_list(f)).unwrap_or_default();
    let sources = fields.get(2).map(|f| split_list(f)).unwrap_or_default();

    // A structurally incomplete row must never enter the database.
    if name.is_empty() || affected_versions.is_empty() {
      parsed.skipped_rows += 1;
      continue;
    }

    parsed.records.push(PackageRecord {
      name,
      severity: FEED_SEVERITY,
      affected_versions,
      sources,
    });
  }

  parsed
}

/// Splits on commas outside double quotes. A quote toggles quoted mode and is
/// never emitted as content; every field is trimmed.
fn split_quoted(text: &str) -> Vec<String> {
  let mut fields = Vec::new();
  let mut current = String::new();
  let mut in_quotes = false;

  for ch in text.chars() {
    match ch {
      '"' => in_quotes = !in_quotes,
      ',' if !in_quotes => {
        fields.push(current.trim().to_string());
        current.clear();
      }
      _ => current.push(ch),
    }
  }
  fields.push(current.trim().to_string());
  fields
}

fn split_list(field: &str) -> Vec<String> {
  split_quoted(field)
    .into_iter()
    .filter(|item| !item.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const HEADER: &str = "package,affected_versions,sources\n";

  #[test]
  fn quoted_versions_keep_embedded_commas_together() {
    let text = format!("{HEADER}pkg-a,\"1.0.0,1.0.1\",vendorX\n");
    let parsed = parse_feed(&text);

    assert_eq!(parsed.records.len(), 1);
    let rec = &parsed.records[0];
    assert_eq!(rec.name, "pkg-a");
    assert_eq!(rec.affected_versions, vec!["1.0.0", "1.0.1"]);
    assert_eq!(rec.sources, vec!["vendorX"]);
    assert_eq!(rec.severity, Severity::Critical);
  }

  #[test]
  fn header_is_always_skipped() {
    let parsed = parse_feed("package,affected_versions,sources\n");
    assert!(parsed.records.is_empty());
    assert_eq!(parsed.skipped_rows, 0);
  }

  #[test]
  fn rows_missing_name_or_versions_are_dropped_and_counted() {
    let text = format!("{HEADER},1.0.0,vendorX\npkg-b,,vendorX\npkg-c,2.0.0,vendorY\n");
    let parsed = parse_feed(&text);

    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].name, "pkg-c");
    assert_eq!(parsed.skipped_rows, 2);
  }

  #[test]
  fn blank_lines_are_skipped_silently() {
    let text = format!("{HEADER}\n   \npkg-a,1.0.0,vendorX\n\n");
    let parsed = parse_feed(&text);

    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.skipped_rows, 0);
  }

  #[test]
  fn missing_sources_field_yields_empty_sources() {
    let text = format!("{HEADER}pkg-a,1.0.0\n");
    let parsed = parse_feed(&text);

    assert_eq!(parsed.records.len(), 1);
    assert!(parsed.records[0].sources.is_empty());
  }

  #[test]
  fn fields_beyond_the_third_are_ignored() {
    let text = format!("{HEADER}pkg-a,1.0.0,vendorX,extra,noise\n");
    let parsed = parse_feed(&text);

    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].sources, vec!["vendorX"]);
  }

  #[test]
  fn quoted_sources_split_like_versions() {
    let text = format!("{HEADER}pkg-a,\"*\",\"vendorX, vendorY\"\n");
    let parsed = parse_feed(&text);

    assert_eq!(parsed.records[0].affected_versions, vec!["*"]);
    assert_eq!(parsed.records[0].sources, vec!["vendorX", "vendorY"]);
  }

  #[test]
  fn whitespace_around_fields_is_trimmed() {
    let text = format!("{HEADER}  pkg-a , \"1.0.0, 1.0.1\" , vendorX \n");
    let parsed = parse_feed(&text);

    let rec = &parsed.records[0];
    assert_eq!(rec.name, "pkg-a");
    assert_eq!(rec.affected_versions, vec!["1.0.0", "1.0.1"]);
    assert_eq!(rec.sources, vec!["vendorX"]);
  }

  #[test]
  fn parsing_is_idempotent() {
    let text = format!("{HEADER}pkg-a,\"1.0.0,1.0.1\",vendorX\npkg-b,*,vendorY\n,bad,row\n");
    assert_eq!(parse_feed(&text), parse_feed(&text));
  }
}
