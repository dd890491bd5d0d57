use crate::config::FeedConfig;
use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::header::{LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use std::io::Read;
use std::time::Duration;

/// Fetches the full feed body as text.
///
/// Redirects are followed manually, one `Location` hop at a time, because the
/// feed is served behind hosting that answers with 301/302 before the raw
/// file. Any other non-200 status is fatal. There is no cycle guard; a
/// redirect loop runs until the per-request timeout kills a hop.
pub fn fetch_feed(cfg: &FeedConfig) -> anyhow::Result<String> {
  let url = Url::parse(&cfg.url).with_context(|| format!("invalid feed URL: {}", cfg.url))?;

  let client = Client::builder()
    .timeout(Duration::from_secs(cfg.timeout_seconds))
    .redirect(Policy::none())
    .build()
    .context("build HTTP client")?;

  fetch_text(&client, url, cfg.max_feed_bytes)
}

fn fetch_text(client: &Client, mut url: Url, max_bytes: usize) -> anyhow::Result<String> {
  loop {
    let response = client
      .get(url.clone())
      .header(USER_AGENT, format!("IOC-Sync/{}", env!("CARGO_PKG_VERSION")))
      .send()
      .with_context(|| format!("GET {}", safe_url_label(&url)))?;

    let status = response.status();
    if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
      let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
          anyhow::anyhow!(
            "redirect from {} carries no usable Location header",
            safe_url_label(&url)
          )
        })?;

      // Location may be relative; resolve it against the URL that redirected.
      url = url
        .join(location)
        .with_context(|| format!("resolve redirect target {location}"))?;
      tracing::debug!(target = %safe_url_label(&url), "following feed redirect");
      continue;
    }

    if status.as_u16() != 200 {
      anyhow::bail!(
        "unexpected HTTP status {} {} for {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("<unknown>"),
        safe_url_label(&url)
      );
    }

    let bytes = read_response_with_limit(response, max_bytes)?;
    return String::from_utf8(bytes).context("feed body is not valid UTF-8");
  }
}

fn read_response_with_limit(response: Response, max_bytes: usize) -> anyhow::Result<Vec<u8>> {
  let mut out = Vec::new();
  let mut limited = response.take((max_bytes.saturating_add(1)) as u64);
  limited.read_to_end(&mut out).context("read response body")?;

  if out.len() > max_bytes {
    anyhow::bail!("feed body exceeds max size {} bytes", max_bytes);
  }

  Ok(out)
}

fn safe_url_label(url: &Url) -> String {
  let host = url.host_str().unwrap_or("<no-host>");
  let mut path = url.path().to_string();
  if path.is_empty() {
    path = "/".to_string();
  }
  format!("{host}{path}")
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn cfg(url: String) -> FeedConfig {
    FeedConfig {
      url,
      timeout_seconds: 5,
      max_feed_bytes: 1024 * 1024,
    }
  }

  #[test]
  fn follows_a_single_redirect_to_the_target_body() {
    // Blocking reqwest must run outside the tokio context, so the mock
    // server lives on its own runtime.
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
      Mock::given(method("GET"))
        .and(path("/feed.csv"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/moved/feed.csv"))
        .expect(1)
        .mount(&server)
        .await;
      Mock::given(method("GET"))
        .and(path("/moved/feed.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("package,versions,sources\npkg-a,1.0.0,vendorX\n"))
        .expect(1)
        .mount(&server)
        .await;
    });

    let body = fetch_feed(&cfg(format!("{}/feed.csv", server.uri()))).unwrap();
    assert_eq!(body, "package,versions,sources\npkg-a,1.0.0,vendorX\n");

    rt.block_on(server.verify());
  }

  #[test]
  fn non_success_status_is_a_transport_error_with_the_code() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
      Mock::given(method("GET"))
        .and(path("/feed.csv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server),
    );

    let err = fetch_feed(&cfg(format!("{}/feed.csv", server.uri()))).unwrap_err();
    assert!(err.to_string().contains("404"), "error should carry the status code: {err}");
  }

  #[test]
  fn redirect_without_location_is_an_error() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
      Mock::given(method("GET"))
        .and(path("/feed.csv"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&server),
    );

    let err = fetch_feed(&cfg(format!("{}/feed.csv", server.uri()))).unwrap_err();
    assert!(err.to_string().contains("Location"), "unexpected error: {err}");
  }

  #[test]
  fn oversized_body_is_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
      Mock::given(method("GET"))
        .and(path("/feed.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
        .mount(&server),
    );

    let mut small = cfg(format!("{}/feed.csv", server.uri()));
    small.max_feed_bytes = 16;
    let err = fetch_feed(&small).unwrap_err();
    assert!(err.to_string().contains("max size"), "unexpected error: {err}");
  }
}
