// Article records — the typed input boundary of the dedup engine.
//
// Upstream fetchers hand us JSON batches. Everything is validated here:
// a record without a url or title never reaches the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One normalized article from an RSS/Atom source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Name of the originating feed (maps to a configured tier).
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Canonical identifier for URL-level dedup.
    pub url: String,
    /// Unix seconds; used for recency ordering and lookback filtering.
    pub published_ts: u64,
}

impl Article {
    /// A record is usable only with a non-empty url and title.
    pub fn is_valid(&self) -> bool {
        !self.url.trim().is_empty() && !self.title.trim().is_empty()
    }
}

/// Parse a batch of articles from JSON.
///
/// Accepts either a bare array or a `{"articles": [...]}` envelope (the
/// shape emitted by fetch tooling). Individual malformed records are dropped
/// and counted, never propagated; only unparseable top-level JSON is an error.
///
/// Returns `(articles, dropped_count)`.
pub fn parse_batch(raw: &str) -> anyhow::Result<(Vec<Article>, usize)> {
    let value: Value = serde_json::from_str(raw)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("articles") {
            Some(Value::Array(items)) => items,
            _ => anyhow::bail!("expected a JSON array or an object with an \"articles\" array"),
        },
        _ => anyhow::bail!("expected a JSON array or an object with an \"articles\" array"),
    };

    let total = items.len();
    let mut articles = Vec::with_capacity(total);
    for item in items {
        match serde_json::from_value::<Article>(item) {
            Ok(a) if a.is_valid() => articles.push(a),
            Ok(a) => {
                warn!(url = %a.url, title = %a.title, "dropping article with empty url/title");
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed article record");
            }
        }
    }

    let dropped = total - articles.len();
    Ok((articles, dropped))
}

/// Keep only articles published within the last `hours` relative to `now`.
///
/// Articles with a future `published_ts` (feed clock skew) are kept.
pub fn filter_lookback(articles: Vec<Article>, now: u64, hours: u64) -> Vec<Article> {
    let window = hours * 3600;
    articles
        .into_iter()
        .filter(|a| now.saturating_sub(a.published_ts) <= window)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_array() {
        let raw = r#"[{"source":"CERT-FR","title":"Avis","url":"https://a.example/1","published_ts":100}]"#;
        let (articles, dropped) = parse_batch(raw).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(dropped, 0);
        assert_eq!(articles[0].summary, "");
    }

    #[test]
    fn parse_envelope() {
        let raw = r#"{"hours":24,"articles":[{"source":"NVD","title":"t","url":"u","published_ts":1}]}"#;
        let (articles, dropped) = parse_batch(raw).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn malformed_records_are_dropped_and_counted() {
        let raw = r#"[
            {"source":"s","title":"ok","url":"https://a.example/1","published_ts":100},
            {"source":"s","title":"","url":"https://a.example/2","published_ts":100},
            {"source":"s","title":"no url","published_ts":100},
            "not even an object"
        ]"#;
        let (articles, dropped) = parse_batch(raw).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(dropped, 3);
    }

    #[test]
    fn invalid_top_level_json_is_an_error() {
        assert!(parse_batch("not json").is_err());
        assert!(parse_batch(r#"{"no_articles_key":true}"#).is_err());
    }

    #[test]
    fn lookback_drops_old_keeps_recent_and_future() {
        let mk = |ts: u64| Article {
            source: "s".into(),
            title: "t".into(),
            summary: String::new(),
            url: format!("https://a.example/{ts}"),
            published_ts: ts,
        };
        let now = 100_000;
        let kept = filter_lookback(vec![mk(now - 3600), mk(now - 90_000), mk(now + 60)], now, 24);
        let urls: Vec<_> = kept.iter().map(|a| a.published_ts).collect();
        assert_eq!(urls, vec![now - 3600, now + 60]);
    }
}
