// The digest a dedup run hands downstream: JSON for pipelines, Markdown
// for a human-readable file drop.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::article::Article;
use crate::dedup::DedupOutcome;
use crate::output::truncate_chars;

const SUMMARY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Serialize)]
pub struct Digest {
    pub count: usize,
    pub hours: u64,
    pub skipped_url: usize,
    pub skipped_topic: usize,
    pub articles: Vec<Article>,
}

impl Digest {
    pub fn new(outcome: DedupOutcome, hours: u64) -> Self {
        Self {
            count: outcome.kept.len(),
            hours,
            skipped_url: outcome.skipped_url,
            skipped_topic: outcome.skipped_topic,
            articles: outcome.kept,
        }
    }

    /// Render the full Markdown digest: timestamped header, filter counts,
    /// articles grouped by source.
    pub fn to_markdown(&self, generated_at: u64) -> String {
        let mut lines = vec![
            format!("# Veille technique - {} UTC", format_ts(generated_at)),
            String::new(),
            format!(
                "*{} articles ({}h) | {} filtres*",
                self.count,
                self.hours,
                self.skipped_url + self.skipped_topic
            ),
            String::new(),
        ];

        let mut by_source: BTreeMap<&str, Vec<&Article>> = BTreeMap::new();
        for article in &self.articles {
            by_source.entry(&article.source).or_default().push(article);
        }

        for (source, articles) in by_source {
            lines.push(format!("## {source}"));
            lines.push(String::new());
            for article in articles {
                lines.push(format!("- **[{}]({})**  ", article.title, article.url));
                lines.push(format!("  *{}*  ", format_ts(article.published_ts)));
                if !article.summary.trim().is_empty() {
                    lines.push(format!(
                        "  {}",
                        truncate_chars(article.summary.trim(), SUMMARY_PREVIEW_CHARS)
                    ));
                }
                lines.push(String::new());
            }
        }

        if self.articles.is_empty() {
            lines.push("Aucun article.".to_string());
        }

        lines.join("\n")
    }
}

fn format_ts(ts: u64) -> String {
    DateTime::<Utc>::from_timestamp(ts as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}
