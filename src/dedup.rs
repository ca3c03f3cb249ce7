// Batch deduplication orchestrator.
//
// One run walks the phases: purge stores, URL filter, single-link topic
// clustering, representative selection, persist. The result is invariant
// to input order: clustering is a transitive closure over pairwise scores
// and the representative pick is a total order (tier, published_ts, url).
// Store failures degrade to warnings; the batch is still returned.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::article::Article;
use crate::config::Config;
use crate::similarity;
use crate::store::{SeenEntry, TopicEntry, TtlStore};
use crate::text::{self, TextProfile};

#[derive(Debug, Clone, Copy, Default)]
pub struct DedupOptions {
    /// Drop articles whose URL is already in the seen store.
    pub filter_seen: bool,
    /// Collapse same-story articles via similarity clustering.
    pub filter_topic: bool,
    /// Skip the persist phase entirely (no store file is touched).
    pub dry_run: bool,
}

/// What a run returns: the kept articles plus explicit skip counters,
/// well-formed even under partial store failure.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub kept: Vec<Article>,
    pub skipped_url: usize,
    pub skipped_topic: usize,
}

struct Candidate {
    article: Article,
    profile: TextProfile,
    fingerprint: String,
    tier: u8,
}

/// Owns both stores for the duration of one run.
pub struct Deduplicator<'a> {
    seen: &'a mut TtlStore<SeenEntry>,
    topics: &'a mut TtlStore<TopicEntry>,
    config: &'a Config,
}

impl<'a> Deduplicator<'a> {
    pub fn new(
        seen: &'a mut TtlStore<SeenEntry>,
        topics: &'a mut TtlStore<TopicEntry>,
        config: &'a Config,
    ) -> Self {
        Self {
            seen,
            topics,
            config,
        }
    }

    pub fn run(&mut self, articles: Vec<Article>, options: &DedupOptions, now: u64) -> DedupOutcome {
        self.seen.purge(now);
        self.topics.purge(now);

        // URL filter. Kept URLs are marked immediately so a mirror of the
        // same URL later in the batch collapses too.
        let mut skipped_url = 0;
        let mut survivors = Vec::with_capacity(articles.len());
        for article in articles {
            if options.filter_seen && self.seen.is_present(&article.url, now) {
                debug!(url = %article.url, "already seen, skipping");
                skipped_url += 1;
                continue;
            }
            self.seen.mark(&article.url, SeenEntry { first_seen: now });
            survivors.push(article);
        }

        let mut skipped_topic = 0;
        let kept = if options.filter_topic {
            self.cluster_and_select(survivors, now, &mut skipped_topic)
        } else {
            survivors
        };

        if !options.dry_run {
            if let Err(e) = self.seen.save() {
                warn!(error = %e, "could not persist seen-URL store, results unaffected");
            }
            if let Err(e) = self.topics.save() {
                warn!(error = %e, "could not persist topic store, results unaffected");
            }
        }

        info!(
            kept = kept.len(),
            skipped_url, skipped_topic, "dedup run complete"
        );
        DedupOutcome {
            kept,
            skipped_url,
            skipped_topic,
        }
    }

    fn cluster_and_select(
        &mut self,
        articles: Vec<Article>,
        now: u64,
        skipped_topic: &mut usize,
    ) -> Vec<Article> {
        let candidates: Vec<Candidate> = articles
            .into_iter()
            .map(|article| {
                let profile = text::analyze(&article.title, &article.summary);
                let fingerprint = similarity::fingerprint(&profile);
                let tier = self.config.tier_for(&article.source);
                Candidate {
                    article,
                    profile,
                    fingerprint,
                    tier,
                }
            })
            .collect();

        // Single-link clustering: A~B and B~C puts A, B, C in one cluster
        // even if A and C alone score under the threshold.
        let threshold = self.config.topic_similarity_threshold;
        let mut links = UnionFind::new(candidates.len());
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let score = similarity::similarity(&candidates[i].profile, &candidates[j].profile);
                if score >= threshold {
                    links.union(i, j);
                }
            }
        }

        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for idx in 0..candidates.len() {
            clusters.entry(links.find(idx)).or_default().push(idx);
        }

        let mut keep = vec![false; candidates.len()];
        let mut new_representatives = Vec::new();
        for members in clusters.values() {
            // A fingerprint already in the topic store means the story was
            // reported on a previous run: the whole cluster goes.
            let already_reported = members.iter().any(|&i| {
                !candidates[i].fingerprint.is_empty()
                    && self.topics.is_present(&candidates[i].fingerprint, now)
            });
            if already_reported {
                *skipped_topic += members.len();
                continue;
            }

            // Highest authority wins, then the earliest report (the
            // original, not a later rehash). The url comparison only
            // breaks exact ties, keeping the pick deterministic.
            let Some(&representative) = members.iter().min_by(|&&a, &&b| {
                let (ca, cb) = (&candidates[a], &candidates[b]);
                ca.tier
                    .cmp(&cb.tier)
                    .then_with(|| ca.article.published_ts.cmp(&cb.article.published_ts))
                    .then_with(|| ca.article.url.cmp(&cb.article.url))
            }) else {
                continue;
            };
            *skipped_topic += members.len() - 1;
            keep[representative] = true;
            new_representatives.push(representative);
        }

        // Record each new story only after every cluster decision is made,
        // so in-run marks never influence the already-reported lookups.
        for idx in new_representatives {
            let candidate = &candidates[idx];
            if candidate.fingerprint.is_empty() {
                continue;
            }
            self.topics.mark(
                &candidate.fingerprint,
                TopicEntry {
                    first_seen: now,
                    tier: candidate.tier,
                    article: candidate.article.clone(),
                },
            );
        }

        candidates
            .into_iter()
            .zip(keep)
            .filter_map(|(c, kept)| kept.then_some(c.article))
            .collect()
    }
}

/// Direct write path into the URL store, bypassing the batch pipeline.
/// Returns how many URLs were newly recorded (the rest were already known).
pub fn mark_seen(store: &mut TtlStore<SeenEntry>, urls: &[String], now: u64) -> usize {
    store.purge(now);
    urls.iter()
        .filter(|url| store.mark(url, SeenEntry { first_seen: now }))
        .count()
}

/// Disjoint-set forest backing the transitive-closure clustering.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(source: &str, title: &str, url: &str, ts: u64) -> Article {
        Article {
            source: source.into(),
            title: title.into(),
            summary: String::new(),
            url: url.into(),
            published_ts: ts,
        }
    }

    fn stores(dir: &tempfile::TempDir) -> (TtlStore<SeenEntry>, TtlStore<TopicEntry>) {
        (
            TtlStore::load(dir.path().join("seen_urls.json"), 30),
            TtlStore::load(dir.path().join("topics.json"), 7),
        )
    }

    #[test]
    fn url_mirrors_collapse_within_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let (mut seen, mut topics) = stores(&dir);
        let config = Config::default_seed();
        let batch = vec![
            article("NVD", "Flaw in libfoo", "https://a.example/1", 100),
            article("Mirror", "Flaw in libfoo", "https://a.example/1", 100),
        ];
        let outcome = Deduplicator::new(&mut seen, &mut topics, &config).run(
            batch,
            &DedupOptions {
                filter_seen: true,
                dry_run: true,
                ..Default::default()
            },
            1000,
        );
        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.skipped_url, 1);
    }

    #[test]
    fn filters_off_pass_everything_through() {
        let dir = tempfile::tempdir().unwrap();
        let (mut seen, mut topics) = stores(&dir);
        let config = Config::default_seed();
        let batch = vec![
            article("NVD", "CVE-2024-1234 in OpenSSL", "https://a.example/1", 100),
            article("Reddit", "OpenSSL bug CVE-2024-1234", "https://b.example/2", 200),
        ];
        let outcome = Deduplicator::new(&mut seen, &mut topics, &config).run(
            batch,
            &DedupOptions {
                dry_run: true,
                ..Default::default()
            },
            1000,
        );
        assert_eq!(outcome.kept.len(), 2);
        assert_eq!(outcome.skipped_url, 0);
        assert_eq!(outcome.skipped_topic, 0);
    }

    #[test]
    fn mark_seen_counts_only_new_urls() {
        let dir = tempfile::tempdir().unwrap();
        let (mut seen, _) = stores(&dir);
        let urls = vec![
            "https://a.example/1".to_string(),
            "https://a.example/2".to_string(),
        ];
        assert_eq!(mark_seen(&mut seen, &urls, 1000), 2);
        assert_eq!(mark_seen(&mut seen, &urls, 1001), 0);
    }

    #[test]
    fn union_find_builds_transitive_clusters() {
        let mut links = UnionFind::new(5);
        links.union(0, 1);
        links.union(1, 2);
        links.union(3, 4);
        assert_eq!(links.find(0), links.find(2));
        assert_ne!(links.find(0), links.find(3));
    }
}
