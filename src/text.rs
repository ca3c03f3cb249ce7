// Text normalization and lightweight entity extraction.
//
// Everything here is pure: (title, summary) in, token and entity sets out.
// Entity accuracy directly bounds similarity-scoring quality, so the tests
// are table-driven.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;

use regex_lite::Regex;
use stop_words::{get, LANGUAGE};

/// Significant tokens and named entities extracted from one article's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextProfile {
    /// Lowercase tokens with their in-text occurrence counts. Stopwords and
    /// tokens shorter than 3 characters are removed.
    pub tokens: BTreeMap<String, u32>,
    /// Original-case entities: CVE identifiers (uppercased), capitalized
    /// word runs, bare numbers. Weighted above generic tokens downstream.
    pub entities: BTreeSet<String>,
}

const MIN_TOKEN_CHARS: usize = 3;
const MAX_RUN_WORDS: usize = 4;

/// Combined English + French stopword list. The expected feeds mix both
/// languages (CERT-FR advisories alongside English vendor blogs).
fn stopwords() -> &'static HashSet<String> {
    static WORDS: OnceLock<HashSet<String>> = OnceLock::new();
    WORDS.get_or_init(|| {
        let mut words: HashSet<String> = get(LANGUAGE::English).into_iter().collect();
        words.extend(get(LANGUAGE::French));
        words
    })
}

fn re_tags() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap())
}

fn re_urls() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)https?://\S+").unwrap())
}

fn re_cve() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bcve-\d{4}-\d{4,}\b").unwrap())
}

fn re_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{2,}\b").unwrap())
}

/// Analyze an article's title + summary into a [`TextProfile`].
///
/// HTML entities are decoded, tags and URLs stripped, then entities are
/// pulled from the original-case text before tokens are lowercased.
pub fn analyze(title: &str, summary: &str) -> TextProfile {
    let raw = format!("{title} {summary}");
    let decoded = html_escape::decode_html_entities(&raw);
    let stripped = re_tags().replace_all(&decoded, " ");
    let stripped = re_urls().replace_all(&stripped, " ");

    TextProfile {
        entities: extract_entities(&stripped),
        tokens: tokenize(&stripped),
    }
}

fn tokenize(text: &str) -> BTreeMap<String, u32> {
    let stop = stopwords();
    let mut counts = BTreeMap::new();
    for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
        if token.chars().count() < MIN_TOKEN_CHARS || stop.contains(token) {
            continue;
        }
        *counts.entry(token.to_string()).or_insert(0) += 1;
    }
    counts
}

fn extract_entities(text: &str) -> BTreeSet<String> {
    let mut entities = BTreeSet::new();

    for m in re_cve().find_iter(text) {
        entities.insert(m.as_str().to_uppercase());
    }
    for m in re_number().find_iter(text) {
        entities.insert(m.as_str().to_string());
    }
    for run in capitalized_runs(text) {
        // A run that is exactly a CVE id was already captured, case-normalized
        if re_cve()
            .find(&run)
            .is_some_and(|m| m.start() == 0 && m.end() == run.len())
        {
            continue;
        }
        entities.insert(run);
    }

    entities
}

fn clean_word(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn ends_sentence(raw_word: &str) -> bool {
    raw_word
        .chars()
        .last()
        .is_some_and(|c| matches!(c, '.' | '!' | '?' | ';' | ':' | ','))
}

/// Proper-noun heuristic: runs of 1–4 consecutive capitalized words.
///
/// Sentence-case noise is contained two ways: punctuation ends a run, and
/// leading stopword words ("New", "The", "Une") are stripped so "New OpenSSL"
/// contributes "OpenSSL" and a lone "New" contributes nothing.
fn capitalized_runs(text: &str) -> Vec<String> {
    let stop = stopwords();
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut runs = Vec::new();
    let mut i = 0;

    while i < words.len() {
        let first = clean_word(words[i]);
        if !is_capitalized(first) {
            i += 1;
            continue;
        }

        let mut run = vec![first];
        let mut closed = ends_sentence(words[i]);
        i += 1;
        while i < words.len() && run.len() < MAX_RUN_WORDS && !closed {
            let next = clean_word(words[i]);
            if !is_capitalized(next) {
                break;
            }
            closed = ends_sentence(words[i]);
            run.push(next);
            i += 1;
        }

        while let Some(first) = run.first() {
            if stop.contains(&first.to_lowercase()) {
                run.remove(0);
            } else {
                break;
            }
        }
        if run.is_empty() {
            continue;
        }

        let entity = run.join(" ");
        if entity.chars().count() >= MIN_TOKEN_CHARS {
            runs.push(entity);
        }
    }

    runs
}
