// Similarity scoring between articles.
//
// Two signals go into the score: Jaccard over generic token sets (weak
// evidence of same-story) and overlap of named entities (strong evidence).
// Entities are rare and discriminative, so they carry most of the weight.
// With these constants token overlap alone stays under the default 0.40
// threshold, so generic vocabulary never merges two stories on its own.

use crate::text::TextProfile;

/// Weight of the generic-token Jaccard signal.
pub const JACCARD_WEIGHT: f64 = 0.3;
/// Weight of the named-entity overlap signal.
pub const ENTITY_WEIGHT: f64 = 0.7;
/// Fallback fingerprint width for articles without entities.
const FINGERPRINT_TOKENS: usize = 8;

/// Jaccard similarity of the two token sets. 0.0 when both are empty.
pub fn jaccard(a: &TextProfile, b: &TextProfile) -> f64 {
    if a.tokens.is_empty() && b.tokens.is_empty() {
        return 0.0;
    }
    let intersection = a.tokens.keys().filter(|t| b.tokens.contains_key(*t)).count();
    let union = a.tokens.len() + b.tokens.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Entity overlap normalized by the smaller entity set, so a subset
/// relation scores high (a short title naming one CVE still matches a
/// long advisory naming three).
pub fn entity_overlap(a: &TextProfile, b: &TextProfile) -> f64 {
    let intersection = a.entities.intersection(&b.entities).count();
    let smaller = a.entities.len().min(b.entities.len());
    intersection as f64 / smaller.max(1) as f64
}

/// Combined duplication score in [0, 1].
pub fn similarity(a: &TextProfile, b: &TextProfile) -> f64 {
    JACCARD_WEIGHT * jaccard(a, b) + ENTITY_WEIGHT * entity_overlap(a, b)
}

/// Derive the stable topic-store key for a profile.
///
/// Built from the sorted entity set when non-empty, else from the top
/// tokens ranked by in-article frequency, then length, then alphabetically.
/// Two independently-fetched articles about the same story hash to the same
/// key without pairwise comparison. An empty profile yields an empty key,
/// which callers treat as "no fingerprint".
pub fn fingerprint(profile: &TextProfile) -> String {
    if !profile.entities.is_empty() {
        let mut parts: Vec<String> = profile.entities.iter().map(|e| e.to_lowercase()).collect();
        parts.sort_unstable();
        parts.dedup();
        return parts.join("|");
    }

    let mut ranked: Vec<(&String, u32)> = profile.tokens.iter().map(|(t, &n)| (t, n)).collect();
    ranked.sort_by(|(ta, na), (tb, nb)| {
        nb.cmp(na)
            .then_with(|| tb.chars().count().cmp(&ta.chars().count()))
            .then_with(|| ta.cmp(tb))
    });
    let mut top: Vec<&str> = ranked
        .iter()
        .take(FINGERPRINT_TOKENS)
        .map(|(t, _)| t.as_str())
        .collect();
    top.sort_unstable();
    top.join("|")
}
