//! Token-overlap title matching.

use crate::model::CatalogRecord;
use crate::normalize::{tokenize, TokenRules, TokenSet};

/// Jaccard similarity |A ∩ B| / |A ∪ B|. An empty side scores 0.
pub fn jaccard(a: &TokenSet, b: &TokenSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection_len(b);
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Best-scoring position in `pool` for `source`, if it reaches `threshold`.
///
/// Ties keep the earliest position. Empty token sets never match.
pub fn best_match<'a, I>(source: &TokenSet, pool: I, threshold: f64) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = (usize, &'a TokenSet)>,
{
    if source.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (pos, tokens) in pool {
        if tokens.is_empty() {
            continue;
        }
        let score = jaccard(source, tokens);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((pos, score));
        }
    }

    best.filter(|&(_, score)| score >= threshold)
}

/// Match `source_tokens` against the display names of `candidates`.
///
/// Keyless candidates are skipped, same as the [`crate::engine::Reconciler`]
/// pool. Tokenizes every candidate on each call; use the reconciler to reuse
/// candidate tokens across many source records.
pub fn match_fuzzy<'c>(
    source_tokens: &TokenSet,
    candidates: &'c [CatalogRecord],
    threshold: f64,
    rules: &TokenRules,
) -> Option<(&'c CatalogRecord, f64)> {
    let pool: Vec<(usize, TokenSet)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_keyless())
        .map(|(pos, c)| (pos, tokenize(&c.display_name, rules)))
        .collect();
    best_match(source_tokens, pool.iter().map(|(pos, t)| (*pos, t)), threshold)
        .map(|(pos, score)| (&candidates[pos], score))
}
