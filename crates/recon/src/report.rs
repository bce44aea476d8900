use std::collections::{BTreeMap, HashMap};

use crate::model::{MatchResult, MatchStrategy, ReconSummary};

/// Compute summary statistics from match results.
pub fn summarize(results: &[MatchResult]) -> ReconSummary {
    let mut counts_by_strategy: BTreeMap<String, usize> = MatchStrategy::ALL
        .iter()
        .map(|s| (s.to_string(), 0))
        .collect();
    let mut counts_by_step: BTreeMap<String, usize> = BTreeMap::new();
    let mut claims: HashMap<usize, usize> = HashMap::new();
    let mut exact = 0;
    let mut fuzzy = 0;
    let mut invalid = 0;
    let mut unmatched = 0;
    let mut fuzzy_score_total = 0.0;

    for r in results {
        *counts_by_strategy.entry(r.strategy.to_string()).or_insert(0) += 1;
        if let Some(ref step) = r.step {
            *counts_by_step.entry(step.clone()).or_insert(0) += 1;
        }
        if let Some(pos) = r.candidate_index {
            *claims.entry(pos).or_insert(0) += 1;
        }
        if r.issue.is_some() {
            invalid += 1;
        }

        match r.strategy {
            MatchStrategy::ExactIdentifier | MatchStrategy::ExactSecondaryKey => exact += 1,
            MatchStrategy::Fuzzy => {
                fuzzy += 1;
                fuzzy_score_total += r.score;
            }
            MatchStrategy::None if r.issue.is_none() => unmatched += 1,
            MatchStrategy::None => {}
        }
    }

    let total = results.len();
    let matched = exact + fuzzy;
    let overall_coverage_percent = if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64 * 100.0
    };

    ReconSummary {
        total,
        matched,
        exact,
        fuzzy,
        unmatched,
        invalid,
        counts_by_strategy,
        counts_by_step,
        shared_candidates: claims.values().filter(|&&n| n > 1).count(),
        mean_fuzzy_score: (fuzzy > 0).then(|| fuzzy_score_total / fuzzy as f64),
        overall_coverage_percent,
    }
}
