use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::fuzzy::best_match;
use crate::index::ExactIndex;
use crate::model::{
    CatalogRecord, MatchResult, MatchStrategy, RecordIssue, ReconInput, ReconMeta, ReconReport,
};
use crate::normalize::{tokenize, TokenSet};
use crate::plan::MatchPlan;
use crate::report::summarize;

/// Candidate pool prepared for matching: exact tables and title tokens are
/// computed once, then only read. Safe to share across threads.
pub struct Reconciler<'c> {
    candidates: &'c [CatalogRecord],
    plan: MatchPlan,
    index: ExactIndex<'c>,
    /// (candidate position, tokens) for candidates eligible for fuzzy matching.
    pool: Vec<(usize, TokenSet)>,
}

impl<'c> Reconciler<'c> {
    pub fn new(candidates: &'c [CatalogRecord], plan: MatchPlan) -> Result<Self, ReconError> {
        plan.validate()?;

        let index = ExactIndex::build(candidates, &plan.candidate_fields(), plan.duplicates);

        let pool = if plan.fuzzy.is_some() {
            candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| !c.is_keyless())
                .map(|(pos, c)| (pos, tokenize(&c.display_name, &plan.tokens)))
                .filter(|(_, tokens)| !tokens.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        if let Some(ref fuzzy) = plan.fuzzy {
            if fuzzy.threshold == 0.0 {
                log::warn!(
                    "fuzzy step '{}' has threshold 0: every titled record will match something",
                    fuzzy.name
                );
            }
            log::debug!("fuzzy pool: {} of {} candidates have title tokens", pool.len(), candidates.len());
        }

        Ok(Self {
            candidates,
            plan,
            index,
            pool,
        })
    }

    pub fn index(&self) -> &ExactIndex<'c> {
        &self.index
    }

    pub fn plan(&self) -> &MatchPlan {
        &self.plan
    }

    /// Resolve one source record: exact steps in order, then the fuzzy
    /// step. The first acceptable match wins; nothing is retried.
    pub fn match_one(&self, source_index: usize, source: &CatalogRecord) -> MatchResult {
        let mut result = MatchResult::unmatched(source_index, source);

        if source.is_keyless() {
            result.issue = Some(RecordIssue::MissingKeys);
            return result;
        }

        for step in &self.plan.exact {
            let key = step.source_key.extract(source);
            if key.is_empty() {
                continue;
            }
            if let Some(pos) = self.index.position(&step.candidate_key, &key) {
                return self.matched(result, pos, step.strategy(), &step.name, 1.0);
            }
        }

        if let Some(ref fuzzy) = self.plan.fuzzy {
            let tokens = tokenize(&source.display_name, &self.plan.tokens);
            let pool = self.pool.iter().map(|(pos, t)| (*pos, t));
            if let Some((pos, score)) = best_match(&tokens, pool, fuzzy.threshold) {
                return self.matched(result, pos, MatchStrategy::Fuzzy, &fuzzy.name, score);
            }
        }

        result
    }

    /// Match every source record independently, in input order.
    pub fn reconcile(&self, sources: &[CatalogRecord]) -> Vec<MatchResult> {
        let results: Vec<MatchResult> = sources
            .iter()
            .enumerate()
            .map(|(i, s)| self.match_one(i, s))
            .collect();

        let keyless = results.iter().filter(|r| r.issue.is_some()).count();
        if keyless > 0 {
            log::warn!("{keyless} source record(s) have no identifier or name and were skipped");
        }
        results
    }

    fn matched(
        &self,
        mut result: MatchResult,
        pos: usize,
        strategy: MatchStrategy,
        step: &str,
        score: f64,
    ) -> MatchResult {
        result.matched_candidate = Some(self.candidates[pos].clone());
        result.candidate_index = Some(pos);
        result.strategy = strategy;
        result.step = Some(step.to_string());
        result.score = score;
        result
    }
}

/// One-shot reconciliation of `sources` against `candidates`.
pub fn reconcile(
    sources: &[CatalogRecord],
    candidates: &[CatalogRecord],
    plan: &MatchPlan,
) -> Result<Vec<MatchResult>, ReconError> {
    let reconciler = Reconciler::new(candidates, plan.clone())?;
    Ok(reconciler.reconcile(sources))
}

/// Run reconciliation per config. Returns per-record results + summary.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconReport, ReconError> {
    let plan = config.match_plan()?;
    let reconciler = Reconciler::new(&input.candidates.records, plan)?;
    let results = reconciler.reconcile(&input.source.records);
    let summary = summarize(&results);

    log::info!(
        "{}: {} of {} source records matched ({:.1}%)",
        config.name,
        summary.matched,
        summary.total,
        summary.overall_coverage_percent
    );

    Ok(ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            source_records: input.source.records.len(),
            candidate_records: input.candidates.records.len(),
        },
        summary,
        index: reconciler.index().stats(),
        results,
    })
}
