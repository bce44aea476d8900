use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::index::IndexStats;
use crate::normalize::normalize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One catalog entry as seen by the engine.
///
/// `identifier` and `display_name` are only ever read; `payload` is carried
/// through untouched (image URL, price, weight, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogRecord {
    pub identifier: String,
    pub display_name: String,
    pub payload: BTreeMap<String, String>,
}

impl CatalogRecord {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            payload: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(column.into(), value.into());
        self
    }

    /// A record with neither a usable identifier nor a usable name cannot
    /// be matched and is excluded from indexing and matching.
    pub fn is_keyless(&self) -> bool {
        normalize(&self.identifier).is_empty() && normalize(&self.display_name).is_empty()
    }
}

/// Records plus the column order they were read with.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub headers: Vec<String>,
    pub records: Vec<CatalogRecord>,
}

/// Pre-loaded source and candidate collections for one run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub source: LoadedRecords,
    pub candidates: LoadedRecords,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// How a source record was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExactIdentifier,
    ExactSecondaryKey,
    Fuzzy,
    None,
}

impl MatchStrategy {
    pub const ALL: [MatchStrategy; 4] = [
        Self::ExactIdentifier,
        Self::ExactSecondaryKey,
        Self::Fuzzy,
        Self::None,
    ];

    pub fn is_exact(&self) -> bool {
        matches!(self, Self::ExactIdentifier | Self::ExactSecondaryKey)
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactIdentifier => write!(f, "exact_identifier"),
            Self::ExactSecondaryKey => write!(f, "exact_secondary_key"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Data-quality problem that kept a source record out of matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordIssue {
    /// Identifier and display name are both empty after normalization.
    MissingKeys,
}

/// Outcome for one source record.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub source_index: usize,
    pub source_identifier: String,
    pub matched_candidate: Option<CatalogRecord>,
    pub candidate_index: Option<usize>,
    pub strategy: MatchStrategy,
    /// Name of the configured step that produced the match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<RecordIssue>,
}

impl MatchResult {
    pub fn unmatched(source_index: usize, source: &CatalogRecord) -> Self {
        Self {
            source_index,
            source_identifier: source.identifier.clone(),
            matched_candidate: None,
            candidate_index: None,
            strategy: MatchStrategy::None,
            step: None,
            score: 0.0,
            issue: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_candidate.is_some()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub total: usize,
    pub matched: usize,
    pub exact: usize,
    pub fuzzy: usize,
    pub unmatched: usize,
    pub invalid: usize,
    pub counts_by_strategy: BTreeMap<String, usize>,
    pub counts_by_step: BTreeMap<String, usize>,
    /// Candidates claimed by more than one source record.
    pub shared_candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_fuzzy_score: Option<f64>,
    pub overall_coverage_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub index: IndexStats,
    pub results: Vec<MatchResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub source_records: usize,
    pub candidate_records: usize,
}
