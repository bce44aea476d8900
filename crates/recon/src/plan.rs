//! Match plan: which keys to compare, in which order, and how to treat
//! colliding keys. Built from config or by hand, validated before use.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{CatalogRecord, MatchStrategy};
use crate::normalize::{filename_stem, normalize, NormalizedKey, TokenRules};

// ---------------------------------------------------------------------------
// Key fields
// ---------------------------------------------------------------------------

/// Which text of a record an exact step compares.
///
/// String syntax: `identifier`, `display_name`, `column:<name>`,
/// `filename` (stem of the identifier) or `filename:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyField {
    Identifier,
    DisplayName,
    Column(String),
    /// Filename stem of the identifier (`None`) or of a payload column.
    Filename(Option<String>),
}

impl KeyField {
    /// Normalized key for this field of `record`. Missing columns yield the
    /// empty key.
    pub fn extract(&self, record: &CatalogRecord) -> NormalizedKey {
        match self {
            Self::Identifier => normalize(&record.identifier),
            Self::DisplayName => normalize(&record.display_name),
            Self::Column(column) => normalize(column_value(record, column)),
            Self::Filename(None) => normalize(filename_stem(&record.identifier)),
            Self::Filename(Some(column)) => normalize(filename_stem(column_value(record, column))),
        }
    }

    /// Payload column this field reads, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Column(c) | Self::Filename(Some(c)) => Some(c),
            _ => None,
        }
    }
}

fn column_value<'a>(record: &'a CatalogRecord, column: &str) -> &'a str {
    record.payload.get(column).map(String::as_str).unwrap_or("")
}

impl std::str::FromStr for KeyField {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.split_once(':') {
            None => match s {
                "identifier" => Self::Identifier,
                "display_name" => Self::DisplayName,
                "filename" => Self::Filename(None),
                other => {
                    return Err(ReconError::ConfigValidation(format!(
                        "unknown key field '{other}' (expected identifier, display_name, filename, column:<name> or filename:<name>)"
                    )))
                }
            },
            Some((_, "")) => {
                return Err(ReconError::ConfigValidation(format!(
                    "key field '{s}' is missing a column name"
                )))
            }
            Some(("column", column)) => Self::Column(column.to_string()),
            Some(("filename", column)) => Self::Filename(Some(column.to_string())),
            Some((prefix, _)) => {
                return Err(ReconError::ConfigValidation(format!(
                    "unknown key field prefix '{prefix}:'"
                )))
            }
        };
        Ok(field)
    }
}

impl TryFrom<String> for KeyField {
    type Error = ReconError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyField> for String {
    fn from(field: KeyField) -> Self {
        field.to_string()
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::DisplayName => write!(f, "display_name"),
            Self::Column(c) => write!(f, "column:{c}"),
            Self::Filename(None) => write!(f, "filename"),
            Self::Filename(Some(c)) => write!(f, "filename:{c}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the first candidate seen for a key.
    #[default]
    FirstWins,
    /// Keep the last candidate seen for a key (later rows are newer data).
    LastWins,
}

#[derive(Debug, Clone)]
pub struct ExactStep {
    pub name: String,
    pub source_key: KeyField,
    pub candidate_key: KeyField,
}

impl ExactStep {
    pub fn new(name: impl Into<String>, source_key: KeyField, candidate_key: KeyField) -> Self {
        Self {
            name: name.into(),
            source_key,
            candidate_key,
        }
    }

    /// Identifier-to-identifier steps are the primary (SKU) match; all
    /// other exact steps are secondary keys.
    pub fn strategy(&self) -> MatchStrategy {
        if self.source_key == KeyField::Identifier && self.candidate_key == KeyField::Identifier {
            MatchStrategy::ExactIdentifier
        } else {
            MatchStrategy::ExactSecondaryKey
        }
    }
}

#[derive(Debug, Clone)]
pub struct FuzzyStep {
    pub name: String,
    pub threshold: f64,
}

#[derive(Debug, Clone)]
pub enum Step {
    Exact(ExactStep),
    Fuzzy(FuzzyStep),
}

impl Step {
    pub fn name(&self) -> &str {
        match self {
            Self::Exact(s) => &s.name,
            Self::Fuzzy(s) => &s.name,
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Validated strategy order: exact steps first, at most one fuzzy step last.
#[derive(Debug, Clone)]
pub struct MatchPlan {
    pub exact: Vec<ExactStep>,
    pub fuzzy: Option<FuzzyStep>,
    pub duplicates: DuplicatePolicy,
    pub tokens: TokenRules,
}

impl MatchPlan {
    pub fn from_steps(steps: Vec<Step>) -> Result<Self, ReconError> {
        if steps.is_empty() {
            return Err(ReconError::InvalidPlan("at least one strategy step is required".into()));
        }

        let mut names = HashSet::new();
        let mut exact = Vec::new();
        let mut fuzzy: Option<FuzzyStep> = None;

        for step in steps {
            if !names.insert(step.name().to_string()) {
                return Err(ReconError::InvalidPlan(format!(
                    "duplicate step name '{}'",
                    step.name()
                )));
            }
            if let Some(ref f) = fuzzy {
                return Err(ReconError::InvalidPlan(format!(
                    "fuzzy step '{}' must be the last step (found '{}' after it)",
                    f.name,
                    step.name()
                )));
            }
            match step {
                Step::Exact(s) => exact.push(s),
                Step::Fuzzy(s) => {
                    check_threshold(&s)?;
                    fuzzy = Some(s);
                }
            }
        }

        Ok(Self {
            exact,
            fuzzy,
            duplicates: DuplicatePolicy::default(),
            tokens: TokenRules::default(),
        })
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_tokens(mut self, rules: TokenRules) -> Self {
        self.tokens = rules;
        self
    }

    /// Re-check invariants that the builder methods cannot enforce, for
    /// plans assembled field by field.
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.exact.is_empty() && self.fuzzy.is_none() {
            return Err(ReconError::InvalidPlan("at least one strategy step is required".into()));
        }
        if let Some(ref f) = self.fuzzy {
            check_threshold(f)?;
        }
        if self.tokens.min_len == 0 {
            return Err(ReconError::InvalidPlan("min_token_len must be at least 1".into()));
        }
        Ok(())
    }

    /// Distinct candidate-side key fields, in step order.
    pub fn candidate_fields(&self) -> Vec<KeyField> {
        let mut fields: Vec<KeyField> = Vec::new();
        for step in &self.exact {
            if !fields.contains(&step.candidate_key) {
                fields.push(step.candidate_key.clone());
            }
        }
        fields
    }
}

fn check_threshold(step: &FuzzyStep) -> Result<(), ReconError> {
    if !step.threshold.is_finite() || !(0.0..=1.0).contains(&step.threshold) {
        return Err(ReconError::InvalidPlan(format!(
            "fuzzy step '{}': threshold must be within [0, 1], got {}",
            step.name, step.threshold
        )));
    }
    Ok(())
}
