use std::path::Path;

use serde::Deserialize;

use crate::error::ReconError;
use crate::normalize::{TokenRules, DEFAULT_MIN_TOKEN_LEN};
use crate::plan::{DuplicatePolicy, ExactStep, FuzzyStep, KeyField, MatchPlan, Step};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub source: RoleConfig,
    pub candidates: RoleConfig,
    #[serde(default, rename = "strategy")]
    pub strategies: Vec<StrategyConfig>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Role (source / candidates)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    pub file: String,
    #[serde(default)]
    pub format: Option<InputFormat>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    pub columns: ColumnMapping,
    #[serde(default)]
    pub filter: Option<RowFilter>,
}

fn default_delimiter() -> char {
    ','
}

impl RoleConfig {
    /// Explicit format, else `.json` files are JSON and everything else CSV.
    pub fn input_format(&self) -> InputFormat {
        self.format.unwrap_or_else(|| {
            let is_json = Path::new(&self.file)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json {
                InputFormat::Json
            } else {
                InputFormat::Csv
            }
        })
    }

    /// Whether a column's value will be present in loaded payloads.
    pub fn carries(&self, column: &str) -> bool {
        self.columns.payload.is_empty() || self.columns.payload.iter().any(|c| c == column)
    }

    fn validate(&self, role: &str) -> Result<(), ReconError> {
        if self.columns.identifier.is_none() && self.columns.display_name.is_none() {
            return Err(ReconError::ConfigValidation(format!(
                "{role}: columns.identifier or columns.display_name is required"
            )));
        }
        if !self.delimiter.is_ascii() {
            return Err(ReconError::ConfigValidation(format!(
                "{role}: delimiter must be a single-byte character, got '{}'",
                self.delimiter
            )));
        }
        Ok(())
    }

    fn check_key(&self, role: &str, step: &str, key: &KeyField) -> Result<(), ReconError> {
        if let Some(column) = key.column() {
            if !self.carries(column) {
                return Err(ReconError::ConfigValidation(format!(
                    "strategy '{step}': {role} column '{column}' is not listed in {role}.columns.payload"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    Csv,
    Json,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Columns carried in the record payload. Empty carries every column.
    #[serde(default)]
    pub payload: Vec<String>,
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub values: Vec<String>,
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    Exact {
        name: String,
        source_key: KeyField,
        candidate_key: KeyField,
    },
    Fuzzy {
        #[serde(default = "default_fuzzy_name")]
        name: String,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

fn default_fuzzy_name() -> String {
    "title".into()
}

/// Default title-overlap threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl StrategyConfig {
    fn to_step(&self) -> Step {
        match self {
            Self::Exact {
                name,
                source_key,
                candidate_key,
            } => Step::Exact(ExactStep::new(name.clone(), source_key.clone(), candidate_key.clone())),
            Self::Fuzzy { name, threshold } => Step::Fuzzy(FuzzyStep {
                name: name.clone(),
                threshold: *threshold,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub duplicate_keys: DuplicatePolicy,
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

fn default_min_token_len() -> usize {
    DEFAULT_MIN_TOKEN_LEN
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            duplicate_keys: DuplicatePolicy::default(),
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            extra_stopwords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub merged_csv: Option<String>,
    /// Candidate columns appended to merged rows.
    #[serde(default)]
    pub carry: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.source.validate("source")?;
        self.candidates.validate("candidates")?;

        if self.strategies.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one [[strategy]] is required".into(),
            ));
        }

        for strategy in &self.strategies {
            if let StrategyConfig::Exact {
                name,
                source_key,
                candidate_key,
            } = strategy
            {
                self.source.check_key("source", name, source_key)?;
                self.candidates.check_key("candidates", name, candidate_key)?;
            }
        }

        for column in &self.output.carry {
            if !self.candidates.carries(column) {
                return Err(ReconError::ConfigValidation(format!(
                    "output.carry: candidates column '{column}' is not listed in candidates.columns.payload"
                )));
            }
        }

        self.match_plan()?.validate()
    }

    /// Strategy order, duplicate policy and token rules as an executable plan.
    pub fn match_plan(&self) -> Result<MatchPlan, ReconError> {
        let steps = self.strategies.iter().map(StrategyConfig::to_step).collect();
        let plan = MatchPlan::from_steps(steps)?
            .with_duplicates(self.matching.duplicate_keys)
            .with_tokens(TokenRules {
                min_len: self.matching.min_token_len,
                extra_stopwords: self
                    .matching
                    .extra_stopwords
                    .iter()
                    .map(|w| w.to_lowercase())
                    .collect(),
            });
        Ok(plan)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchStrategy;

    const VALID: &str = r#"
name = "Woo images -> Shopify"

[source]
file = "woo.csv"
[source.columns]
identifier = "sku"
display_name = "post_title"

[candidates]
file = "shopify.json"
[candidates.columns]
identifier = "Variant SKU"
display_name = "Title"
payload = ["Handle", "Image Src"]

[[strategy]]
name = "sku"
kind = "exact"
source_key = "identifier"
candidate_key = "identifier"

[[strategy]]
name = "handle"
kind = "exact"
source_key = "column:slug"
candidate_key = "column:Handle"

[[strategy]]
kind = "fuzzy"
threshold = 0.45

[output]
carry = ["Image Src"]
"#;

    #[test]
    fn parse_valid() {
        let config = ReconConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Woo images -> Shopify");
        assert_eq!(config.strategies.len(), 3);
        assert_eq!(config.source.input_format(), InputFormat::Csv);
        assert_eq!(config.candidates.input_format(), InputFormat::Json);
        assert_eq!(config.source.delimiter, ',');
        assert_eq!(config.matching.duplicate_keys, DuplicatePolicy::FirstWins);
        assert_eq!(config.matching.min_token_len, 3);

        let plan = config.match_plan().unwrap();
        assert_eq!(plan.exact.len(), 2);
        assert_eq!(plan.exact[0].strategy(), MatchStrategy::ExactIdentifier);
        assert_eq!(plan.exact[1].strategy(), MatchStrategy::ExactSecondaryKey);
        let fuzzy = plan.fuzzy.unwrap();
        assert_eq!(fuzzy.name, "title");
        assert_eq!(fuzzy.threshold, 0.45);
    }

    #[test]
    fn parse_matching_section() {
        let input = format!(
            r#"{VALID}
[matching]
duplicate_keys = "last_wins"
min_token_len = 4
extra_stopwords = ["Liter"]
"#
        );
        let config = ReconConfig::from_toml(&input).unwrap();
        let plan = config.match_plan().unwrap();
        assert_eq!(plan.duplicates, DuplicatePolicy::LastWins);
        assert_eq!(plan.tokens.min_len, 4);
        assert_eq!(plan.tokens.extra_stopwords, vec!["liter"]);
    }

    #[test]
    fn reject_fuzzy_not_last() {
        let input = r#"
name = "Bad"
[source]
file = "a.csv"
[source.columns]
identifier = "sku"
[candidates]
file = "b.csv"
[candidates.columns]
identifier = "sku"

[[strategy]]
kind = "fuzzy"

[[strategy]]
name = "sku"
kind = "exact"
source_key = "identifier"
candidate_key = "identifier"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("must be the last step"));
    }

    #[test]
    fn reject_missing_strategies() {
        let input = r#"
name = "Bad"
[source]
file = "a.csv"
[source.columns]
identifier = "sku"
[candidates]
file = "b.csv"
[candidates.columns]
identifier = "sku"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("[[strategy]]"));
    }

    #[test]
    fn reject_bad_key_field() {
        let input = VALID.replace("column:slug", "slug");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
        assert!(err.to_string().contains("unknown key field"));
    }

    #[test]
    fn reject_column_outside_payload() {
        let input = VALID.replace("column:Handle", "column:Body");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("'Body'"));

        let input = VALID.replace(r#"carry = ["Image Src"]"#, r#"carry = ["Price"]"#);
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("output.carry"));
    }

    #[test]
    fn reject_role_without_key_columns() {
        let input = VALID.replace("identifier = \"sku\"\ndisplay_name = \"post_title\"\n", "");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("source: columns.identifier"));
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let input = VALID.replace("threshold = 0.45", "threshold = 2.0");
        assert!(ReconConfig::from_toml(&input).is_err());
    }

    #[test]
    fn reject_zero_min_token_len() {
        let input = format!("{VALID}\n[matching]\nmin_token_len = 0\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("min_token_len"));
    }
}
