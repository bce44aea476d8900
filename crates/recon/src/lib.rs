//! `stockmatch-recon`: catalog record reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records, returns one match result
//! per source record plus coverage statistics. Exact keys (SKU, handle,
//! filename) are tried in configured order before fuzzy title matching.
//! File intake and merged output live in [`load`] and [`merge`]; the engine
//! itself does no IO.

pub mod config;
pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod index;
pub mod load;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod plan;
pub mod report;

pub use config::ReconConfig;
pub use engine::{reconcile, run, Reconciler};
pub use error::ReconError;
pub use fuzzy::{jaccard, match_fuzzy};
pub use index::ExactIndex;
pub use model::{CatalogRecord, MatchResult, MatchStrategy, ReconInput, ReconReport, ReconSummary};
pub use normalize::{normalize, tokenize, NormalizedKey, TokenRules, TokenSet};
pub use plan::{DuplicatePolicy, ExactStep, FuzzyStep, KeyField, MatchPlan, Step};
pub use report::summarize;
