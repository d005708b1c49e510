use thiserror::Error;

use super::types::RuleCategory;

/// Problems found while loading or validating a rule table.
#[derive(Error, Debug)]
pub enum RuleTableError {
    #[error("duplicate jurisdiction code {0}")]
    DuplicateJurisdiction(String),

    #[error("{jurisdiction}: duplicate sub-national id {id}")]
    DuplicateRegion { jurisdiction: String, id: String },

    #[error("{jurisdiction}: progressive rule {rule} has no brackets")]
    MissingBrackets { jurisdiction: String, rule: String },

    #[error("{jurisdiction}: rule {rule} is missing a rate")]
    MissingRate { jurisdiction: String, rule: String },

    #[error("{jurisdiction}: rule {rule} has invalid value for {field}: {value}")]
    InvalidValue {
        jurisdiction: String,
        rule: String,
        field: &'static str,
        value: f64,
    },

    #[error("{jurisdiction}: {scope} policy for {category:?} substitutes an empty bracket table")]
    EmptyPolicyTable {
        jurisdiction: String,
        scope: String,
        category: RuleCategory,
    },

    #[error("{jurisdiction}: {scope} policy for {category:?} has invalid value for {field}: {value}")]
    InvalidPolicyValue {
        jurisdiction: String,
        scope: String,
        category: RuleCategory,
        field: &'static str,
        value: f64,
    },

    #[error("invalid rule table JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lookup failures when a calculation names something the table lacks.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown jurisdiction {0}")]
    UnknownJurisdiction(String),
}
