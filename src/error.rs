//! Error types. Rendering never fails; these only surface while building configuration
//! or talking to a cache backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid tag name `{0}`")]
    InvalidTagName(String),
    #[error("invalid parameter name `{param}` on tag `{tag}`")]
    InvalidParamName { tag: String, param: String },
    #[error("closed tag `{0}` has a content template that expects an argument")]
    ClosedTagArgument(String),
    #[error("invalid pattern on tag `{tag}`: {source}")]
    TagPattern {
        tag: String,
        #[source]
        source: regex::Error,
    },
    #[error("tag scanner could not be compiled: {0}")]
    Scanner(#[source] regex::Error),
    #[error("invalid top-level domain pattern: {0}")]
    TldPattern(#[source] regex::Error),
    #[error("smiley table could not be compiled: {0}")]
    SmileyPattern(#[source] regex::Error),
    #[cfg(feature = "serde")]
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache lock poisoned")]
    Poisoned,
}
