//! Top-level error type for harness operations.

use thiserror::Error;

use crate::config::ConfigError;
use crate::corpus::CorpusError;
use crate::escape::RenderOverflow;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("render: {0}")]
    RenderOverflow(#[from] RenderOverflow),
    #[error("corpus: {0}")]
    Corpus(#[from] CorpusError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{failures} failures")]
    Failures { failures: u64 },
}
