//! Error types for `vigil-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid resource key {0:?}: expected \"<rule_id> <resource_name>\"")]
  InvalidResourceKey(String),

  #[error("malformed status document: {0}")]
  MalformedDocument(String),

  #[error("unsupported status document version: {0}")]
  UnsupportedVersion(u32),

  #[error("invalid timestamp: {0:?}")]
  InvalidTimestamp(String),

  #[error("invalid resource scope: {0}")]
  InvalidScope(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
