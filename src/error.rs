//! Error types, layered the same way the components are:
//! generator failures, store failures, and the engine-level view of both.

use thiserror::Error;

/// Failures from the external text generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
  /// Transport error, timeout, or non-success HTTP status from the remote.
  #[error("generation failed: {0}")]
  Failed(String),
  /// The remote answered, but the structured payload did not parse.
  #[error("malformed generator response: {0}")]
  Malformed(String),
}

/// Failures from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
  /// Uniqueness violation on insert. Expected under concurrent template
  /// creation; callers re-fetch the winning row instead of surfacing this.
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("not found: {0}")]
  NotFound(String),
  #[error("store error: {0}")]
  Internal(String),
}

/// What a generation request can fail with, as seen by the HTTP layer.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Generation(#[from] GeneratorError),
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Invalid(String),
}
