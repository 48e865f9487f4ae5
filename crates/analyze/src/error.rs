use thiserror::Error;

/// Errors from configuring an analysis run.
///
/// Passes themselves never fail: malformed or partial input degrades to
/// "no diagnostic".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzeError {
    #[error("unknown analysis pass '{id}'. Valid: {known}")]
    UnknownPass { id: String, known: String },
}
