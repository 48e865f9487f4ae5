use thiserror::Error;

/// Failure to obtain a [`Domain`](crate::ast::Domain) from a document.
///
/// Analysis itself never fails; only loading the AST can.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error reading '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid domain document '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            LoadError::Io { path, .. } | LoadError::Json { path, .. } => path,
        }
    }

    /// Serialize for `--output json` error reporting.
    pub fn to_json_value(&self) -> serde_json::Value {
        let kind = match self {
            LoadError::Io { .. } => "io",
            LoadError::Json { .. } => "json",
        };
        serde_json::json!({
            "error": kind,
            "file": self.path(),
            "message": self.to_string(),
        })
    }
}
