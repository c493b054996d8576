use thiserror::Error;

/// Main error type for sekolah operations
#[derive(Debug, Error)]
pub enum SekolahError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no such table: {0}")]
    UndefinedTable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("ID parse error: {0}")]
    IdParse(#[from] crate::types::ids::IdParseError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SekolahError {
    /// Stable error code for structured output and notices
    pub fn error_code(&self) -> &'static str {
        match self {
            SekolahError::Config(_) => "config_error",
            SekolahError::Auth(_) => "auth_error",
            SekolahError::NotFound(_) => "not_found",
            SekolahError::UndefinedTable(_) => "undefined_table",
            SekolahError::Conflict(_) => "conflict",
            SekolahError::PermissionDenied(_) => "permission_denied",
            SekolahError::Unavailable(_) => "unavailable",
            SekolahError::InvalidArgs(_) => "invalid_args",
            SekolahError::Io(_) => "io_error",
            SekolahError::Sled(_) => "db_error",
            SekolahError::Json(_) => "internal_error",
            SekolahError::TomlParse(_) => "invalid_args",
            SekolahError::TomlSerialize(_) => "internal_error",
            SekolahError::IdParse(_) => "invalid_args",
            SekolahError::Internal(_) => "internal_error",
        }
    }

    /// True for a missing-row failure (the profile resolution chain and
    /// the upsert path branch on this)
    pub fn is_not_found(&self) -> bool {
        matches!(self, SekolahError::NotFound(_))
    }

    /// True when the failure is a missing table rather than a missing row
    pub fn is_undefined_table(&self) -> bool {
        matches!(self, SekolahError::UndefinedTable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SekolahError::NotFound("x".to_string()).error_code(),
            "not_found"
        );
        assert_eq!(
            SekolahError::Conflict("x".to_string()).error_code(),
            "conflict"
        );
        assert_eq!(
            SekolahError::Config("x".to_string()).error_code(),
            "config_error"
        );
    }

    #[test]
    fn test_classification_helpers() {
        assert!(SekolahError::NotFound("row".to_string()).is_not_found());
        assert!(!SekolahError::NotFound("row".to_string()).is_undefined_table());
        assert!(SekolahError::UndefinedTable("profiles".to_string()).is_undefined_table());
    }
}
