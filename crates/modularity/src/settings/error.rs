use std::path::PathBuf;
use thiserror::Error;

/// Settings error type
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid value for setting '{key}': '{value}'. Expected: {expected}")]
    Conversion {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Failed to read settings file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported settings file format: '{}'", path.display())]
    UnsupportedFormat { path: PathBuf },
}

impl SettingsError {
    /// Create a conversion error
    pub fn conversion(
        key: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            key: key.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Check if the error is a value conversion failure
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }
}
