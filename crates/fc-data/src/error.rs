use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum DataError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Toml(toml::de::Error),
    InvalidData(String),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            DataError::Json(e) => write!(f, "invalid catalog JSON: {e}"),
            DataError::Toml(e) => write!(f, "invalid config TOML: {e}"),
            DataError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Io { source, .. } => Some(source),
            DataError::Json(e) => Some(e),
            DataError::Toml(e) => Some(e),
            DataError::InvalidData(_) => None,
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        DataError::Json(e)
    }
}

impl From<toml::de::Error> for DataError {
    fn from(e: toml::de::Error) -> Self {
        DataError::Toml(e)
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
