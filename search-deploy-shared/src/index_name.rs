//! Index naming.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Characters the search service refuses in index names.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

/// Reasons an index name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexNameError {
    #[error("index name must not be empty")]
    Empty,

    #[error("index name '{0}' must be lowercase")]
    NotLowercase(String),

    #[error("index name '{0}' must not start with '_', '-' or '+'")]
    InvalidStart(String),

    #[error("index name '{name}' contains forbidden character '{ch}'")]
    ForbiddenChar { name: String, ch: char },

    #[error("index name '{0}' is reserved")]
    Reserved(String),
}

/// Generate a dated index name: `{prefix}-YYYYMMDD-HHMMSS`.
///
/// Names generated from later timestamps sort after earlier ones.
pub fn generate_index_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, now.format("%Y%m%d-%H%M%S"))
}

/// Check a name against the search service's index naming rules.
pub fn validate_index_name(name: &str) -> Result<(), IndexNameError> {
    if name.is_empty() {
        return Err(IndexNameError::Empty);
    }
    if name == "." || name == ".." {
        return Err(IndexNameError::Reserved(name.to_string()));
    }
    if name.starts_with(['_', '-', '+']) {
        return Err(IndexNameError::InvalidStart(name.to_string()));
    }
    if name.chars().any(char::is_uppercase) {
        return Err(IndexNameError::NotLowercase(name.to_string()));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(IndexNameError::ForbiddenChar {
            name: name.to_string(),
            ch,
        });
    }
    Ok(())
}
