//! Validated raw-object names and derived processed keys.

use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Prefix prepended to a raw object's name to form the processed key.
pub const PROCESSED_KEY_PREFIX: &str = "processed-";

/// Why an object name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ObjectNameError {
    #[error("object name is empty")]
    Empty,
    #[error("object name contains a path separator")]
    PathSeparator,
    #[error("object name contains a NUL byte")]
    NulByte,
    #[error("object name is a relative path component")]
    RelativeComponent,
}

/// A validated raw-object name.
///
/// Staged files are named after the objects they cache, so a name must be a
/// plain filename: non-empty, no path separators, no NUL, not `.` or `..`.
/// One name therefore maps to exactly one path inside a staging directory.
/// Uniqueness of names across concurrent jobs is the uploader's contract
/// (upload keys embed the uploader identity and timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ObjectName(String);

impl ObjectName {
    /// Validate a raw name.
    pub fn new(name: impl Into<String>) -> Result<Self, ObjectNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ObjectNameError::Empty);
        }
        if name == "." || name == ".." {
            return Err(ObjectNameError::RelativeComponent);
        }
        if name.contains('/') || name.contains('\\') {
            return Err(ObjectNameError::PathSeparator);
        }
        if name.contains('\0') {
            return Err(ObjectNameError::NulByte);
        }
        Ok(Self(name))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key the processed output is stored under: `processed-<name>`.
    ///
    /// Deterministic; downstream consumers of the processed bucket rely on it.
    pub fn processed_key(&self) -> String {
        format!("{}{}", PROCESSED_KEY_PREFIX, self.0)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ObjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ObjectName {
    type Error = ObjectNameError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}
