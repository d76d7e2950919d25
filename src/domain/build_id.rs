//! Build identifiers emitted by the build script.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of one firmware build (usually a content hash).
///
/// It names the artifact directory, so it must be a single, non-empty
/// path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildIdError {
    #[error("build identifier is empty")]
    Empty,

    #[error("build identifier is not a plain path component: {0:?}")]
    NotAComponent(String),
}

impl BuildId {
    /// Parse an identifier, trimming surrounding whitespace
    pub fn parse(raw: &str) -> Result<Self, BuildIdError> {
        let id = raw.trim();

        if id.is_empty() {
            return Err(BuildIdError::Empty);
        }

        if id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(BuildIdError::NotAComponent(id.to_string()));
        }

        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BuildId {
    type Err = BuildIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BuildId {
    type Error = BuildIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BuildId> for String {
    fn from(id: BuildId) -> Self {
        id.0
    }
}
