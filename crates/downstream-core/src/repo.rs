//! Repository references (`owner/name`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// A repository on the build server, identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`. Exactly one `/` with non-empty halves is accepted.
    pub fn parse(input: &str) -> PluginResult<Self> {
        let mut parts = input.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(PluginError::RepoFormat {
                input: input.to_string(),
            }),
        }
    }
}

impl FromStr for RepoRef {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_and_name() {
        let repo = RepoRef::parse("acme/widgets").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "widgets");
    }

    #[test]
    fn test_parse_without_separator_fails() {
        let err = RepoRef::parse("acme").unwrap_err();
        assert!(matches!(err, PluginError::RepoFormat { ref input } if input == "acme"));
    }

    #[test]
    fn test_parse_with_extra_segment_fails() {
        assert!(RepoRef::parse("acme/widgets/extra").is_err());
    }

    #[test]
    fn test_parse_empty_halves_fail() {
        assert!(RepoRef::parse("").is_err());
        assert!(RepoRef::parse("/widgets").is_err());
        assert!(RepoRef::parse("acme/").is_err());
    }

    #[test]
    fn test_from_str_and_display() {
        let repo: RepoRef = "acme/widgets".parse().unwrap();
        assert_eq!(repo.to_string(), "acme/widgets");
    }
}
