use std::{fmt, str::FromStr};

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected version tag text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version tag '{tag}': {reason}")]
pub struct TagParseError {
    pub tag: String,
    pub reason: String,
}

/// Package version tag of the form `vMAJOR.MINOR.PATCH`.
///
/// Ordering follows semantic versioning, so `v1.10.0 > v1.9.0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag(Version);

impl VersionTag {
    /// Tag of the first committed version, `v1.0.0`.
    pub fn initial() -> Self {
        Self(Version::new(1, 0, 0))
    }

    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    /// Next full-package tag: `major+1.0.0`.
    pub fn bump_major(&self) -> Self {
        Self::new(self.0.major + 1, 0, 0)
    }

    /// Next incremental tag: `major.minor+1.0`.
    pub fn bump_minor(&self) -> Self {
        Self::new(self.0.major, self.0.minor + 1, 0)
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn version(&self) -> &Version {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for VersionTag {
    type Err = TagParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| TagParseError {
            tag: text.to_string(),
            reason,
        };
        let Some(version_text) = text.trim().strip_prefix('v') else {
            return Err(invalid("tag must start with 'v'".into()));
        };
        let version = Version::parse(version_text).map_err(|err| invalid(err.to_string()))?;
        if !version.pre.is_empty() || !version.build.is_empty() {
            return Err(invalid("pre-release and build metadata are not allowed".into()));
        }
        Ok(Self(version))
    }
}

impl TryFrom<String> for VersionTag {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_with_v_prefix() {
        let tag: VersionTag = "v2.13.0".parse().unwrap();
        assert_eq!(tag.major(), 2);
        assert_eq!(tag.minor(), 13);
        assert_eq!(tag.patch(), 0);
        assert_eq!(tag.to_string(), "v2.13.0");
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!("1.0.0".parse::<VersionTag>().is_err());
        assert!("v1.0".parse::<VersionTag>().is_err());
        assert!("v1.0.0-beta".parse::<VersionTag>().is_err());
        let err = "vx".parse::<VersionTag>().unwrap_err();
        assert_eq!(err.tag, "vx");
    }

    #[test]
    fn ordering_is_semantic_not_lexical() {
        let nine: VersionTag = "v1.9.0".parse().unwrap();
        let ten: VersionTag = "v1.10.0".parse().unwrap();
        assert!(ten > nine);
        assert!(VersionTag::new(2, 0, 0) > ten);
    }

    #[test]
    fn bumps_reset_lower_components() {
        let tag = VersionTag::new(3, 4, 5);
        assert_eq!(tag.bump_major(), VersionTag::new(4, 0, 0));
        assert_eq!(tag.bump_minor(), VersionTag::new(3, 5, 0));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&VersionTag::initial()).unwrap();
        assert_eq!(json, "\"v1.0.0\"");
        let back: VersionTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VersionTag::initial());
        assert!(serde_json::from_str::<VersionTag>("\"nope\"").is_err());
    }
}
