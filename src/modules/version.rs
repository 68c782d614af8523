//! Semantic versions for modules and the core.

use std::fmt;
use std::str::FromStr;

/// `major.minor.patch` version triple. Missing trailing parts parse as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The compatibility check used by the module resolver: major and minor
    /// must match, the patch level is free. "Exact semantic match" in the
    /// dependency rules means this, not identity.
    pub fn semantic_version_equal(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError {
    input: String,
}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a version number", self.input)
    }
}

impl std::error::Error for VersionParseError {}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError {
            input: s.to_string(),
        };
        let mut parts = s.split('.');
        let major = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| err())?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().map_err(|_| err())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Version::new(major, minor, patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("1.2.3".parse::<Version>().unwrap(), Version::new(1, 2, 3));
        assert_eq!("2.1".parse::<Version>().unwrap(), Version::new(2, 1, 0));
        assert_eq!("3".parse::<Version>().unwrap(), Version::new(3, 0, 0));
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("one".parse::<Version>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let v = Version::new(0, 9, 11);
        assert_eq!(v.to_string().parse::<Version>().unwrap(), v);
    }

    #[test]
    fn test_semantic_equality_ignores_patch() {
        let a = Version::new(1, 2, 3);
        assert!(a.semantic_version_equal(&Version::new(1, 2, 9)));
        assert!(!a.semantic_version_equal(&Version::new(1, 3, 3)));
        assert!(!a.semantic_version_equal(&Version::new(2, 2, 3)));
    }

    #[test]
    fn test_ordering() {
        assert!(Version::new(1, 2, 3) < Version::new(1, 10, 0));
        assert!(Version::new(2, 0, 0) > Version::new(1, 99, 99));
    }
}
