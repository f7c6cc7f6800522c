//! Chart version rules.
//!
//! Chart versions are semantic versions:
//! - `1.2.3` → release
//! - `1.2.3-rc.1` → pre-release
//! - `1.2.3+build.7` → build metadata
//!
//! A leading `v` is not part of the version and is rejected, because the
//! version doubles as the registry tag.

use crate::error::{Error, Result};

/// A parsed semantic version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Dot-separated pre-release identifiers, if any.
    pub pre_release: Option<String>,
    /// Dot-separated build identifiers, if any.
    pub build: Option<String>,
}

impl ChartVersion {
    /// Parses a chart version string.
    ///
    /// # Examples
    ///
    /// ```
    /// use charta_core::version::ChartVersion;
    ///
    /// let v = ChartVersion::parse("1.2.3-rc.1").unwrap();
    /// assert_eq!(v.minor, 2);
    /// assert_eq!(v.pre_release.as_deref(), Some("rc.1"));
    ///
    /// assert!(ChartVersion::parse("1.2").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] if the string is not a semantic version.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidMetadata {
            reason: format!("version '{input}' is not a valid semantic version"),
        };

        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (input, None),
        };
        let (core, pre_release) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let major = parse_numeric(parts[0]).ok_or_else(invalid)?;
        let minor = parse_numeric(parts[1]).ok_or_else(invalid)?;
        let patch = parse_numeric(parts[2]).ok_or_else(invalid)?;

        if let Some(pre) = pre_release {
            if !valid_identifiers(pre) {
                return Err(invalid());
            }
        }
        if let Some(build) = build {
            if !valid_identifiers(build) {
                return Err(invalid());
            }
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre_release: pre_release.map(ToString::to_string),
            build: build.map(ToString::to_string),
        })
    }
}

impl std::fmt::Display for ChartVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.pre_release {
            write!(f, "-{pre}")?;
        }
        if let Some(ref build) = self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

/// Numeric components are plain digits without leading zeros.
fn parse_numeric(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

fn valid_identifiers(s: &str) -> bool {
    s.split('.').all(|ident| {
        !ident.is_empty()
            && ident
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}
