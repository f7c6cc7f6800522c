//! Registry references.
//!
//! A reference names a manifest: `host[:port]/namespace[/...]/name:tag` or
//! `host[:port]/namespace[/...]/name@sha256:<hex>` (both suffixes may appear
//! together, tag first).

use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// Builds the tag reference a chart is pushed to.
///
/// Joins `prefix` and `name` as path segments and appends `:version`. No
/// validation happens here; the result is checked by [`Reference::parse`].
///
/// # Examples
///
/// ```
/// use charta_registry::build_ref;
///
/// assert_eq!(
///     build_ref("registry.example.com/charts", "demo", "1.0.0"),
///     "registry.example.com/charts/demo:1.0.0"
/// );
/// assert_eq!(
///     build_ref("registry.example.com/charts/", "demo", "1.0.0"),
///     "registry.example.com/charts/demo:1.0.0"
/// );
/// ```
#[must_use]
pub fn build_ref(prefix: &str, name: &str, version: &str) -> String {
    let path = prefix
        .split('/')
        .chain(std::iter::once(name))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("{path}:{version}")
}

/// A parsed registry reference.
///
/// Repository names are not checked against the OCI name grammar, because
/// chart names may legitimately fall outside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Registry host, including the port if one was given.
    pub host: String,
    /// Path between the host and the repository name (may be empty).
    pub namespace: String,
    /// Repository name (the last path segment).
    pub name: String,
    /// Tag, if present.
    pub tag: Option<String>,
    /// Manifest digest, if present.
    pub digest: Option<String>,
}

impl Reference {
    /// Parses a reference string.
    ///
    /// # Examples
    ///
    /// ```
    /// use charta_registry::Reference;
    ///
    /// let r = Reference::parse("localhost:5000/charts/demo:1.0.0").unwrap();
    /// assert_eq!(r.host, "localhost:5000");
    /// assert_eq!(r.repository(), "charts/demo");
    /// assert_eq!(r.tag.as_deref(), Some("1.0.0"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidReference`] if the host, repository
    /// path, or both tag and digest are missing, or the digest is malformed.
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidReference {
            reference: input.to_string(),
            reason: reason.to_string(),
        };

        let (rest, digest) = match input.split_once('@') {
            Some((rest, digest)) => {
                let valid = digest
                    .split_once(':')
                    .is_some_and(|(alg, hex)| !alg.is_empty() && !hex.is_empty());
                if !valid {
                    return Err(invalid("digest must be <algorithm>:<hex>"));
                }
                (rest, Some(digest.to_string()))
            }
            None => (input, None),
        };

        let (host, path) = rest
            .split_once('/')
            .ok_or_else(|| invalid("missing registry host"))?;
        if host.is_empty() {
            return Err(invalid("missing registry host"));
        }

        let (path, tag) = match path.rsplit_once(':') {
            Some((path, tag)) if !tag.contains('/') => {
                if tag.is_empty() {
                    return Err(invalid("empty tag"));
                }
                (path, Some(tag.to_string()))
            }
            _ => (path, None),
        };

        let segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty repository path component"));
        }
        let Some((name, namespace)) = segments.split_last() else {
            return Err(invalid("missing repository name"));
        };

        if tag.is_none() && digest.is_none() {
            return Err(invalid("missing tag or digest"));
        }

        Ok(Self {
            host: host.to_string(),
            namespace: namespace.join("/"),
            name: (*name).to_string(),
            tag,
            digest,
        })
    }

    /// Returns the repository path used in registry API URLs.
    #[must_use]
    pub fn repository(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    /// Returns what the manifest endpoint is addressed by: the digest when
    /// present, otherwise the tag.
    #[must_use]
    pub fn manifest_reference(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or_default()
    }

    /// Returns true if this reference pins a manifest digest.
    #[must_use]
    pub const fn is_digest(&self) -> bool {
        self.digest.is_some()
    }

    /// Returns a copy of this reference pinned to `digest`.
    #[must_use]
    pub fn with_digest(&self, digest: impl Into<String>) -> Self {
        Self {
            digest: Some(digest.into()),
            ..self.clone()
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.repository())?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
