//! Registry credential storage.
//!
//! Credentials live in a Docker-compatible JSON file keyed by registry host:
//!
//! ```json
//! { "auths": { "localhost:5000": { "auth": "dXNlcjpwYXNz" } } }
//! ```
//!
//! Keys this module does not understand are preserved on rewrite, so the
//! file can be shared with other tools.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Username/password pair for a registry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password or token.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns `base64(username:password)`.
    #[must_use]
    pub fn encode(&self) -> String {
        base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password))
    }

    /// Decodes a `base64(username:password)` string.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AuthenticationFailed`] if the value is not
    /// base64 or lacks the `:` separator.
    pub fn decode(auth: &str) -> Result<Self, RegistryError> {
        let malformed = || RegistryError::AuthenticationFailed {
            message: "malformed stored credentials".to_string(),
        };
        let raw = base64::engine::general_purpose::STANDARD
            .decode(auth.trim())
            .map_err(|_| malformed())?;
        let raw = String::from_utf8(raw).map_err(|_| malformed())?;
        let (username, password) = raw.split_once(':').ok_or_else(malformed)?;
        Ok(Self::new(username, password))
    }

    /// Returns the value of a Basic `Authorization` header.
    #[must_use]
    pub fn basic_auth_header(&self) -> String {
        format!("Basic {}", self.encode())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    auths: BTreeMap<String, AuthEntry>,

    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AuthEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    auth: String,

    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

/// File-backed credential store keyed by registry host.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store backed by `path`. The file is created on first write.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use charta_registry::{CredentialStore, Credentials};
    ///
    /// let store = CredentialStore::new("/tmp/charta/config.json");
    /// store.store("localhost:5000", &Credentials::new("user", "pass"))?;
    /// assert!(store.get("localhost:5000")?.is_some());
    /// # Ok::<(), charta_registry::RegistryError>(())
    /// ```
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up credentials for `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn get(&self, host: &str) -> Result<Option<Credentials>, RegistryError> {
        let file = self.load()?;
        match file.auths.get(host) {
            Some(entry) if !entry.auth.is_empty() => Credentials::decode(&entry.auth).map(Some),
            _ => Ok(None),
        }
    }

    /// Saves credentials for `host`, replacing any existing entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn store(&self, host: &str, credentials: &Credentials) -> Result<(), RegistryError> {
        let mut file = self.load()?;
        file.auths.entry(host.to_string()).or_default().auth = credentials.encode();
        self.save(&file)?;
        tracing::debug!(host, path = ?self.path, "Stored registry credentials");
        Ok(())
    }

    /// Removes the entry for `host`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CredentialsNotFound`] if there is no entry,
    /// or an I/O error if the file cannot be rewritten.
    pub fn remove(&self, host: &str) -> Result<(), RegistryError> {
        let mut file = self.load()?;
        if file.auths.remove(host).is_none() {
            return Err(RegistryError::CredentialsNotFound {
                host: host.to_string(),
            });
        }
        self.save(&file)?;
        tracing::debug!(host, path = ?self.path, "Removed registry credentials");
        Ok(())
    }

    /// Lists hosts with stored credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn hosts(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.load()?.auths.into_keys().collect())
    }

    fn load(&self) -> Result<CredentialsFile, RegistryError> {
        if !self.path.exists() {
            return Ok(CredentialsFile::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| RegistryError::IoError {
            path: self.path.clone(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(CredentialsFile::default());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, file: &CredentialsFile) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RegistryError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(&self.path, serde_json::to_string_pretty(file)?).map_err(|e| {
            RegistryError::IoError {
                path: self.path.clone(),
                source: e,
            }
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| RegistryError::IoError {
                    path: self.path.clone(),
                    source: e,
                },
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (CredentialStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("registry").join("config.json"));
        (store, temp_dir)
    }

    #[test]
    fn test_credentials_encode_decode() {
        let creds = Credentials::new("myuser", "my:pass");
        let decoded = Credentials::decode(&creds.encode()).unwrap();
        assert_eq!(decoded, creds);
        assert!(creds.basic_auth_header().starts_with("Basic "));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("myuser", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("myuser"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Credentials::decode("!!!").is_err());
        let no_colon = base64::engine::general_purpose::STANDARD.encode("nocolon");
        assert!(Credentials::decode(&no_colon).is_err());
    }

    #[test]
    fn test_get_without_file() {
        let (store, _temp) = test_store();
        assert!(store.get("localhost:5000").unwrap().is_none());
        assert!(store.hosts().unwrap().is_empty());
    }

    #[test]
    fn test_store_get_remove() {
        let (store, _temp) = test_store();
        let creds = Credentials::new("user", "pass");

        store.store("localhost:5000", &creds).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.get("localhost:5000").unwrap(), Some(creds));
        assert_eq!(store.hosts().unwrap(), vec!["localhost:5000".to_string()]);

        store.remove("localhost:5000").unwrap();
        assert!(store.get("localhost:5000").unwrap().is_none());
    }

    #[test]
    fn test_remove_unknown_host() {
        let (store, _temp) = test_store();
        let err = store.remove("this-host-aint-real:5000").unwrap_err();
        assert!(matches!(err, RegistryError::CredentialsNotFound { .. }));
    }

    #[test]
    fn test_foreign_keys_are_preserved() {
        let (store, _temp) = test_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"auths":{"ghcr.io":{"auth":"dTpw","email":"a@b.c"}},"credsStore":"desktop"}"#,
        )
        .unwrap();

        store
            .store("localhost:5000", &Credentials::new("user", "pass"))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["credsStore"], "desktop");
        assert_eq!(raw["auths"]["ghcr.io"]["email"], "a@b.c");
        assert_eq!(
            store.get("ghcr.io").unwrap(),
            Some(Credentials::new("u", "p"))
        );
    }
}
