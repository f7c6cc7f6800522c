//! Configuration types for the registry client.

use std::path::PathBuf;
use std::time::Duration;

/// Basename of the credentials file.
pub const CREDENTIALS_FILE_BASENAME: &str = "config.json";

/// Default location of the credentials file
/// (`<user cache dir>/charta/registry/config.json`).
#[must_use]
pub fn default_credentials_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("charta")
        .join("registry")
        .join(CREDENTIALS_FILE_BASENAME)
}

/// Configuration for the registry client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Credentials file, keyed by registry host.
    pub credentials_file: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Talk plain HTTP instead of HTTPS (local registries).
    pub plain_http: bool,

    /// TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// Creates a configuration with default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use charta_registry::ClientConfig;
    ///
    /// let config = ClientConfig::new();
    /// assert!(config.credentials_file.ends_with("charta/registry/config.json"));
    /// assert!(!config.plain_http);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            timeout: Duration::from_secs(30),
            user_agent: format!("charta/{}", env!("CARGO_PKG_VERSION")),
            plain_http: false,
            tls: None,
        }
    }

    /// Sets the credentials file location.
    #[must_use]
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = path.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Switches between plain HTTP and HTTPS.
    #[must_use]
    pub const fn with_plain_http(mut self, plain_http: bool) -> Self {
        self.plain_http = plain_http;
        self
    }

    /// Sets the TLS configuration.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Returns the URL scheme registry requests use.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.plain_http {
            "http"
        } else {
            "https"
        }
    }
}

/// TLS configuration for registry connections.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Path to CA certificate file.
    pub ca_cert: Option<PathBuf>,

    /// Path to client certificate file.
    pub client_cert: Option<PathBuf>,

    /// Path to client private key file.
    pub client_key: Option<PathBuf>,

    /// Whether to skip certificate verification.
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// Creates a new TLS configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ca_cert: None,
            client_cert: None,
            client_key: None,
            insecure_skip_verify: false,
        }
    }

    /// Sets the CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Sets client certificate and key paths for mTLS.
    #[must_use]
    pub fn with_client_cert(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(cert.into());
        self.client_key = Some(key.into());
        self
    }

    /// Skips certificate verification.
    ///
    /// # Warning
    ///
    /// Only for registries with self-signed certificates under test.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.insecure_skip_verify = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = ClientConfig::new();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("charta/"));
        assert_eq!(config.scheme(), "https");
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::new()
            .with_credentials_file("/tmp/creds.json")
            .with_plain_http(true)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.credentials_file, PathBuf::from("/tmp/creds.json"));
        assert_eq!(config.scheme(), "http");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_tls_config() {
        let tls = TlsConfig::new()
            .with_ca_cert("/path/to/ca.crt")
            .with_client_cert("/path/to/client.crt", "/path/to/client.key");

        assert_eq!(tls.ca_cert, Some(PathBuf::from("/path/to/ca.crt")));
        assert_eq!(tls.client_cert, Some(PathBuf::from("/path/to/client.crt")));
        assert_eq!(tls.client_key, Some(PathBuf::from("/path/to/client.key")));
        assert!(!tls.insecure_skip_verify);
        assert!(TlsConfig::new().insecure().insecure_skip_verify);
    }
}
