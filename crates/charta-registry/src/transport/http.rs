//! OCI Distribution API over HTTP.
//!
//! Requests carry Basic credentials from the [`CredentialStore`]. When a
//! registry answers `401` with a `Bearer` challenge, a token is obtained from
//! the advertised realm and the request is replayed once with it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION, WWW_AUTHENTICATE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{accepted_layers, decode_manifest, encode_manifest, Transport};
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, Credentials};
use crate::error::RegistryError;
use crate::oci::{Descriptor, ErrorResponse, Manifest, MediaType};
use crate::reference::Reference;
use crate::store::MemoryStore;

/// Transport that talks to a real registry.
#[derive(Debug)]
pub struct HttpTransport {
    config: ClientConfig,
    http: reqwest::Client,
    credentials: CredentialStore,
}

/// Parsed `WWW-Authenticate: Bearer ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let params = parse_auth_params(params);
        Some(Self {
            realm: params.get("realm")?.clone(),
            service: params.get("service").cloned(),
            scope: params.get("scope").cloned(),
        })
    }
}

/// Splits `key="value",key2=value2` pairs. Quoted values may contain commas.
fn parse_auth_params(input: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_ascii_lowercase();

        let (value, remainder) = if let Some(quoted) = after.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            }
        };

        params.insert(key, value.trim().to_string());
        rest = remainder.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }

    params
}

const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport from client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if TLS material cannot be loaded or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, RegistryError> {
        let http = Self::build_http_client(&config, false)?;
        let credentials = CredentialStore::new(config.credentials_file.clone());
        Ok(Self {
            config,
            http,
            credentials,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the credential store backing this transport.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn base_url(&self, host: &str) -> Result<Url, RegistryError> {
        let raw = format!("{}://{host}/", self.config.scheme());
        Url::parse(&raw).map_err(|e| RegistryError::InvalidReference {
            reference: host.to_string(),
            reason: e.to_string(),
        })
    }

    fn endpoint(&self, reference: &Reference, path: &str) -> Result<Url, RegistryError> {
        let path = format!("v2/{}/{path}", reference.repository());
        self.base_url(&reference.host)?
            .join(&path)
            .map_err(|e| RegistryError::InvalidReference {
                reference: reference.to_string(),
                reason: e.to_string(),
            })
    }

    /// Sends `request`, negotiating a bearer token if the registry asks.
    async fn send(
        &self,
        http: &reqwest::Client,
        request: RequestBuilder,
        credentials: Option<&Credentials>,
    ) -> Result<Response, RegistryError> {
        let replay = request.try_clone();
        let request = match credentials {
            Some(creds) => request.header(AUTHORIZATION, creds.basic_auth_header()),
            None => request,
        };

        let response = request.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(BearerChallenge::parse);
        let (Some(challenge), Some(replay)) = (challenge, replay) else {
            return Ok(response);
        };

        let token = self.fetch_token(http, &challenge, credentials).await?;
        Ok(replay.bearer_auth(token).send().await?)
    }

    async fn fetch_token(
        &self,
        http: &reqwest::Client,
        challenge: &BearerChallenge,
        credentials: Option<&Credentials>,
    ) -> Result<String, RegistryError> {
        let mut url = Url::parse(&challenge.realm).map_err(|e| {
            RegistryError::AuthenticationFailed {
                message: format!("invalid token realm '{}': {e}", challenge.realm),
            }
        })?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(ref service) = challenge.service {
                query.append_pair("service", service);
            }
            if let Some(ref scope) = challenge.scope {
                query.append_pair("scope", scope);
            }
        }

        tracing::debug!(realm = %challenge.realm, scope = ?challenge.scope, "Requesting bearer token");

        let mut request = http.get(url);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::AuthenticationFailed {
                message: format!("token request failed: {}", response.status()),
            });
        }

        let body: TokenResponse = response.json().await?;
        body.token
            .or(body.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RegistryError::AuthenticationFailed {
                message: "token response did not contain a token".to_string(),
            })
    }

    async fn error_from(response: Response) -> RegistryError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = ErrorResponse::summarize(&body);
        if is_auth_failure(status) {
            RegistryError::AuthenticationFailed {
                message: format!("{status}: {message}"),
            }
        } else {
            RegistryError::HttpError {
                status: status.as_u16(),
                message,
            }
        }
    }

    async fn blob_exists(
        &self,
        reference: &Reference,
        digest: &str,
        credentials: Option<&Credentials>,
    ) -> Result<bool, RegistryError> {
        let url = self.endpoint(reference, &format!("blobs/{digest}"))?;
        let response = self
            .send(&self.http, self.http.head(url), credentials)
            .await?;
        if is_auth_failure(response.status()) {
            return Err(Self::error_from(response).await);
        }
        Ok(response.status().is_success())
    }

    /// Uploads a blob with a monolithic POST + PUT.
    async fn upload_blob(
        &self,
        reference: &Reference,
        descriptor: &Descriptor,
        data: &[u8],
        credentials: Option<&Credentials>,
    ) -> Result<(), RegistryError> {
        let start_url = self.endpoint(reference, "blobs/uploads/")?;
        let response = self
            .send(&self.http, self.http.post(start_url.clone()), credentials)
            .await?;

        if is_auth_failure(response.status()) {
            return Err(Self::error_from(response).await);
        }
        if !response.status().is_success() {
            return Err(RegistryError::UploadFailed {
                message: format!("Failed to start upload: {}", response.status()),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::UploadFailed {
                message: "No upload location returned".to_string(),
            })?;

        // Location may be absolute or relative to the registry root.
        let mut upload_url = start_url
            .join(location)
            .map_err(|e| RegistryError::UploadFailed {
                message: format!("Invalid upload location '{location}': {e}"),
            })?;
        upload_url
            .query_pairs_mut()
            .append_pair("digest", &descriptor.digest);

        let request = self
            .http
            .put(upload_url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec());
        let response = self.send(&self.http, request, credentials).await?;

        if is_auth_failure(response.status()) {
            return Err(Self::error_from(response).await);
        }
        if !response.status().is_success() {
            return Err(RegistryError::UploadFailed {
                message: format!(
                    "Failed to upload blob {}: {}",
                    descriptor.digest,
                    response.status()
                ),
            });
        }

        tracing::debug!(digest = %descriptor.digest, size = descriptor.size, "Uploaded blob");
        Ok(())
    }

    async fn fetch_blob(
        &self,
        reference: &Reference,
        descriptor: &Descriptor,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<u8>, RegistryError> {
        let url = self.endpoint(reference, &format!("blobs/{}", descriptor.digest))?;
        let response = self.send(&self.http, self.http.get(url), credentials).await?;

        match response.status() {
            s if s.is_success() => {
                let data = response.bytes().await?.to_vec();
                tracing::debug!(digest = %descriptor.digest, size = data.len(), "Fetched blob");
                Ok(data)
            }
            StatusCode::NOT_FOUND => Err(RegistryError::BlobUnavailable {
                digest: descriptor.digest.clone(),
            }),
            _ => Err(Self::error_from(response).await),
        }
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(
        config: &ClientConfig,
        insecure: bool,
    ) -> Result<reqwest::Client, RegistryError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref tls) = config.tls {
            if tls.insecure_skip_verify {
                builder = builder.danger_accept_invalid_certs(true);
            }

            if let Some(ref ca_cert) = tls.ca_cert {
                let cert_pem = std::fs::read(ca_cert).map_err(|e| RegistryError::IoError {
                    path: ca_cert.clone(),
                    source: e,
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| {
                    RegistryError::InvalidTlsConfig {
                        message: format!("Invalid CA certificate: {e}"),
                    }
                })?;
                builder = builder.add_root_certificate(cert);
            }

            if let (Some(ref cert_path), Some(ref key_path)) = (&tls.client_cert, &tls.client_key)
            {
                let mut cert_pem = std::fs::read(cert_path).map_err(|e| RegistryError::IoError {
                    path: cert_path.clone(),
                    source: e,
                })?;
                let key_pem = std::fs::read(key_path).map_err(|e| RegistryError::IoError {
                    path: key_path.clone(),
                    source: e,
                })?;
                cert_pem.extend_from_slice(&key_pem);

                let identity = reqwest::Identity::from_pem(&cert_pem).map_err(|e| {
                    RegistryError::InvalidTlsConfig {
                        message: format!("Invalid client certificate: {e}"),
                    }
                })?;
                builder = builder.identity(identity);
            }
        }

        builder.build().map_err(|e| RegistryError::InvalidTlsConfig {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn login(
        &self,
        host: &str,
        credentials: &Credentials,
        insecure: bool,
    ) -> Result<(), RegistryError> {
        let http = if insecure {
            Self::build_http_client(&self.config, true)?
        } else {
            self.http.clone()
        };

        let url = self.base_url(host)?.join("v2/").map_err(|e| {
            RegistryError::InvalidReference {
                reference: host.to_string(),
                reason: e.to_string(),
            }
        })?;
        let response = self.send(&http, http.get(url), Some(credentials)).await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        self.credentials.store(host, credentials)?;
        Ok(())
    }

    async fn logout(&self, host: &str) -> Result<(), RegistryError> {
        self.credentials.remove(host)
    }

    async fn push_manifest(
        &self,
        reference: &Reference,
        store: &MemoryStore,
        manifest: &Manifest,
    ) -> Result<Descriptor, RegistryError> {
        let credentials = self.credentials.get(&reference.host)?;

        for descriptor in std::iter::once(&manifest.config).chain(&manifest.layers) {
            let data = store
                .get(descriptor)
                .ok_or_else(|| RegistryError::BlobUnavailable {
                    digest: descriptor.digest.clone(),
                })?;

            if self
                .blob_exists(reference, &descriptor.digest, credentials.as_ref())
                .await?
            {
                tracing::debug!(digest = %descriptor.digest, "Blob already present, skipping upload");
                continue;
            }
            self.upload_blob(reference, descriptor, data, credentials.as_ref())
                .await?;
        }

        let (bytes, descriptor) = encode_manifest(manifest)?;
        let url = self.endpoint(reference, &format!("manifests/{}", reference.manifest_reference()))?;
        let request = self
            .http
            .put(url)
            .header(CONTENT_TYPE, MediaType::OCI_MANIFEST)
            .body(bytes);
        let response = self.send(&self.http, request, credentials.as_ref()).await?;

        if is_auth_failure(response.status()) {
            return Err(Self::error_from(response).await);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::ManifestPushFailed {
                reference: reference.to_string(),
                message: format!("{status}: {}", ErrorResponse::summarize(&body)),
            });
        }

        Ok(descriptor)
    }

    async fn pull_manifest(
        &self,
        reference: &Reference,
        store: &mut MemoryStore,
        allowed_media_types: &[MediaType],
    ) -> Result<(Descriptor, Vec<Descriptor>), RegistryError> {
        let credentials = self.credentials.get(&reference.host)?;

        let url = self.endpoint(reference, &format!("manifests/{}", reference.manifest_reference()))?;
        let request = self.http.get(url).header(ACCEPT, MediaType::OCI_MANIFEST);
        let response = self.send(&self.http, request, credentials.as_ref()).await?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(RegistryError::NotFound {
                    reference: reference.to_string(),
                })
            }
            _ => return Err(Self::error_from(response).await),
        }

        let bytes = response.bytes().await?;
        let (manifest, descriptor) = decode_manifest(reference, &bytes)?;
        let layers = accepted_layers(reference, &manifest, allowed_media_types)?;

        for layer in &layers {
            let data = self
                .fetch_blob(reference, layer, credentials.as_ref())
                .await?;
            store.insert(layer, data)?;
        }

        Ok((descriptor, layers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_bearer_challenge() {
        let challenge = BearerChallenge::parse(
            r#"Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:charts/demo:pull,push""#,
        )
        .unwrap();

        assert_eq!(challenge.realm, "https://auth.example.com/token");
        assert_eq!(challenge.service.as_deref(), Some("registry.example.com"));
        assert_eq!(
            challenge.scope.as_deref(),
            Some("repository:charts/demo:pull,push")
        );
    }

    #[test]
    fn test_parse_challenge_rejects_basic() {
        assert!(BearerChallenge::parse(r#"Basic realm="registry""#).is_none());
        assert!(BearerChallenge::parse("Bearer service=\"x\"").is_none());
    }

    #[test]
    fn test_parse_unquoted_params() {
        let params = parse_auth_params("realm=https://a/token, service=reg");
        assert_eq!(params.get("realm").map(String::as_str), Some("https://a/token"));
        assert_eq!(params.get("service").map(String::as_str), Some("reg"));
    }

    #[test]
    fn test_endpoint_urls() {
        let temp = TempDir::new().unwrap();
        let config = ClientConfig::new()
            .with_credentials_file(temp.path().join("config.json"))
            .with_plain_http(true);
        let transport = HttpTransport::new(config).unwrap();

        let reference = Reference::parse("localhost:5000/charts/demo:1.0.0").unwrap();
        let url = transport.endpoint(&reference, "manifests/1.0.0").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/v2/charts/demo/manifests/1.0.0"
        );
    }

    #[test]
    fn test_missing_ca_cert_is_io_error() {
        let config = ClientConfig::new()
            .with_tls(crate::config::TlsConfig::new().with_ca_cert("/nonexistent/ca.pem"));
        let err = HttpTransport::new(config).unwrap_err();
        assert!(matches!(err, RegistryError::IoError { .. }));
    }
}
