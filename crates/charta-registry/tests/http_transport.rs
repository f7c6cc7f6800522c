//! HTTP transport tests against a minimal OCI registry served by axum.

mod common;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tempfile::TempDir;

use charta_registry::{
    compute_digest, ClientConfig, CredentialStore, Credentials, ErrorKind, LoginOptions,
    LogoutOptions, PullOptions, PushOptions, RegistryClient, RegistryError,
};
use common::{package_chart, PROVENANCE};

const TOKEN: &str = "mock-token";

#[derive(Default)]
struct MockState {
    blobs: HashMap<String, Vec<u8>>,
    manifests: HashMap<(String, String), Vec<u8>>,
    next_upload: usize,
    uploads: usize,
}

#[derive(Clone, Default)]
struct MockRegistry {
    state: Arc<Mutex<MockState>>,
    user: Option<Credentials>,
    basic_only: bool,
}

impl MockRegistry {
    fn with_user(username: &str, password: &str) -> Self {
        Self {
            user: Some(Credentials::new(username, password)),
            ..Self::default()
        }
    }

    fn with_basic_user(username: &str, password: &str) -> Self {
        Self {
            basic_only: true,
            ..Self::with_user(username, password)
        }
    }

    fn uploads(&self) -> usize {
        self.state.lock().unwrap().uploads
    }
}

fn respond(status: StatusCode, headers: &[(header::HeaderName, String)], body: Vec<u8>) -> Response {
    let mut response = (status, body).into_response();
    for (name, value) in headers {
        response
            .headers_mut()
            .insert(name.clone(), HeaderValue::from_str(value).unwrap());
    }
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn handle(
    State(mock): State<MockRegistry>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();

    if path == "/token" {
        let authorized = mock.user.as_ref().is_some_and(|user| {
            header_str(&headers, &header::AUTHORIZATION) == user.basic_auth_header()
        });
        if !authorized {
            return respond(StatusCode::UNAUTHORIZED, &[], Vec::new());
        }
        let body = serde_json::json!({ "token": TOKEN }).to_string().into_bytes();
        return respond(StatusCode::OK, &[], body);
    }

    let Some(rest) = path.strip_prefix("/v2/") else {
        return respond(StatusCode::NOT_FOUND, &[], Vec::new());
    };

    if mock.basic_only {
        let authorized = mock.user.as_ref().is_some_and(|user| {
            header_str(&headers, &header::AUTHORIZATION) == user.basic_auth_header()
        });
        if !authorized {
            return respond(
                StatusCode::UNAUTHORIZED,
                &[(header::WWW_AUTHENTICATE, r#"Basic realm="mock-registry""#.to_string())],
                Vec::new(),
            );
        }
    } else if mock.user.is_some()
        && header_str(&headers, &header::AUTHORIZATION) != format!("Bearer {TOKEN}")
    {
        let challenge = format!(
            r#"Bearer realm="http://{}/token",service="mock-registry",scope="repository:charts/demo:pull,push""#,
            header_str(&headers, &header::HOST)
        );
        return respond(
            StatusCode::UNAUTHORIZED,
            &[(header::WWW_AUTHENTICATE, challenge)],
            Vec::new(),
        );
    }

    if rest.is_empty() {
        return respond(StatusCode::OK, &[], b"{}".to_vec());
    }

    let mut state = mock.state.lock().unwrap();

    if let Some((repo, reference)) = rest.rsplit_once("/manifests/") {
        if repo == "charts/broken" {
            let body = br#"{"errors":[{"code":"UNKNOWN","message":"storage backend down"}]}"#;
            return respond(StatusCode::INTERNAL_SERVER_ERROR, &[], body.to_vec());
        }

        let key = (repo.to_string(), reference.to_string());
        return match method {
            Method::PUT => {
                let digest = compute_digest(&body);
                state
                    .manifests
                    .insert((repo.to_string(), digest.clone()), body.to_vec());
                state.manifests.insert(key, body.to_vec());
                respond(
                    StatusCode::CREATED,
                    &[(header::HeaderName::from_static("docker-content-digest"), digest)],
                    Vec::new(),
                )
            }
            Method::GET => match state.manifests.get(&key) {
                Some(manifest) => respond(
                    StatusCode::OK,
                    &[(
                        header::CONTENT_TYPE,
                        "application/vnd.oci.image.manifest.v1+json".to_string(),
                    )],
                    manifest.clone(),
                ),
                None => respond(StatusCode::NOT_FOUND, &[], Vec::new()),
            },
            _ => respond(StatusCode::METHOD_NOT_ALLOWED, &[], Vec::new()),
        };
    }

    if let Some((repo, upload)) = rest.split_once("/blobs/uploads/") {
        return match method {
            Method::POST if upload.is_empty() => {
                state.next_upload += 1;
                let location = format!("/v2/{repo}/blobs/uploads/{}", state.next_upload);
                respond(StatusCode::ACCEPTED, &[(header::LOCATION, location)], Vec::new())
            }
            Method::PUT => {
                let digest = url::form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
                    .find(|(key, _)| key == "digest")
                    .map(|(_, value)| value.into_owned())
                    .unwrap_or_default();
                if compute_digest(&body) != digest {
                    return respond(StatusCode::BAD_REQUEST, &[], Vec::new());
                }
                state.blobs.insert(digest, body.to_vec());
                state.uploads += 1;
                respond(StatusCode::CREATED, &[], Vec::new())
            }
            _ => respond(StatusCode::METHOD_NOT_ALLOWED, &[], Vec::new()),
        };
    }

    if let Some((_, digest)) = rest.rsplit_once("/blobs/") {
        return match state.blobs.get(digest) {
            Some(blob) if method == Method::GET => respond(StatusCode::OK, &[], blob.clone()),
            Some(_) => respond(StatusCode::OK, &[], Vec::new()),
            None => respond(StatusCode::NOT_FOUND, &[], Vec::new()),
        };
    }

    respond(StatusCode::NOT_FOUND, &[], Vec::new())
}

async fn start(mock: MockRegistry) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(handle).with_state(mock);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn http_client(temp: &TempDir) -> RegistryClient {
    let config = ClientConfig::new()
        .with_plain_http(true)
        .with_credentials_file(temp.path().join("registry").join("config.json"));
    RegistryClient::new(config).unwrap()
}

// =============================================================================
// Anonymous registry
// =============================================================================

#[tokio::test]
async fn test_http_push_pull_round_trip() {
    let temp = TempDir::new().unwrap();
    let addr = start(MockRegistry::default()).await;
    let client = http_client(&temp);
    let chart = package_chart("demo", "1.0.0");

    let pushed = client
        .push(
            &chart,
            &format!("{addr}/charts"),
            &PushOptions::new().with_provenance(PROVENANCE.to_vec()),
        )
        .await
        .unwrap();
    assert_eq!(pushed.reference, format!("{addr}/charts/demo:1.0.0"));

    let options = PullOptions::new().with_provenance(true);
    let pulled = client.pull(&pushed.reference, &options).await.unwrap();
    assert_eq!(pulled.chart_data(), Some(chart.as_slice()));
    assert_eq!(pulled.provenance_data(), Some(PROVENANCE));
    assert_eq!(pulled.manifest, pushed.manifest);

    let by_digest = client
        .pull(&pushed.ref_with_digest, &PullOptions::new())
        .await
        .unwrap();
    assert_eq!(by_digest.chart_data(), Some(chart.as_slice()));
}

#[tokio::test]
async fn test_http_repush_skips_existing_blobs() {
    let temp = TempDir::new().unwrap();
    let mock = MockRegistry::default();
    let addr = start(mock.clone()).await;
    let client = http_client(&temp);
    let chart = package_chart("demo", "1.0.0");
    let prefix = format!("{addr}/charts");

    client.push(&chart, &prefix, &PushOptions::new()).await.unwrap();
    assert_eq!(mock.uploads(), 2);

    client
        .push(&chart, &prefix, &PushOptions::new().with_tag("latest"))
        .await
        .unwrap();
    assert_eq!(mock.uploads(), 2);
}

#[tokio::test]
async fn test_http_pull_unknown_tag() {
    let temp = TempDir::new().unwrap();
    let addr = start(MockRegistry::default()).await;
    let client = http_client(&temp);

    let err = client
        .pull(&format!("{addr}/charts/demo:0.0.1"), &PullOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[tokio::test]
async fn test_http_registry_error_is_summarized() {
    let temp = TempDir::new().unwrap();
    let addr = start(MockRegistry::default()).await;
    let client = http_client(&temp);

    let err = client
        .pull(&format!("{addr}/charts/broken:1.0.0"), &PullOptions::new())
        .await
        .unwrap_err();
    match err {
        RegistryError::HttpError { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "UNKNOWN: storage backend down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_http_connection_refused_is_transport_error() {
    let temp = TempDir::new().unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = http_client(&temp)
        .pull(&format!("{addr}/charts/demo:1.0.0"), &PullOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

// =============================================================================
// Token-protected registry
// =============================================================================

#[tokio::test]
async fn test_http_login_push_pull_logout() {
    let temp = TempDir::new().unwrap();
    let addr = start(MockRegistry::with_user("ci", "s3cret")).await;
    let client = http_client(&temp);
    let host = addr.to_string();
    let store = CredentialStore::new(temp.path().join("registry").join("config.json"));
    let chart = package_chart("demo", "1.0.0");

    let err = client
        .push(&chart, &format!("{host}/charts"), &PushOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AuthenticationFailed { .. }));

    let err = client
        .login(&host, &LoginOptions::new().basic_auth("ci", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AuthenticationFailed { .. }));
    assert!(store.get(&host).unwrap().is_none());

    client
        .login(&host, &LoginOptions::new().basic_auth("ci", "s3cret"))
        .await
        .unwrap();
    assert_eq!(
        store.get(&host).unwrap(),
        Some(Credentials::new("ci", "s3cret"))
    );

    let pushed = client
        .push(&chart, &format!("{host}/charts"), &PushOptions::new())
        .await
        .unwrap();
    let pulled = client.pull_chart(&pushed.reference).await.unwrap();
    assert_eq!(pulled, chart);

    client.logout(&host, &LogoutOptions::new()).await.unwrap();
    assert!(store.get(&host).unwrap().is_none());

    let err = client
        .logout(&host, &LogoutOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::CredentialsNotFound { .. }));
}

#[tokio::test]
async fn test_http_basic_auth_push_requires_login() {
    let temp = TempDir::new().unwrap();
    let mock = MockRegistry::with_basic_user("ci", "s3cret");
    let addr = start(mock.clone()).await;
    let client = http_client(&temp);
    let host = addr.to_string();
    let chart = package_chart("demo", "1.0.0");

    let err = client
        .push(&chart, &format!("{host}/charts"), &PushOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AuthenticationFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(mock.uploads(), 0);

    client
        .login(&host, &LoginOptions::new().basic_auth("ci", "s3cret"))
        .await
        .unwrap();
    let pushed = client
        .push(&chart, &format!("{host}/charts"), &PushOptions::new())
        .await
        .unwrap();
    assert_eq!(mock.uploads(), 2);

    let pulled = client.pull_chart(&pushed.reference).await.unwrap();
    assert_eq!(pulled, chart);
}
