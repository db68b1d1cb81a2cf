//! End-to-end protocol checks against an in-process fake registry

mod common;

use common::{FakeRegistry, Request, Response, closed_port};
use docker_registry_client::{
    ApiVersion, ClientOptions, Credentials, LOGIN_SUCCEEDED, LoginOptions, RegistryError,
    TransportConfig, create_client, create_client_v2, login, login_v2, ping_index_v1, ping_v2,
    registry::CapabilityProbe, registry::v1::ACCOUNT_CREATED,
};
use serde_json::json;
use std::time::Duration;

const V2_HEADER: &str = "docker-distribution-api-version";

fn transport() -> TransportConfig {
    TransportConfig::default()
        .with_timeout(Duration::from_secs(10))
        .without_proxy()
}

fn bob() -> Credentials {
    Credentials::new("bob", "hunter2")
}

fn basic_header(credentials: &Credentials) -> String {
    format!("Basic {}", credentials.to_docker_auth())
}

fn is_bob(request: &Request) -> bool {
    request.header("authorization") == Some(basic_header(&bob()).as_str())
}

fn login_options(registry: &FakeRegistry, credentials: Credentials) -> LoginOptions {
    LoginOptions::new(credentials)
        .with_index(registry.index())
        .with_transport(transport())
}

fn client_options(registry: &FakeRegistry) -> ClientOptions {
    ClientOptions::new(format!("{}/team/app", registry.index())).with_transport(transport())
}

/// v2 registry that hands out tokens at `/token` for bob:hunter2
fn token_registry(request: &Request, base_url: &str) -> Response {
    match (request.method.as_str(), request.route()) {
        ("GET", "/v2/") => Response::json(401, json!({"errors": [{"code": "UNAUTHORIZED"}]}))
            .header(V2_HEADER, "registry/2.0")
            .header(
                "www-authenticate",
                &format!(r#"Bearer realm="{}/token",service="fake-registry""#, base_url),
            ),
        ("GET", "/token") if is_bob(request) => {
            Response::json(200, json!({"token": "abc123", "expires_in": 300}))
        }
        ("GET", "/token") => Response::json(401, json!({"details": "incorrect username or password"})),
        ("GET", "/v2/team/app/tags/list") => {
            Response::json(200, json!({"name": "team/app", "tags": ["1.0", "latest"]}))
        }
        _ => Response::new(404),
    }
}

/// v2 registry protected by basic auth on `/v2/` itself
fn basic_registry(request: &Request, _base_url: &str) -> Response {
    match request.route() {
        "/v2/" if is_bob(request) => {
            Response::json(200, json!({})).header(V2_HEADER, "registry/2.0")
        }
        "/v2/" => Response::new(401)
            .header(V2_HEADER, "registry/2.0")
            .header("www-authenticate", r#"Basic realm="Registry Realm""#),
        _ => Response::new(404),
    }
}

/// v2 registry whose tag listing needs a pull token. Anonymous callers get
/// `anon`, bob gets `bob-token`.
fn private_tags_registry(request: &Request, base_url: &str) -> Response {
    let challenge = format!(
        r#"Bearer realm="{}/token",service="fake-registry",scope="repository:team/app:pull""#,
        base_url
    );
    match request.route() {
        "/v2/" => Response::new(401)
            .header(V2_HEADER, "registry/2.0")
            .header("www-authenticate", &format!(r#"Bearer realm="{}/token""#, base_url)),
        "/token" if is_bob(request) => Response::json(200, json!({"token": "bob-token"})),
        "/token" if request.header("authorization").is_none() => {
            Response::json(200, json!({"access_token": "anon"}))
        }
        "/token" => Response::new(401),
        "/v2/team/app/tags/list"
            if matches!(
                request.header("authorization"),
                Some("Bearer anon") | Some("Bearer bob-token")
            ) =>
        {
            Response::json(200, json!({"name": "team/app", "tags": ["2.0", "edge"]}))
        }
        "/v2/team/app/tags/list" => Response::new(401)
            .header(V2_HEADER, "registry/2.0")
            .header("www-authenticate", &challenge),
        _ => Response::new(404),
    }
}

/// Index without a v2 API, where bob already has an account
fn v1_index(request: &Request, _base_url: &str) -> Response {
    match (request.method.as_str(), request.route()) {
        ("GET", "/v1/_ping") => Response::json(200, json!(true)),
        ("POST", "/v1/users/") if request.body.contains("\"username\":\"bob\"") => {
            Response::json(400, json!("Username or email already exists"))
        }
        ("POST", "/v1/users/") => Response::json(201, json!("User created")),
        ("GET", "/v1/users/") if is_bob(request) => {
            Response::json(200, json!("OK"))
        }
        ("GET", "/v1/users/") => Response::json(401, json!("Wrong login/password")),
        ("GET", "/v1/repositories/team/app/tags") => {
            Response::json(200, json!({"latest": "abc", "0.9": "def"}))
        }
        _ => Response::new(404),
    }
}

#[tokio::test]
async fn bearer_login_pings_once() {
    let registry = FakeRegistry::start(token_registry).await;

    let result = login(&login_options(&registry, bob())).await.unwrap();

    assert_eq!(result.status, LOGIN_SUCCEEDED);
    assert_eq!(registry.hits("GET /v2/"), 1);
    assert_eq!(registry.hits("GET /token"), 1);
    assert_eq!(registry.hits("POST /v1/"), 0);

    let token_request = registry
        .requests()
        .into_iter()
        .find(|line| line.starts_with("GET /token"))
        .unwrap();
    assert!(token_request.contains("service=fake-registry"));
    assert!(token_request.contains("account=bob"));
}

#[tokio::test]
async fn bearer_login_rejects_bad_password() {
    let registry = FakeRegistry::start(token_registry).await;

    let err = login(&login_options(&registry, Credentials::new("bob", "nope")))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Auth(_)), "got {:?}", err);
    assert_eq!(registry.hits("GET /v2/"), 1);
}

#[tokio::test]
async fn basic_login_verifies_against_v2_root() {
    let registry = FakeRegistry::start(basic_registry).await;

    let result = login(&login_options(&registry, bob())).await.unwrap();
    assert_eq!(result.status, LOGIN_SUCCEEDED);
    // probe plus the authenticated check
    assert_eq!(registry.hits("GET /v2/"), 2);

    let err = login(&login_options(&registry, Credentials::new("bob", "nope")))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Auth(_)), "got {:?}", err);
}

#[tokio::test]
async fn v2_login_without_probe_pings_on_its_own() {
    let registry = FakeRegistry::start(token_registry).await;

    let result = login_v2(&login_options(&registry, bob())).await.unwrap();

    assert_eq!(result.status, LOGIN_SUCCEEDED);
    assert_eq!(registry.hits("GET /v2/"), 1);
}

#[tokio::test]
async fn missing_v2_api_falls_back_to_v1_login() {
    let registry = FakeRegistry::start(v1_index).await;

    let result = login(&login_options(&registry, bob())).await.unwrap();

    assert_eq!(result.status, LOGIN_SUCCEEDED);
    assert_eq!(
        registry.requests(),
        vec!["GET /v2/", "POST /v1/users/", "GET /v1/users/"]
    );
}

#[tokio::test]
async fn v1_login_reports_wrong_password_and_new_accounts() {
    let registry = FakeRegistry::start(v1_index).await;

    let err = login(&login_options(&registry, Credentials::new("bob", "nope")))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Auth(_)), "got {:?}", err);

    let created = login(&login_options(&registry, Credentials::new("carol", "pw")))
        .await
        .unwrap();
    assert_eq!(created.status, ACCOUNT_CREATED);
}

#[tokio::test]
async fn unreachable_registry_is_a_transport_error() {
    let index = closed_port().await;
    let options = LoginOptions::new(bob())
        .with_index(index)
        .with_transport(transport());

    let err = login(&options).await.unwrap_err();

    assert!(err.is_transport(), "got {:?}", err);
}

#[tokio::test]
async fn v2_ping_keeps_response_and_error() {
    let registry = FakeRegistry::start(token_registry).await;

    let outcome = ping_v2(Some(registry.addr.as_str()), &transport()).await;

    let response = outcome.response.unwrap();
    assert_eq!(response.status.as_u16(), 401);
    assert!(response.header("www-authenticate").is_some());
    assert_eq!(outcome.error.and_then(|e| e.status()), Some(401));
}

#[tokio::test]
async fn v2_ping_of_v1_index_is_a_404() {
    let registry = FakeRegistry::start(v1_index).await;

    let outcome = ping_v2(Some(registry.addr.as_str()), &transport()).await;
    assert_eq!(outcome.response.map(|r| r.status.as_u16()), Some(404));

    let response = ping_index_v1(Some(registry.addr.as_str()), &transport())
        .await
        .unwrap();
    assert!(response.status.is_success());
}

#[tokio::test]
async fn supports_v2_reads_the_version_header() {
    let v2 = FakeRegistry::start(token_registry).await;
    let v1 = FakeRegistry::start(v1_index).await;

    assert!(create_client_v2(&client_options(&v2)).unwrap().supports_v2().await.unwrap());
    assert!(!create_client_v2(&client_options(&v1)).unwrap().supports_v2().await.unwrap());
}

#[tokio::test]
async fn create_client_detects_v2() {
    let registry = FakeRegistry::start(token_registry).await;

    let client = create_client(&client_options(&registry)).await.unwrap();

    assert_eq!(client.api_version(), ApiVersion::V2);
    assert_eq!(client.repo().remote_name, "team/app");
    assert_eq!(client.list_tags().await.unwrap(), vec!["1.0", "latest"]);
}

#[tokio::test]
async fn create_client_falls_back_to_v1() {
    let registry = FakeRegistry::start(v1_index).await;

    let client = create_client(&client_options(&registry)).await.unwrap();

    assert_eq!(client.api_version(), ApiVersion::V1);
    assert_eq!(client.list_tags().await.unwrap(), vec!["0.9", "latest"]);
    assert_eq!(registry.hits("GET /v2/"), 1);
}

#[tokio::test]
async fn create_client_with_bad_version_does_no_io() {
    let registry = FakeRegistry::start(token_registry).await;

    let err = create_client(&client_options(&registry).with_version(3))
        .await
        .unwrap_err();

    assert_eq!(err, RegistryError::InvalidVersion(3));
    assert!(registry.requests().is_empty());
}

#[tokio::test]
async fn create_client_with_explicit_version_does_no_io() {
    let registry = FakeRegistry::start(v1_index).await;

    let client = create_client(&client_options(&registry).with_version(2))
        .await
        .unwrap();

    assert_eq!(client.api_version(), ApiVersion::V2);
    assert!(registry.requests().is_empty());
}

#[tokio::test]
async fn tag_listing_fetches_an_anonymous_token() {
    let registry = FakeRegistry::start(private_tags_registry).await;

    let client = create_client(&client_options(&registry)).await.unwrap();

    assert_eq!(client.api_version(), ApiVersion::V2);
    assert_eq!(client.list_tags().await.unwrap(), vec!["2.0", "edge"]);
    assert_eq!(registry.hits("GET /v2/team/app/tags/list"), 2);

    let token_request = registry
        .requests()
        .into_iter()
        .find(|line| line.starts_with("GET /token"))
        .unwrap();
    assert!(token_request.contains("scope=repository%3Ateam%2Fapp%3Apull"));
    assert!(!token_request.contains("account="));
}

#[tokio::test]
async fn tag_listing_uses_client_credentials() {
    let registry = FakeRegistry::start(private_tags_registry).await;

    let client = create_client(&client_options(&registry).with_credentials(bob()))
        .await
        .unwrap();

    assert_eq!(client.list_tags().await.unwrap(), vec!["2.0", "edge"]);
    assert_eq!(registry.hits("GET /token?"), 1);
    assert!(registry.requests().iter().any(|line| line.contains("account=bob")));

    let denied = create_client(
        &client_options(&registry).with_credentials(Credentials::new("bob", "nope")),
    )
    .await
    .unwrap();
    let err = denied.list_tags().await.unwrap_err();
    assert!(matches!(err, RegistryError::Auth(_)), "got {:?}", err);
}
