//! End-to-end tests of the HTTP surface, decrypting relayed tokens the way a
//! recipient would.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use relay::envelope::RelayEnvelope;
use relay::server::{router, state::AppState};
use relay::token::{FingerprintSalt, Token, TokenBuilder};
use rsa::{pkcs8::DecodePrivateKey, RsaPrivateKey};
use url::Url;

const PUBLIC_X509: &str = include_str!("fixtures/rsa2048-public-x509.pem");
const PUBLIC_PKCS1: &str = include_str!("fixtures/rsa2048-public-pkcs1.pem");
const PRIVATE_PKCS8: &str = include_str!("fixtures/rsa2048-private-pkcs8.pem");
const PRIVATE_PKCS1: &str = include_str!("fixtures/rsa2048-private-pkcs1.pem");
const PUBLIC_4096: &str = include_str!("fixtures/rsa4096-public-x509.pem");
const PUBLIC_EC: &str = include_str!("fixtures/ec-p256-public-x509.pem");

const TARGET: &str = "https://client.example.org/oauth/callback";

fn server(header_names: &[&str], fallback: &str) -> TestServer {
    let names = header_names.iter().map(|n| n.to_string()).collect();
    let state = AppState::new(TokenBuilder::new(names, fallback));
    TestServer::new(router::build(state)).unwrap()
}

fn private_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(PRIVATE_PKCS8).unwrap()
}

async fn redirect(
    server: &TestServer,
    key_type: &str,
    public_key: &str,
    header: Option<(&'static str, &'static str)>,
) -> TestResponse {
    let mut request = server
        .get("/flow/redirect/token")
        .add_query_param("target", TARGET)
        .add_query_param("state", "opaque state/42")
        .add_query_param("publicKeyType", key_type)
        .add_query_param("publicKey", public_key);
    if let Some((name, value)) = header {
        request = request.add_header(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    request.await
}

fn location(response: &TestResponse) -> Url {
    let value = response.header("location");
    Url::parse(value.to_str().unwrap()).unwrap()
}

#[tokio::test]
async fn relayed_token_decrypts_to_header_secret() {
    let server = server(&["X-Forwarded-Access-Token"], "");
    let response = redirect(
        &server,
        "rsa2048-rfc5280-x509-pem",
        PUBLIC_X509,
        Some(("x-forwarded-access-token", "Bearer eyJhbGciOi.relay.me")),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
    let url = location(&response);
    assert_eq!(url.scheme(), "https");
    assert_eq!(url.host_str(), Some("client.example.org"));
    assert_eq!(url.path(), "/oauth/callback");

    let (envelope, state) = RelayEnvelope::from_url(&url).unwrap();
    assert_eq!(state, "opaque state/42");

    let token = envelope.open(&private_key()).unwrap();
    assert_eq!(token.secret(), "eyJhbGciOi.relay.me");
    assert_eq!(
        token.fingerprint(),
        FingerprintSalt::default().fingerprint("eyJhbGciOi.relay.me")
    );
}

#[tokio::test]
async fn pkcs1_public_key_is_accepted() {
    let server = server(&["Token"], "");
    let response = redirect(
        &server,
        "rsa2048-rfc8017-pksc1-pem",
        PUBLIC_PKCS1,
        Some(("token", "t0k3n")),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
    let (envelope, _) = RelayEnvelope::from_url(&location(&response)).unwrap();
    assert_eq!(envelope.open(&private_key()).unwrap().secret(), "t0k3n");
}

#[tokio::test]
async fn single_line_public_key_is_accepted() {
    let body: String = PUBLIC_X509
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let pem = format!("-----BEGIN PUBLIC KEY-----\n{body}\n-----END PUBLIC KEY-----");

    let server = server(&["Token"], "");
    let response = redirect(
        &server,
        "rsa2048-rfc5280-x509-pem",
        &pem,
        Some(("token", "one-line")),
    )
    .await;

    assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
    let (envelope, _) = RelayEnvelope::from_url(&location(&response)).unwrap();
    assert_eq!(envelope.open(&private_key()).unwrap().secret(), "one-line");
}

#[tokio::test]
async fn fallback_token_is_relayed() {
    let server = server(&["Token"], "configured-fallback");
    let response = redirect(&server, "rsa2048-rfc5280-x509-pem", PUBLIC_X509, None).await;

    assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
    let (envelope, _) = RelayEnvelope::from_url(&location(&response)).unwrap();
    assert_eq!(
        envelope.open(&private_key()).unwrap().secret(),
        "configured-fallback"
    );
}

#[tokio::test]
async fn every_redirect_uses_fresh_key_material() {
    let server = server(&["Token"], "");
    let header = Some(("token", "same-secret"));
    let first = redirect(&server, "rsa2048-rfc5280-x509-pem", PUBLIC_X509, header).await;
    let second = redirect(&server, "rsa2048-rfc5280-x509-pem", PUBLIC_X509, header).await;

    let (a, _) = RelayEnvelope::from_url(&location(&first)).unwrap();
    let (b, _) = RelayEnvelope::from_url(&location(&second)).unwrap();
    assert_ne!(a.key, b.key);
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.payload, b.payload);

    let key = private_key();
    let ta = a.open(&key).unwrap();
    let tb = b.open(&key).unwrap();
    assert_eq!(ta.fingerprint(), tb.fingerprint());
}

#[tokio::test]
async fn missing_token_is_444() {
    let server = server(&["Foo", "Bar"], "");
    let response = redirect(&server, "rsa2048-rfc5280-x509-pem", PUBLIC_X509, None).await;

    assert_eq!(response.status_code().as_u16(), 444);
    assert_eq!(response.text(), "Token not found. Looking for: Foo, Bar");
}

#[tokio::test]
async fn unsupported_keys_are_client_errors() {
    let server = server(&["Token"], "");
    for (pem, label) in [
        (PUBLIC_4096, "ForbiddenKeySize"),
        (PRIVATE_PKCS1, "NotPublicKey"),
        (PUBLIC_EC, "NotRsaKey"),
        ("no pem here", "PemDecode"),
    ] {
        let response = redirect(
            &server,
            "rsa2048-rfc5280-x509-pem",
            pem,
            Some(("token", "secret")),
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{label}");
        assert!(
            response.text().starts_with(&format!("Bad Request. {label}: ")),
            "{}",
            response.text()
        );
    }
}

#[tokio::test]
async fn unknown_key_type_is_rejected() {
    let server = server(&["Token"], "");
    let response = redirect(&server, "ed25519-pem", PUBLIC_X509, Some(("token", "s"))).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.text().contains("publicKeyType forbidden"));
}

#[tokio::test]
async fn token_endpoint_returns_token_json() {
    let server = server(&["Access-Token", "Authorization"], "");
    let response = server
        .get("/token")
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer abc"),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let token: Token = response.json();
    assert_eq!(token.secret(), "abc");
    assert_eq!(token.fingerprint(), FingerprintSalt::default().fingerprint("abc"));
}
