//! Integration tests for the authentication backend client and the session
//! flows built on it, against a local mock server.

use std::path::PathBuf;

use pagwallet::keys::derive_keypair;
use pagwallet::session::encode_secret_key;
use pagwallet::types::*;
use pagwallet::{AuthService, BackendHttpClient, Session, SessionStore, WalletError};
use serde_json::json;
use solana_sdk::signature::{Keypair, Signer};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: a session file path unique to this test run.
fn temp_session_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("pag-test-{}", rand::random::<u64>()))
        .join("session.json")
}

fn service(server: &MockServer, session_path: &PathBuf) -> AuthService {
    AuthService::new(
        BackendHttpClient::new(&server.uri()),
        SessionStore::new(session_path),
    )
}

fn phrase_keypair() -> Keypair {
    let words: Vec<String> = "legal winner thank year wave sausage worth useful legal winner thank yellow"
        .split_whitespace()
        .map(str::to_string)
        .collect();
    derive_keypair(&words).unwrap()
}

// ---------------------------------------------------------------------------
// BackendHttpClient
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_partial_json(json!({"username": "ana", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendHttpClient::new(&server.uri());
    let resp = client
        .login(&LoginRequest {
            username: "ana".into(),
            password: "hunter22".into(),
        })
        .await
        .unwrap();
    assert_eq!(resp.token, "tok-1");
    assert!(resp.private_key.is_none());
}

#[tokio::test]
async fn test_login_unknown_user_and_bad_password_look_the_same() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_partial_json(json!({"username": "ghost"})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "User not found"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_partial_json(json!({"username": "ana"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid password"})))
        .mount(&server)
        .await;

    let client = BackendHttpClient::new(&server.uri());
    for username in ["ghost", "ana"] {
        let err = client
            .login(&LoginRequest {
                username: username.into(),
                password: "wrongpass".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidCredentials), "{username}: {err}");
    }
}

#[tokio::test]
async fn test_signup_username_taken() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Username already exists"})),
        )
        .mount(&server)
        .await;

    let client = BackendHttpClient::new(&server.uri());
    let err = client
        .signup(&SignupRequest {
            username: "ana".into(),
            password: "hunter22".into(),
            private_key: "c2VjcmV0".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::UsernameTaken));
}

#[tokio::test]
async fn test_check_public_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check-public-key"))
        .and(body_partial_json(json!({"public_key": "[1,2,3]"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "User exists"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/check-public-key"))
        .and(body_partial_json(json!({"public_key": "[9,9,9]"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "User does not exist"})),
        )
        .mount(&server)
        .await;

    let client = BackendHttpClient::new(&server.uri());
    assert!(client.check_public_key("[1,2,3]").await.unwrap());
    assert!(!client.check_public_key("[9,9,9]").await.unwrap());
}

#[tokio::test]
async fn test_get_user_sends_token_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get-user"))
        .and(header("Authorization", "Token tok-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ana"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token."})),
        )
        .mount(&server)
        .await;

    let client = BackendHttpClient::new(&server.uri());
    assert_eq!(client.get_user("tok-9").await.unwrap().username, "ana");
    assert!(matches!(
        client.get_user("stale").await.unwrap_err(),
        WalletError::NoSession
    ));
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/recover"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = BackendHttpClient::new(&server.uri());
    let err = client
        .recover(&RecoverRequest {
            password: "hunter22".into(),
            private_key: "c2VjcmV0".into(),
        })
        .await
        .unwrap_err();
    match &err {
        WalletError::Http { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_transient());
}

// ---------------------------------------------------------------------------
// AuthService
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_signup_stores_session() {
    let server = MockServer::start().await;
    let keypair = phrase_keypair();
    let secret = encode_secret_key(&keypair).to_string();
    Mock::given(method("POST"))
        .and(path("/signup"))
        .and(body_partial_json(json!({"username": "ana", "private_key": secret})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"token": "tok-new"})))
        .expect(1)
        .mount(&server)
        .await;

    let session_path = temp_session_path();
    let auth = service(&server, &session_path);
    let pubkey = keypair.pubkey();
    let session = auth
        .signup("ana", "hunter22", "hunter22", keypair)
        .await
        .unwrap();
    assert_eq!(session.token(), Some("tok-new"));

    let stored = auth.store().require().unwrap();
    assert_eq!(stored.pubkey(), pubkey);
    assert_eq!(stored.token(), Some("tok-new"));
    auth.store().clear().unwrap();
}

#[tokio::test]
async fn test_signup_password_mismatch_never_calls_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"token": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let session_path = temp_session_path();
    let auth = service(&server, &session_path);
    let err = auth
        .signup("ana", "hunter22", "hunter23", Keypair::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::PasswordMismatch));
    assert!(auth.store().load().unwrap().is_none());
}

#[tokio::test]
async fn test_login_uses_backend_key() {
    let server = MockServer::start().await;
    let keypair = phrase_keypair();
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-2",
            "private_key": encode_secret_key(&keypair).to_string(),
        })))
        .mount(&server)
        .await;

    let session_path = temp_session_path();
    let auth = service(&server, &session_path);
    let session = auth.login("ana", "hunter22").await.unwrap();
    assert_eq!(session.pubkey(), keypair.pubkey());
    assert_eq!(auth.store().require().unwrap().token(), Some("tok-2"));
    auth.store().clear().unwrap();
}

#[tokio::test]
async fn test_login_falls_back_to_stored_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-3"})))
        .mount(&server)
        .await;

    let session_path = temp_session_path();
    let auth = service(&server, &session_path);
    let keypair = phrase_keypair();
    let pubkey = keypair.pubkey();
    auth.store().save(&Session::new(keypair, None)).unwrap();

    let session = auth.login("ana", "hunter22").await.unwrap();
    assert_eq!(session.pubkey(), pubkey);
    assert_eq!(session.token(), Some("tok-3"));
    auth.store().clear().unwrap();
}

#[tokio::test]
async fn test_login_without_any_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-4"})))
        .mount(&server)
        .await;

    let session_path = temp_session_path();
    let auth = service(&server, &session_path);
    let err = auth.login("ana", "hunter22").await.unwrap_err();
    assert!(matches!(err, WalletError::MissingSecretKey));
}

#[tokio::test]
async fn test_logout_clears_session_even_if_backend_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout/"))
        .and(header("Authorization", "Token tok-5"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let session_path = temp_session_path();
    let auth = service(&server, &session_path);
    auth.store()
        .save(&Session::new(Keypair::new(), Some("tok-5".into())))
        .unwrap();

    auth.logout().await.unwrap();
    assert!(auth.store().load().unwrap().is_none());
}

#[tokio::test]
async fn test_current_user_without_session() {
    let server = MockServer::start().await;
    let session_path = temp_session_path();
    let auth = service(&server, &session_path);
    assert!(matches!(
        auth.current_user().await.unwrap_err(),
        WalletError::NoSession
    ));
}

#[tokio::test]
async fn test_recovery_checks_registration_then_resets_password() {
    use pagwallet::keys::public_key_payload;
    use pagwallet::{AuthStep, AuthWizard};

    let server = MockServer::start().await;
    let keypair = phrase_keypair();
    Mock::given(method("POST"))
        .and(path("/check-public-key"))
        .and(body_partial_json(json!({"public_key": public_key_payload(&keypair.pubkey())})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "User exists"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/recover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-r"})))
        .expect(1)
        .mount(&server)
        .await;

    let session_path = temp_session_path();
    let auth = service(&server, &session_path);

    let mut wizard = AuthWizard::new();
    wizard.goto(AuthStep::Recover).unwrap();
    wizard
        .derive_recovery(
            &"legal winner thank year wave sausage worth useful legal winner thank yellow"
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>(),
        )
        .unwrap();
    auth.check_recovery(&mut wizard).await.unwrap();
    assert_eq!(wizard.step(), AuthStep::RecoverFinish);

    let recovered = wizard.into_keypair().unwrap();
    let session = auth
        .recover("newpassword", "newpassword", recovered)
        .await
        .unwrap();
    assert_eq!(session.pubkey(), keypair.pubkey());
    assert_eq!(session.token(), Some("tok-r"));
    auth.store().clear().unwrap();
}

#[tokio::test]
async fn test_recovery_of_unregistered_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check-public-key"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "User does not exist"})),
        )
        .mount(&server)
        .await;

    let session_path = temp_session_path();
    let auth = service(&server, &session_path);
    let mut wizard = pagwallet::AuthWizard::new();
    wizard.goto(pagwallet::AuthStep::Recover).unwrap();
    wizard
        .derive_recovery(
            &"legal winner thank year wave sausage worth useful legal winner thank yellow"
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>(),
        )
        .unwrap();
    let err = auth.check_recovery(&mut wizard).await.unwrap_err();
    assert!(matches!(err, WalletError::UnknownPublicKey));
    assert_eq!(wizard.step(), pagwallet::AuthStep::Recover);
}
