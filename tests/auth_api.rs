use journal_lite::auth::{AuthService, CredentialHasher};
use journal_lite::clock::SystemClock;
use journal_lite::configuration::AuthSettings;
use journal_lite::credentials::{CredentialRecord, CredentialStore, InMemoryCredentialStore};
use journal_lite::startup::run;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/login", self.address))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn login_tokens(&self) -> (String, String) {
        let body: Value = self.login("alice", "correct-pw").await.json().await.unwrap();
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryCredentialStore::new());
    let hash = CredentialHasher::new(4).hash("correct-pw").unwrap();
    store
        .insert(CredentialRecord::new("alice", hash))
        .await
        .unwrap();

    let mut settings = AuthSettings::with_secret("integration-test-secret");
    settings.hash_cost = 4;
    let auth = AuthService::from_settings(&settings, store, Arc::new(SystemClock))
        .expect("Failed to build auth service");

    let server = run(listener, Arc::new(auth), settings).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp { address, client }
}

fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/health_check", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

// --- Login ---

#[tokio::test]
async fn login_returns_tokens_and_sets_cookies() {
    let app = spawn_app().await;

    let response = app.login("alice", "correct-pw").await;
    assert_eq!(200, response.status().as_u16());

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    for name in ["access_token=", "refresh_token="] {
        let cookie = cookies
            .iter()
            .find(|c| c.starts_with(name))
            .unwrap_or_else(|| panic!("missing {}", name));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
    }

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 300);
    assert_eq!(body["refresh_expires_in"], 259_200);
    assert_ne!(body["access_token"], body["refresh_token"]);
}

#[tokio::test]
async fn login_accepts_form_data() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/login", app.address))
        .form(&[("username", "alice"), ("password", "correct-pw")])
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn wrong_password_and_unknown_user_get_identical_responses() {
    let app = spawn_app().await;

    let wrong = app.login("alice", "wrong-pw").await;
    let unknown = app.login("nobody", "correct-pw").await;

    assert_eq!(401, wrong.status().as_u16());
    assert_eq!(401, unknown.status().as_u16());
    assert!(set_cookies(&wrong).is_empty());

    let wrong: Value = wrong.json().await.unwrap();
    let unknown: Value = unknown.json().await.unwrap();
    assert_eq!(wrong["message"], "Invalid username or password.");
    assert_eq!(wrong["message"], unknown["message"]);
    assert_eq!(wrong["code"], unknown["code"]);
}

// --- Protected routes ---

#[tokio::test]
async fn me_without_token_is_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn me_with_bearer_and_cookie_tokens() {
    let app = spawn_app().await;
    let (access, _) = app.login_tokens().await;

    let bearer = app
        .client
        .get(&format!("{}/api/me", app.address))
        .bearer_auth(&access)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, bearer.status().as_u16());
    let body: Value = bearer.json().await.unwrap();
    assert!(body["account_id"].as_str().is_some());

    let cookie = app
        .client
        .get(&format!("{}/api/me", app.address))
        .header("Cookie", format!("access_token={}", access))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, cookie.status().as_u16());
}

#[tokio::test]
async fn refresh_token_cannot_reach_protected_routes() {
    let app = spawn_app().await;
    let (_, refresh) = app.login_tokens().await;

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .bearer_auth(&refresh)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn htmx_request_without_token_is_redirected_to_login() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .header("HX-Request", "true")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(302, response.status().as_u16());
    assert_eq!(response.headers()["location"], "/");
    assert_eq!(response.headers()["hx-redirect"], "/");
    assert_eq!(set_cookies(&response).len(), 2);
}

#[tokio::test]
async fn html_navigation_with_tampered_token_is_redirected() {
    let app = spawn_app().await;
    let (access, _) = app.login_tokens().await;

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .header("Accept", "text/html,application/xhtml+xml")
        .header("Cookie", format!("access_token={}x", access))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(302, response.status().as_u16());
    assert!(response.headers().get("hx-redirect").is_none());
}

// --- Refresh ---

#[tokio::test]
async fn refresh_with_body_token() {
    let app = spawn_app().await;
    let (_, refresh) = app.login_tokens().await;

    let response = app
        .client
        .post(&format!("{}/refresh", app.address))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(set_cookies(&response).len(), 2);
    let body: Value = response.json().await.unwrap();
    assert!(body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn refresh_with_cookie_token() {
    let app = spawn_app().await;
    let (_, refresh) = app.login_tokens().await;

    let response = app
        .client
        .post(&format!("{}/refresh", app.address))
        .header("Cookie", format!("refresh_token={}", refresh))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_access_token_and_missing_token() {
    let app = spawn_app().await;
    let (access, _) = app.login_tokens().await;

    let wrong_kind = app
        .client
        .post(&format!("{}/refresh", app.address))
        .json(&json!({ "refresh_token": access }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, wrong_kind.status().as_u16());

    let missing = app
        .client
        .post(&format!("{}/refresh", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(401, missing.status().as_u16());

    let refresh_body: Value = wrong_kind.json().await.unwrap();
    let guard = app
        .client
        .get(&format!("{}/api/me", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    let guard_body: Value = guard.json().await.unwrap();
    assert_eq!(refresh_body["code"], guard_body["code"]);
    assert_eq!(refresh_body["message"], guard_body["message"]);
}

// --- Logout ---

#[tokio::test]
async fn logout_expires_both_cookies() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/logout", app.address))
        .header("HX-Request", "true")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(response.headers()["hx-redirect"], "/");

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    for cookie in &cookies {
        assert!(cookie.contains("Max-Age=0"));
    }
}

// --- Registration ---

#[tokio::test]
async fn register_then_login_then_duplicate() {
    let app = spawn_app().await;
    let body = json!({
        "username": "bob",
        "password": "Str0ngPassword",
        "password_confirmation": "Str0ngPassword"
    });

    let created = app
        .client
        .post(&format!("{}/accounts", app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(201, created.status().as_u16());

    assert_eq!(200, app.login("bob", "Str0ngPassword").await.status().as_u16());

    let duplicate = app
        .client
        .post(&format!("{}/accounts", app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(409, duplicate.status().as_u16());
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let app = spawn_app().await;
    let test_cases = vec![
        (
            json!({"username": "carol", "password": "Str0ngPassword", "password_confirmation": "Different1A"}),
            "mismatched confirmation",
        ),
        (
            json!({"username": "carol", "password": "weak"}),
            "weak password",
        ),
        (
            json!({"username": "a!", "password": "Str0ngPassword"}),
            "invalid username",
        ),
    ];

    for (body, description) in test_cases {
        let response = app
            .client
            .post(&format!("{}/accounts", app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            description
        );
    }
}
