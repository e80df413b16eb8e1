//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with a cookie jar and no redirect following, so tests can
//! assert on the redirect targets the portal answers with.
//!
//! When routes or form fields change, update only this file.

use super::constants::*;
use reqwest::{header, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new client without a session
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in with the given credentials
    ///
    /// # Panics
    ///
    /// Panics if the login is not answered with a redirect to a home view.
    pub async fn logged_in(base_url: String, identity: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(identity, password).await;
        assert_eq!(
            response.status(),
            StatusCode::SEE_OTHER,
            "Login of {} failed",
            identity
        );
        let target = location(&response);
        assert!(
            target.starts_with("/home/"),
            "Login of {} redirected to {}",
            identity,
            target
        );

        client
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// GET /login
    pub async fn login_view(&self, error: bool) -> Response {
        let url = if error {
            format!("{}/login?error=true", self.base_url)
        } else {
            format!("{}/login", self.base_url)
        };
        self.client
            .get(url)
            .send()
            .await
            .expect("Login view request failed")
    }

    /// POST /login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/login", self.base_url))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /logout
    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/logout", self.base_url))
            .send()
            .await
            .expect("Logout request failed")
    }

    // ========================================================================
    // Home Endpoints
    // ========================================================================

    /// GET /home
    pub async fn home(&self) -> Response {
        self.get("/home").await
    }

    /// GET /home/free
    pub async fn home_free(&self) -> Response {
        self.get("/home/free").await
    }

    /// GET /home/premium
    pub async fn home_premium(&self) -> Response {
        self.get("/home/premium").await
    }

    /// GET /
    pub async fn stats(&self) -> Response {
        self.get("/").await
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap_or_else(|err| panic!("GET {} failed: {}", path, err))
    }
}

/// Returns the Location header of a redirect response
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Response has no Location header")
        .to_str()
        .expect("Location header is not ASCII")
        .to_owned()
}

/// Returns the Set-Cookie header of a response
pub fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Response has no Set-Cookie header")
        .to_str()
        .expect("Set-Cookie header is not ASCII")
        .to_owned()
}

/// Reads the body of a response as JSON
pub async fn json_body(response: Response) -> Value {
    response.json().await.expect("Body is not JSON")
}

/// Extracts the titles of a list field of a home body
pub fn titles(body: &Value, field: &str) -> Vec<String> {
    body[field]
        .as_array()
        .unwrap_or_else(|| panic!("Field {} is not a list in {}", field, body))
        .iter()
        .map(|item| item["title"].as_str().unwrap_or_default().to_owned())
        .collect()
}
