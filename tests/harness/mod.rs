//! Accessibility DSL shared by the endpoint test suites
//!
//! Boots the API in memory, signs up three users (one of them an admin) and
//! lets a test state what a caller may do with an endpoint:
//!
//! ```rust,ignore
//! mod harness;
//! use harness::*;
//!
//! let app = TestApp::start().await;
//! should_be::disabled(&app, &Endpoint::get("/interactions"), &app.owner).await;
//! ```

#![allow(dead_code)]

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum_test::{TestResponse, TestServer};
use jobtrack::identity::ADMIN_ROLE;
use jobtrack::prelude::*;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

pub const API_ROOT: &str = "/api";

pub const PASSWORD: &str = "correct horse battery staple";

// ---------------------------------------------------------------------------
// Callers
// ---------------------------------------------------------------------------

/// Who performs a request
#[derive(Debug, Clone)]
pub struct Caller {
    pub name: &'static str,
    pub token: Option<String>,
    pub user_id: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous",
            token: None,
            user_id: None,
        }
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Verb and path relative to the REST root, with `:id` / `:fk` placeholders
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub verb: Method,
    pub path: String,
}

impl Endpoint {
    pub fn new(verb: Method, path: &str) -> Self {
        Self {
            verb,
            path: format!("{}{}", API_ROOT, path),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn head(path: &str) -> Self {
        Self::new(Method::HEAD, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_id(&self, id: &str) -> Self {
        Self {
            verb: self.verb.clone(),
            path: self.path.replace(":id", id),
        }
    }

    pub fn with_fk(&self, fk: &str) -> Self {
        Self {
            verb: self.verb.clone(),
            path: self.path.replace(":fk", fk),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.verb, self.path)
    }
}

// ---------------------------------------------------------------------------
// Application under test
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub host: Arc<AppHost>,
    pub server: TestServer,
    pub anonymous: Caller,

    /// `testuser1`, logged in but owning nothing the tests create
    pub authenticated: Caller,

    /// `testuser2`, owner of every instance created through [`TestApp::create_owned`]
    pub owner: Caller,

    /// `testadmin`, holder of the `admin` role
    pub admin: Caller,
}

pub fn test_settings() -> ServerSettings {
    ServerSettings::for_environment(Environment::Test)
}

impl TestApp {
    /// The shipped job-tracking models
    pub async fn start() -> Self {
        Self::start_with(AppBuilder::new().with_settings(test_settings())).await
    }

    pub async fn start_with(builder: AppBuilder) -> Self {
        let host = Arc::new(builder.build_host().await.expect("application should build"));
        let router = RestExposure::build_router(host.clone()).expect("router should build");
        let server = TestServer::try_new(router).expect("test server should start");

        let authenticated = sign_up(&server, "authenticated", "testuser1").await;
        let owner = sign_up(&server, "owner", "testuser2").await;
        let admin = sign_up(&server, "admin", "testadmin").await;

        let admin_id = Uuid::parse_str(admin.user_id()).expect("admin should have an id");
        host.roles
            .assign_role(&admin_id, ADMIN_ROLE)
            .expect("admin role should exist");

        Self {
            host,
            server,
            anonymous: Caller::anonymous(),
            authenticated,
            owner,
            admin,
        }
    }

    pub async fn call(&self, endpoint: &Endpoint, caller: &Caller, body: Option<&Value>) -> TestResponse {
        send(&self.server, endpoint, caller, body).await
    }

    /// Create an instance as the owner and return its id
    pub async fn create_owned(&self, plural: &str, data: Value) -> String {
        self.create_as(&self.owner, plural, data).await
    }

    pub async fn create_as(&self, caller: &Caller, plural: &str, data: Value) -> String {
        let endpoint = Endpoint::post(&format!("/{}", plural));
        let response = self.call(&endpoint, caller, Some(&data)).await;
        response.assert_status_ok();

        response.json::<Value>()["id"]
            .as_str()
            .expect("created instance should carry an id")
            .to_string()
    }
}

async fn send(server: &TestServer, endpoint: &Endpoint, caller: &Caller, body: Option<&Value>) -> TestResponse {
    let mut request = server.method(endpoint.verb.clone(), &endpoint.path);

    if let Some(token) = &caller.token {
        let value = HeaderValue::from_str(token).expect("token should be a valid header value");
        request = request.add_header(AUTHORIZATION, value);
    }
    if let Some(body) = body {
        request = request.json(body);
    }

    request.await
}

/// Register `username` and log them in
async fn sign_up(server: &TestServer, name: &'static str, username: &str) -> Caller {
    let anonymous = Caller::anonymous();

    let response = send(
        server,
        &Endpoint::post("/users"),
        &anonymous,
        Some(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": PASSWORD,
        })),
    )
    .await;
    response.assert_status_ok();
    let user: Value = response.json();

    let response = send(
        server,
        &Endpoint::post("/users/login"),
        &anonymous,
        Some(&json!({ "username": username, "password": PASSWORD })),
    )
    .await;
    response.assert_status_ok();
    let token: Value = response.json();

    Caller {
        name,
        token: token["id"].as_str().map(str::to_string),
        user_id: user["id"].as_str().map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Expectations
// ---------------------------------------------------------------------------

pub fn have_status_code(response: &TestResponse, code: StatusCode) {
    assert_eq!(
        response.status_code(),
        code,
        "unexpected status, body: {}",
        response.text()
    );
}

pub fn not_have_status_codes(response: &TestResponse, codes: &[StatusCode]) {
    assert!(
        !codes.contains(&response.status_code()),
        "status {} is one of {:?}, body: {}",
        response.status_code(),
        codes,
        response.text()
    );
}

pub fn match_content_type(response: &TestResponse, pattern: &str) {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let pattern = Regex::new(pattern).expect("content type pattern should compile");

    assert!(
        pattern.is_match(content_type),
        "content type '{}' does not match {}",
        content_type,
        pattern
    );
}

pub const JSON: &str = ".*json.*";

pub mod should_be {
    use super::*;

    /// The endpoint answers as if it did not exist
    pub async fn disabled(app: &TestApp, endpoint: &Endpoint, caller: &Caller) {
        let response = app.call(endpoint, caller, None).await;
        let status = response.status_code();
        assert!(
            status == StatusCode::NOT_FOUND || status == StatusCode::INTERNAL_SERVER_ERROR,
            "{} should be disabled for {}, got {}",
            endpoint,
            caller.name,
            status
        );
        match_content_type(&response, JSON);
    }

    /// Every caller gets the disabled answer
    pub async fn disabled_for_everyone(app: &TestApp, endpoint: &Endpoint) {
        for caller in [&app.anonymous, &app.authenticated, &app.owner, &app.admin] {
            disabled(app, endpoint, caller).await;
        }
    }

    /// The call reaches the method; returns the response for further checks
    pub async fn accessible_by(
        app: &TestApp,
        endpoint: &Endpoint,
        caller: &Caller,
        body: Option<&Value>,
    ) -> TestResponse {
        let response = app.call(endpoint, caller, body).await;
        not_have_status_codes(&response, &[StatusCode::UNAUTHORIZED, StatusCode::NOT_FOUND]);
        match_content_type(&response, JSON);
        response
    }

    pub async fn inaccessible_by(app: &TestApp, endpoint: &Endpoint, caller: &Caller) {
        let response = app.call(endpoint, caller, None).await;
        assert_eq!(
            response.status_code(),
            StatusCode::UNAUTHORIZED,
            "{} should be inaccessible by {}",
            endpoint,
            caller.name
        );
        match_content_type(&response, JSON);
        assert_eq!(response.json::<Value>()["error"]["code"], "AUTHORIZATION_REQUIRED");
    }
}
