//! Common test utilities for assetflow-connector-graph integration tests.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assetflow_connector_graph::{GraphConfig, GraphDirectory, TenantCredentials};

pub const DIRECTORY_TENANT: &str = "dir-tenant";

/// Test data factory for directory users.
pub fn create_test_user(id: &str, email_prefix: &str) -> Value {
    json!({
        "id": id,
        "userPrincipalName": format!("{}@test.onmicrosoft.com", email_prefix),
        "displayName": format!("Test User {}", email_prefix),
        "givenName": "Test",
        "surname": "User",
        "mail": format!("{}@example.com", email_prefix),
        "accountEnabled": true,
        "jobTitle": "Test Engineer",
        "department": "Testing"
    })
}

/// Wraps items in an OData response body.
pub fn create_odata_response(items: Vec<Value>, next_link: Option<&str>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

/// Creates an OData error body.
pub fn create_odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Creates a mock OAuth token response.
pub fn create_token_response(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}

/// Mock Graph server with common setup helpers.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    /// Starts a new mock Graph API server.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Returns the mock server's base URL.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Builds a [`GraphDirectory`] pointed at this mock server.
    pub fn directory(&self) -> GraphDirectory {
        let config = GraphConfig {
            graph_endpoint: self.url(),
            login_endpoint: self.url(),
            ..GraphConfig::default()
        };
        GraphDirectory::new(config).expect("failed to build directory")
    }

    /// Credentials targeting the mocked directory tenant.
    pub fn credentials(&self) -> TenantCredentials {
        TenantCredentials::new(DIRECTORY_TENANT, "client-id", "client-secret")
    }

    /// Sets up the OAuth token endpoint.
    pub async fn mock_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(format!("/{DIRECTORY_TENANT}/oauth2/v2.0/token")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 3600)),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up a failing OAuth token endpoint.
    pub async fn mock_token_endpoint_failure(&self) {
        Mock::given(method("POST"))
            .and(path(format!("/{DIRECTORY_TENANT}/oauth2/v2.0/token")))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({
                    "error": "invalid_client",
                    "error_description": "Invalid client secret"
                })),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up a single-page users listing.
    pub async fn mock_users_endpoint(&self, users: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(create_odata_response(users, None)),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up a user photo endpoint returning raw bytes.
    pub async fn mock_photo_endpoint(&self, user_id: &str, bytes: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/v1.0/users/{user_id}/photo/$value")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "image/jpeg")
                    .set_body_bytes(bytes.to_vec()),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up a user photo endpoint answering 404 (user has no photo).
    pub async fn mock_photo_absent(&self, user_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v1.0/users/{user_id}/photo/$value")))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(create_odata_error(
                    "ImageNotFound",
                    "The photo wasn't found.",
                )),
            )
            .mount(&self.server)
            .await;
    }
}
