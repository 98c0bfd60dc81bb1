//! Login and registration against the backend's auth endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::BackendClient;
use crate::error::{NyayaError, RepositoryError, Result};
use crate::models::{Principal, UserRecord};
use crate::rbac::RoleType;
use crate::session::SessionContext;

/// Body returned by every auth endpoint.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserRecord,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    user_type: RoleType,
}

/// Fields of the registration form.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Username for citizens, badge id (`cop_id`) for reviewers.
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub confirm_password: String,
    pub role: RoleType,
}

#[derive(Debug, Serialize)]
struct UserRegistrationRequest<'a> {
    username: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    password: &'a str,
    confirm_password: &'a str,
    user_type: RoleType,
}

#[derive(Debug, Serialize)]
struct CopRegistrationRequest<'a> {
    cop_id: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    password: &'a str,
    confirm_password: &'a str,
}

/// Authenticates against the backend and keeps the session up to date.
pub struct AuthClient {
    client: BackendClient,
    session: SessionContext,
}

impl AuthClient {
    pub fn new(client: BackendClient, session: SessionContext) -> Self {
        Self { client, session }
    }

    /// Log in as a citizen or reviewer and persist the session.
    pub async fn login(&self, username: &str, password: &str, role: RoleType) -> Result<Principal> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(NyayaError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let body = LoginRequest {
            username: username.trim(),
            password,
            user_type: role,
        };
        let request = self
            .client
            .request(Method::POST, "/api/auth/login/", None)
            .json(&body);

        let response: AuthResponse = self
            .client
            .send_json("login", request)
            .await
            .map_err(|e| auth_failure(e, "Login failed"))?;
        self.session.establish(&response.token, &response.user)
    }

    /// Create an account and persist the resulting session.
    pub async fn register(&self, registration: &Registration) -> Result<Principal> {
        if registration.password != registration.confirm_password {
            return Err(NyayaError::Validation("Passwords do not match".to_string()));
        }
        if registration.username.trim().is_empty() {
            return Err(NyayaError::Validation("Username is required".to_string()));
        }

        let request = match registration.role {
            RoleType::User => self
                .client
                .request(Method::POST, "/api/auth/register/", None)
                .json(&UserRegistrationRequest {
                    username: registration.username.trim(),
                    email: &registration.email,
                    first_name: &registration.first_name,
                    last_name: &registration.last_name,
                    password: &registration.password,
                    confirm_password: &registration.confirm_password,
                    user_type: RoleType::User,
                }),
            RoleType::Cop => self
                .client
                .request(Method::POST, "/api/auth/cop/register/", None)
                .json(&CopRegistrationRequest {
                    cop_id: registration.username.trim(),
                    email: &registration.email,
                    first_name: &registration.first_name,
                    last_name: &registration.last_name,
                    password: &registration.password,
                    confirm_password: &registration.confirm_password,
                }),
        };

        let response: AuthResponse = self
            .client
            .send_json("register", request)
            .await
            .map_err(|e| auth_failure(e, "Registration failed"))?;
        self.session.establish(&response.token, &response.user)
    }

    pub fn logout(&self) -> Result<()> {
        self.session.clear()
    }
}

/// On the auth endpoints a 401 means bad credentials, not an expired session.
fn auth_failure(err: RepositoryError, fallback: &str) -> NyayaError {
    match err {
        RepositoryError::Unauthorized | RepositoryError::NotFound => {
            RepositoryError::DomainRejected(fallback.to_string()).into()
        }
        RepositoryError::DomainRejected(message) if message.trim().is_empty() => {
            RepositoryError::DomainRejected(fallback.to_string()).into()
        }
        other => other.into(),
    }
}
