use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role code that only the setup flow may hand out.
pub const RESERVED_ROLE_CODE: &str = "admin";

/// Admin account row, including credentials. Never serialized to clients.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub refresh_token: Option<String>,
    pub role_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
}

/// Admin as listed to clients. `role_code` is only filled when the role
/// relation was joined.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AdminInfo {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub role_code: Option<String>,
}

impl AdminInfo {
    pub fn with_role(admin: Admin, role_code: Option<String>) -> Self {
        Self {
            id: admin.id,
            username: admin.username,
            display_name: admin.display_name,
            is_active: admin.is_active,
            created_at: admin.created_at,
            role_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    /// Set when logged in with the setup credentials while no admin exists.
    pub setup_mode: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAdminRequest {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub role_id: Uuid,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Subject of tokens issued in setup mode. Not a valid admin id.
pub const SETUP_SUBJECT: &str = "setup-mode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id, or the setup subject before any admin exists.
    pub sub: String,
    pub username: String,
    pub exp: usize,
    pub iat: usize,
    pub token_type: TokenKind,
}

impl Claims {
    pub fn is_setup(&self) -> bool {
        self.sub == SETUP_SUBJECT
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthStatusResponse {
    pub has_admins: bool,
    pub setup_required: bool,
}
