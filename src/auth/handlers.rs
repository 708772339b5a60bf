use actix_web::{web, HttpRequest, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use uuid::Uuid;

use super::jwt::{decode_token, issue_token};
use super::middleware::{validate_request_token, validate_setup_token};
use super::model::{
    AdminInfo, AuthStatusResponse, Claims, CreateAdminRequest, CreateRoleRequest, LoginRequest, RefreshRequest, Role,
    TokenKind, TokenResponse, RESERVED_ROLE_CODE, SETUP_SUBJECT,
};
use super::query::AdminListQuery;
use crate::db::admin::NewAdmin;
use crate::error::AppError;
use crate::AppState;

const SETUP_USERNAME: &str = "admin";
const SETUP_PASSWORD: &str = "admin123";

fn token_failure(e: jsonwebtoken::errors::Error) -> AppError {
    log::error!("Failed to sign token: {:?}", e);
    AppError::Internal("Failed to generate token".to_string())
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid username or password".to_string())
}

/// Accepts admin sessions, and setup sessions while no admin exists.
async fn validate_setup_access(req: &HttpRequest, state: &AppState) -> Result<Claims, AppError> {
    let claims = validate_setup_token(req)?;
    if claims.is_setup() && state.admin_count().await? > 0 {
        return Err(AppError::Unauthorized("Setup is already complete".to_string()));
    }
    Ok(claims)
}

fn issue_pair(subject: &str, username: &str, setup_mode: bool) -> Result<TokenResponse, AppError> {
    Ok(TokenResponse {
        access_token: issue_token(TokenKind::Access, subject, username).map_err(token_failure)?,
        refresh_token: issue_token(TokenKind::Refresh, subject, username).map_err(token_failure)?,
        token_type: "Bearer".to_string(),
        expires_in: TokenKind::Access.lifetime(),
        setup_mode,
    })
}

#[utoipa::path(
    get,
    path = "/api/auth/status",
    tag = "Authentication",
    responses(
        (status = 200, description = "Whether first-time setup is still required", body = AuthStatusResponse)
    )
)]
pub async fn get_auth_status(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let count = state.admin_count().await?;
    Ok(HttpResponse::Ok().json(AuthStatusResponse {
        has_admins: count > 0,
        setup_required: count == 0,
    }))
}

/// While no admin exists, the setup credentials log in with a setup-mode
/// session that can only list roles and create the first admin.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse, AppError> {
    if state.admin_count().await? == 0 {
        if body.username == SETUP_USERNAME && body.password == SETUP_PASSWORD {
            log::warn!("Setup-mode login, create an admin account");
            return Ok(HttpResponse::Ok().json(issue_pair(SETUP_SUBJECT, &body.username, true)?));
        }
        return Err(AppError::Unauthorized(
            "No admin exists yet, log in with the setup credentials".to_string(),
        ));
    }

    let admin = state
        .admin_by_username(&body.username)
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify(&body.password, &admin.password_hash).unwrap_or(false) {
        return Err(invalid_credentials());
    }
    if !admin.is_active {
        return Err(AppError::Unauthorized("Account is disabled".to_string()));
    }

    let tokens = issue_pair(&admin.id.to_string(), &admin.username, false)?;
    if let Err(e) = state.set_refresh_token(&admin.id, Some(&tokens.refresh_token)).await {
        // The access token stays usable; only refresh will fail.
        log::error!("Failed to store refresh token for {}: {:?}", admin.username, e);
    }
    log::info!("Admin {} logged in", admin.username);
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh_token(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let claims = decode_token(&body.refresh_token).map_err(|e| {
        log::warn!("Invalid refresh token: {:?}", e);
        AppError::Unauthorized("Invalid or expired refresh token".to_string())
    })?;
    if claims.token_type != TokenKind::Refresh {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }

    // Only the session of the latest login may refresh.
    let admin = state
        .admin_by_refresh_token(&body.refresh_token)
        .await?
        .filter(|a| a.is_active)
        .ok_or_else(|| AppError::Unauthorized("Session expired, log in again".to_string()))?;

    let access_token =
        issue_token(TokenKind::Access, &admin.id.to_string(), &admin.username).map_err(token_failure)?;
    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token,
        refresh_token: body.refresh_token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: TokenKind::Access.lifetime(),
        setup_mode: false,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Refresh session revoked"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let claims = validate_request_token(&req)?;
    if let Ok(id) = Uuid::parse_str(&claims.sub) {
        state.set_refresh_token(&id, None).await?;
    }
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    get,
    path = "/api/auth/admins",
    tag = "Authentication",
    params(AdminListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Paginated admins with their role code"),
        (status = 400, description = "Invalid sort"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_admins(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    Ok(HttpResponse::Ok().json(state.admins_page(&query).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/admins",
    tag = "Authentication",
    request_body = CreateAdminRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Admin created", body = AdminInfo),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Role not found"),
        (status = 422, description = "Username taken or reserved role")
    )
)]
pub async fn create_admin(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateAdminRequest>,
) -> Result<HttpResponse, AppError> {
    let claims = validate_setup_access(&req, &state).await?;
    let body = body.into_inner();

    let username = body.username.trim();
    if username.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Username and password are required".to_string()));
    }

    let role = state
        .role_by_id(&body.role_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Role not found".to_string()))?;
    if role.code == RESERVED_ROLE_CODE {
        return Err(AppError::Unprocessable("The admin role cannot be assigned".to_string()));
    }
    if state.admin_by_username(username).await?.is_some() {
        return Err(AppError::Unprocessable("Username already exists".to_string()));
    }

    let password_hash = hash(&body.password, DEFAULT_COST).map_err(|e| {
        log::error!("Failed to hash password: {:?}", e);
        AppError::Internal("Failed to create admin".to_string())
    })?;

    let admin = state
        .insert_admin(NewAdmin {
            username,
            password_hash: &password_hash,
            display_name: body.display_name.as_deref(),
            role_id: role.id,
            is_active: body.is_active,
            // Setup-mode sessions have no admin id.
            created_by: Uuid::parse_str(&claims.sub).ok(),
        })
        .await?;

    log::info!("Admin {} created by {}", admin.username, claims.username);
    Ok(HttpResponse::Created().json(AdminInfo::with_role(admin, Some(role.code))))
}

#[utoipa::path(
    patch,
    path = "/api/auth/admins/{id}/toggle-active",
    tag = "Authentication",
    params(("id" = Uuid, Path, description = "Admin ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active flag flipped", body = AdminInfo),
        (status = 400, description = "Cannot disable yourself"),
        (status = 404, description = "Admin not found")
    )
)]
pub async fn toggle_admin_active(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = validate_request_token(&req)?;
    let admin_id = path.into_inner();
    if claims.sub == admin_id.to_string() {
        return Err(AppError::BadRequest("Cannot disable your own account".to_string()));
    }

    let admin = state
        .toggle_admin_active(&admin_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;
    let role_code = match admin.role_id {
        Some(role_id) => state.role_by_id(&role_id).await?.map(|r| r.code),
        None => None,
    };
    Ok(HttpResponse::Ok().json(AdminInfo::with_role(admin, role_code)))
}

#[utoipa::path(
    delete,
    path = "/api/auth/admins/{id}",
    tag = "Authentication",
    params(("id" = Uuid, Path, description = "Admin ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Admin deleted"),
        (status = 400, description = "Own account or last admin"),
        (status = 404, description = "Admin not found")
    )
)]
pub async fn delete_admin(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let claims = validate_request_token(&req)?;
    let admin_id = path.into_inner();

    if claims.sub == admin_id.to_string() {
        return Err(AppError::BadRequest("Cannot delete your own account".to_string()));
    }
    if state.admin_count().await? <= 1 {
        return Err(AppError::BadRequest("Cannot delete the last admin".to_string()));
    }
    if !state.delete_admin(&admin_id).await? {
        return Err(AppError::NotFound("Admin not found".to_string()));
    }

    log::info!("Admin {} deleted by {}", admin_id, claims.username);
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    get,
    path = "/api/auth/roles",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Assignable roles", body = Vec<Role>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_roles(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    validate_setup_access(&req, &state).await?;
    Ok(HttpResponse::Ok().json(state.assignable_roles().await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/roles",
    tag = "Authentication",
    request_body = CreateRoleRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 422, description = "Code taken or reserved")
    )
)]
pub async fn create_role(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateRoleRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let code = body.code.trim().to_lowercase();
    let name = body.name.trim();
    if code.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest("Role code and name are required".to_string()));
    }
    if code == RESERVED_ROLE_CODE || state.role_code_exists(&code).await? {
        return Err(AppError::Unprocessable("Role already exists".to_string()));
    }

    let role = state.insert_role(&code, name).await?;
    Ok(HttpResponse::Created().json(role))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/status", web::get().to(get_auth_status))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh_token))
            .route("/logout", web::post().to(logout))
            .route("/admins", web::get().to(list_admins))
            .route("/admins", web::post().to(create_admin))
            .route("/admins/{id}/toggle-active", web::patch().to(toggle_admin_active))
            .route("/admins/{id}", web::delete().to(delete_admin))
            .route("/roles", web::get().to(list_roles))
            .route("/roles", web::post().to(create_role)),
    );
}
