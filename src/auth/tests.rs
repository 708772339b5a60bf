use chrono::Utc;
use uuid::Uuid;

use super::jwt::{decode_token, issue_token};
use super::model::{Admin, AdminInfo, Claims, CreateAdminRequest, TokenKind, TokenResponse};

fn admin() -> Admin {
    Admin {
        id: Uuid::new_v4(),
        username: "editor".to_string(),
        password_hash: "$2b$12$hash".to_string(),
        display_name: Some("Content Editor".to_string()),
        refresh_token: Some("refresh".to_string()),
        role_id: Some(Uuid::new_v4()),
        is_active: true,
        created_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
        created_by: None,
    }
}

#[test]
fn test_issue_and_decode_access_token() {
    let id = Uuid::new_v4().to_string();
    let token = issue_token(TokenKind::Access, &id, "editor").expect("sign access token");
    let claims = decode_token(&token).expect("decode access token");

    assert_eq!(claims.sub, id);
    assert_eq!(claims.username, "editor");
    assert_eq!(claims.token_type, TokenKind::Access);
    assert_eq!((claims.exp - claims.iat) as i64, TokenKind::Access.lifetime());
}

#[test]
fn test_refresh_token_outlives_access_token() {
    let access = decode_token(&issue_token(TokenKind::Access, "id", "editor").unwrap()).unwrap();
    let refresh = decode_token(&issue_token(TokenKind::Refresh, "id", "editor").unwrap()).unwrap();

    assert_eq!(refresh.token_type, TokenKind::Refresh);
    assert!(refresh.exp > access.exp);
}

#[test]
fn test_tampered_token_is_rejected() {
    let token = issue_token(TokenKind::Access, "id", "editor").unwrap();
    let mut tampered = token.clone();
    tampered.push('x');
    assert!(decode_token(&tampered).is_err());
    assert!(decode_token("invalid.token.here").is_err());
}

#[test]
fn test_token_kind_serializes_lowercase() {
    let claims = Claims {
        sub: "id".to_string(),
        username: "editor".to_string(),
        exp: 2,
        iat: 1,
        token_type: TokenKind::Refresh,
    };
    let json = serde_json::to_value(&claims).unwrap();
    assert_eq!(json["token_type"], "refresh");
}

#[test]
fn test_admin_info_hides_credentials() {
    let admin = admin();
    let info = AdminInfo::with_role(admin.clone(), Some("editor".to_string()));

    assert_eq!(info.id, admin.id);
    assert_eq!(info.role_code.as_deref(), Some("editor"));
    let json = serde_json::to_string(&info).unwrap();
    assert!(!json.contains("password_hash"));
    assert!(!json.contains("refresh_token"));
}

#[test]
fn test_create_admin_request_defaults_to_active() {
    let role = Uuid::new_v4();
    let json = format!(r#"{{"username": "editor", "password": "secret", "role_id": "{}"}}"#, role);
    let request: CreateAdminRequest = serde_json::from_str(&json).unwrap();

    assert!(request.is_active);
    assert_eq!(request.role_id, role);
    assert!(request.display_name.is_none());
}

#[test]
fn test_token_response_shape() {
    let response = TokenResponse {
        access_token: "a".to_string(),
        refresh_token: "r".to_string(),
        token_type: "Bearer".to_string(),
        expires_in: TokenKind::Access.lifetime(),
        setup_mode: true,
    };
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["expires_in"], 900);
    assert_eq!(json["setup_mode"], true);
}
