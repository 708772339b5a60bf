use actix_web::HttpRequest;

use super::jwt::decode_token;
use super::model::{Claims, TokenKind};
use crate::error::AppError;

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
}

fn decode_access_token(req: &HttpRequest) -> Result<Claims, AppError> {
    let token = bearer_token(req).ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    let claims = decode_token(token).map_err(|e| {
        log::warn!("Token validation failed: {:?}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    if claims.token_type != TokenKind::Access {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }

    Ok(claims)
}

/// Validates the bearer access token of a request and returns its claims.
/// Setup-mode sessions are refused.
pub fn validate_request_token(req: &HttpRequest) -> Result<Claims, AppError> {
    let claims = decode_access_token(req)?;
    if claims.is_setup() {
        log::warn!("Setup-mode session refused on {}", req.path());
        return Err(AppError::Unauthorized(
            "Setup session cannot access this resource".to_string(),
        ));
    }
    Ok(claims)
}

/// Like [`validate_request_token`], but also accepts setup-mode sessions.
/// Callers must check that setup is still open.
pub fn validate_setup_token(req: &HttpRequest) -> Result<Claims, AppError> {
    decode_access_token(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token;
    use crate::auth::model::SETUP_SUBJECT;
    use actix_web::test::TestRequest;

    fn request_with(header: String) -> HttpRequest {
        TestRequest::default()
            .insert_header(("Authorization", header))
            .to_http_request()
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let err = validate_request_token(&req).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Missing authorization token"));
    }

    #[test]
    fn test_non_bearer_scheme_is_unauthorized() {
        let token = issue_token(TokenKind::Access, "admin-1", "alice").unwrap();
        let err = validate_request_token(&request_with(format!("Token {}", token))).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Missing authorization token"));
    }

    #[test]
    fn test_access_token_is_accepted() {
        let token = issue_token(TokenKind::Access, "admin-1", "alice").unwrap();
        let claims = validate_request_token(&request_with(format!("Bearer {}", token))).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.sub, "admin-1");
    }

    #[test]
    fn test_refresh_token_is_rejected() {
        let token = issue_token(TokenKind::Refresh, "admin-1", "alice").unwrap();
        assert!(matches!(
            validate_request_token(&request_with(format!("Bearer {}", token))),
            Err(AppError::Unauthorized(ref m)) if m == "Invalid token type"
        ));
    }

    #[test]
    fn test_setup_session_only_passes_setup_validation() {
        let token = issue_token(TokenKind::Access, SETUP_SUBJECT, "admin").unwrap();
        let req = request_with(format!("Bearer {}", token));
        assert!(matches!(
            validate_request_token(&req),
            Err(AppError::Unauthorized(ref m)) if m == "Setup session cannot access this resource"
        ));
        assert!(validate_setup_token(&req).unwrap().is_setup());

        let token = issue_token(TokenKind::Access, "admin-1", "alice").unwrap();
        let claims = validate_setup_token(&request_with(format!("Bearer {}", token))).unwrap();
        assert!(!claims.is_setup());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(matches!(
            validate_request_token(&request_with("Bearer not.a.jwt".to_string())),
            Err(AppError::Unauthorized(ref m)) if m == "Invalid or expired token"
        ));
    }
}
