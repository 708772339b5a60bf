use std::env;
use std::sync::OnceLock;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::model::{Claims, TokenKind};

const DEV_JWT_SECRET: &str = "gov-portal-dev-secret";
const ACCESS_TOKEN_LIFETIME: i64 = 15 * 60;
const REFRESH_TOKEN_LIFETIME: i64 = 7 * 24 * 60 * 60;

fn jwt_secret() -> &'static str {
    static SECRET: OnceLock<String> = OnceLock::new();
    SECRET.get_or_init(|| {
        env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_SECRET not set, falling back to the development secret");
            DEV_JWT_SECRET.to_string()
        })
    })
}

impl TokenKind {
    pub fn lifetime(self) -> i64 {
        match self {
            TokenKind::Access => ACCESS_TOKEN_LIFETIME,
            TokenKind::Refresh => REFRESH_TOKEN_LIFETIME,
        }
    }
}

pub fn issue_token(kind: TokenKind, subject: &str, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: subject.to_string(),
        username: username.to_string(),
        exp: (now + kind.lifetime()) as usize,
        iat: now as usize,
        token_type: kind,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
}

/// Checks signature and expiry. The token kind is left to the caller.
pub fn decode_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
