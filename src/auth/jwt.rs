use axum::extract::FromRef;
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

/// Verification half of the credential layer. Tokens are minted elsewhere
/// with the same shared secret, issuer and audience.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
        } = state.config.jwt.clone();
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
        }
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(username = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
pub mod testing {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};

    use super::super::claims::{Claims, TokenKind};
    use crate::config::JwtConfig;

    pub fn sign(cfg: &JwtConfig, username: &str, role: &str, kind: TokenKind) -> String {
        sign_with_ttl(cfg, username, role, kind, Duration::minutes(5))
    }

    /// A negative `ttl` yields a token that has already expired.
    pub fn sign_with_ttl(
        cfg: &JwtConfig,
        username: &str,
        role: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> String {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: username.into(),
            role: role.into(),
            iat: now.unix_timestamp() as usize,
            exp: (now + ttl).unix_timestamp() as usize,
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
            kind,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.secret.as_bytes()),
        )
        .expect("sign token")
    }

    /// Bearer header value for an access token.
    pub fn bearer(cfg: &JwtConfig, username: &str, role: &str) -> String {
        format!("Bearer {}", sign(cfg, username, role, TokenKind::Access))
    }
}
