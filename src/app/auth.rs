use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::Role;
use crate::infra::db::Db;

/// Verified bearer token: who the caller is and what they may do.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    key: [u8; 32],
    token_ttl_hours: u64,
}

impl AuthService {
    pub fn new(db: Db, key: [u8; 32], token_ttl_hours: u64) -> Self {
        Self {
            db,
            key,
            token_ttl_hours,
        }
    }

    /// Register a new account. Does not issue a token; the caller signs in
    /// separately. Unique violations on username/email bubble up as sqlx
    /// errors for the handler to map to 409.
    pub async fn signup(
        &self,
        username: String,
        nickname: String,
        email: String,
        password: String,
    ) -> Result<Uuid> {
        let password_hash = hash_password(&password)?;
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (username, nickname, email, password_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(username)
        .bind(nickname)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await?;

        Ok(id)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Option<IssuedToken>> {
        let row = sqlx::query(
            "SELECT id, password_hash, role::text AS role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let password_hash: String = row.get("password_hash");
        if !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let user_id: Uuid = row.get("id");
        let role: String = row.get("role");
        let role =
            Role::from_db(&role).ok_or_else(|| anyhow!("unknown user role: {}", role))?;

        let token = self.issue_token(user_id, role)?;
        Ok(Some(token))
    }

    /// Mint a v4.local token carrying the user id, role and expiry.
    pub fn issue_token(&self, user_id: Uuid, role: Role) -> Result<IssuedToken> {
        let duration = std::time::Duration::from_secs(self.token_ttl_hours * 60 * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer("atelier")?;
        claims.audience("atelier")?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("role", role.as_db())?;

        let key = SymmetricKey::<V4>::from(&self.key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        let expires_at =
            OffsetDateTime::now_utc() + Duration::hours(self.token_ttl_hours as i64);

        Ok(IssuedToken { token, expires_at })
    }

    /// Decrypt and validate a bearer token. Expired, malformed and
    /// wrong-key tokens all come back as `None`; the server's clock is
    /// authoritative regardless of what the client believes.
    pub fn verify_token(&self, token: &str) -> Result<Option<AuthSession>> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with("atelier");
        rules.validate_audience_with("atelier");

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let claims = match trusted.payload_claims() {
            Some(claims) => claims,
            None => return Ok(None),
        };

        let user_id = match claim_str(claims, "sub").and_then(|sub| Uuid::parse_str(&sub).ok())
        {
            Some(user_id) => user_id,
            None => return Ok(None),
        };
        let role = match claim_str(claims, "role").and_then(|role| Role::from_db(&role)) {
            Some(role) => role,
            None => return Ok(None),
        };

        Ok(Some(AuthSession { user_id, role }))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn claim_str(claims: &Claims, name: &str) -> Option<String> {
    claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}
