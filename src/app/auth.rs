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

use crate::domain::user::User;
use crate::infra::db::Db;

const TOKEN_ISSUER: &str = "corkboard";

/// Registration failures the HTTP layer must tell apart.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("mobile number already registered")]
    DuplicateMobile,
    #[error("admin can only be assigned to the first registered user")]
    AdminBootstrapClosed,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    paseto_key: [u8; 32],
    token_ttl_minutes: u64,
}

impl AuthService {
    pub fn new(db: Db, paseto_key: [u8; 32], token_ttl_minutes: u64) -> Self {
        Self {
            db,
            paseto_key,
            token_ttl_minutes,
        }
    }

    /// Register a new user. The admin bit is decided inside the INSERT itself
    /// (`admin AND NOT EXISTS (SELECT 1 FROM users)`), so two registrations
    /// racing on an empty table cannot both observe "no users yet". A denied
    /// admin request rolls the insert back and fails rather than silently
    /// demoting.
    pub async fn register(
        &self,
        email: String,
        first_name: String,
        last_name: String,
        mobile_no: String,
        password: String,
        admin_requested: bool,
    ) -> Result<User> {
        let password_hash = hash_password(&password)?;

        let mut tx = self.db.pool().begin().await?;
        let row = sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, mobile_no, password_hash, is_admin, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7 AND NOT EXISTS (SELECT 1 FROM users), $8) \
             RETURNING id, email, first_name, last_name, mobile_no, password_hash, is_admin, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(mobile_no)
        .bind(password_hash)
        .bind(admin_requested)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_register_constraint)?;

        let user = map_user(&row);
        if admin_requested && !user.is_admin {
            tx.rollback().await?;
            return Err(RegisterError::AdminBootstrapClosed.into());
        }
        tx.commit().await?;

        Ok(user)
    }

    /// Unknown email and wrong password collapse to the same `None`; the
    /// caller must not be able to distinguish them.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<(String, OffsetDateTime)>> {
        let user = match self.find_by_email(email).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        if !verify_password(password, &user.password_hash)? {
            return Ok(None);
        }

        let issued = self.issue_token(&user.email)?;
        Ok(Some(issued))
    }

    pub fn issue_token(&self, email: &str) -> Result<(String, OffsetDateTime)> {
        let ttl = std::time::Duration::from_secs(self.token_ttl_minutes * 60);
        let mut claims = Claims::new_expires_in(&ttl)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_ISSUER)?;
        claims.subject(email)?;

        let key = SymmetricKey::<V4>::from(&self.paseto_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        let expires_at =
            OffsetDateTime::now_utc() + Duration::minutes(self.token_ttl_minutes as i64);
        Ok((token, expires_at))
    }

    /// Bad signature, malformed payload, past expiry, and an unresolvable
    /// subject all collapse to `None`.
    pub async fn verify_token(&self, token: &str) -> Result<Option<User>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        let email = match claims.get_claim("sub").and_then(|value| value.as_str()) {
            Some(email) => email.to_string(),
            None => return Ok(None),
        };
        self.find_by_email(&email).await
    }

    /// Administrative elevation. Bypasses the bootstrap policy on purpose:
    /// this path is gated by a deployment-time switch, not by "first user".
    pub async fn elevate(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "UPDATE users SET is_admin = 1 WHERE email = $1 \
             RETURNING id, email, first_name, last_name, mobile_no, password_hash, is_admin, created_at",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(map_user))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, email, first_name, last_name, mobile_no, password_hash, is_admin, created_at \
             FROM users ORDER BY created_at, id",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(map_user).collect())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, first_name, last_name, mobile_no, password_hash, is_admin, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(map_user))
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.paseto_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

fn map_user(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        mobile_no: row.get("mobile_no"),
        password_hash: row.get("password_hash"),
        is_admin: row.get("is_admin"),
        created_at: row.get("created_at"),
    }
}

/// SQLite reports both duplicates through the same UNIQUE violation; the
/// failing column name in the message tells them apart.
fn map_register_constraint(err: sqlx::Error) -> anyhow::Error {
    if let Some(db_err) = err.as_database_error() {
        let message = db_err.message();
        if message.contains("users.email") {
            return RegisterError::DuplicateEmail.into();
        }
        if message.contains("users.mobile_no") {
            return RegisterError::DuplicateMobile.into();
        }
    }
    err.into()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn password_hashes_are_salted() {
        let first = hash_password("same password").unwrap();
        let second = hash_password("same password").unwrap();
        assert_ne!(first, second);
    }
}
