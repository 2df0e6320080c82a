//! Authentication service.
//!
//! Email/password accounts with one-time-code email verification for
//! customers, and JWT bearer tokens for both customers and admins.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use trendmart_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a verification code stays valid.
const OTP_TTL: Duration = Duration::minutes(10);

/// How long an issued token stays valid.
const TOKEN_TTL: Duration = Duration::days(7);

/// Claims carried in an issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// User role at issue time.
    pub role: UserRole,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Expiry timestamp.
    pub exp: i64,
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] trendmart_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A verified account already exists for the email.
    #[error("account already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// No pending verification, or the code does not match.
    #[error("invalid verification code")]
    InvalidOtp,

    /// The verification code has expired.
    #[error("verification code expired")]
    OtpExpired,

    /// The account has not verified its email yet.
    #[error("email not verified")]
    NotVerified,

    /// The account exists but does not hold the required role.
    #[error("wrong role for this login")]
    WrongRole,

    /// Bearer token missing, malformed, or expired.
    #[error("invalid token")]
    InvalidToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// A user together with a freshly issued bearer token.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    jwt_secret: &'a SecretString,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, jwt_secret: &'a SecretString) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt_secret,
        }
    }

    /// Start a customer registration: create (or refresh) the unverified
    /// account and return the verification code to email out.
    ///
    /// Re-registering an unverified email issues a fresh code and replaces
    /// the stored name and password. Verified accounts are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if a verified account exists,
    /// `AuthError::InvalidEmail` / `AuthError::WeakPassword` on bad input.
    pub async fn request_registration(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        if let Some(existing) = self.users.get_by_email(&email).await?
            && existing.is_verified()
        {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;
        let code = generate_verification_code();
        let expires_at = Utc::now() + OTP_TTL;

        let user = self
            .users
            .upsert_pending_registration(&email, full_name, &password_hash, &code, expires_at)
            .await?;

        Ok((user, code))
    }

    /// Complete a registration by checking the emailed code.
    ///
    /// On success the account is marked verified, the code is cleared, and
    /// a token is issued.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOtp` if no pending code matches, or
    /// `AuthError::OtpExpired` if the code is past its deadline.
    pub async fn verify_registration(
        &self,
        email: &str,
        code: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let email = Email::parse(email)?;

        let (user, stored_code, expires_at) = self
            .users
            .get_otp_state(&email)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        if user.is_verified() {
            return Err(AuthError::UserAlreadyExists);
        }

        let stored_code = stored_code.ok_or(AuthError::InvalidOtp)?;
        let expires_at = expires_at.ok_or(AuthError::InvalidOtp)?;

        if Utc::now() > expires_at {
            return Err(AuthError::OtpExpired);
        }
        if stored_code != code {
            return Err(AuthError::InvalidOtp);
        }

        let user = self.users.mark_verified(&email).await?;
        let token = self.issue_token(&user)?;

        Ok(AuthenticatedUser { user, token })
    }

    /// Login with email and password, requiring a specific role.
    ///
    /// Role mismatches report as `WrongRole` so the customer and admin
    /// login surfaces stay separate.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a wrong email/password,
    /// `AuthError::NotVerified` for unverified customers.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        required_role: UserRole,
    ) -> Result<AuthenticatedUser, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if user.role != required_role {
            return Err(AuthError::WrongRole);
        }
        if user.role == UserRole::Customer && !user.is_verified() {
            return Err(AuthError::NotVerified);
        }

        let token = self.issue_token(&user)?;
        Ok(AuthenticatedUser { user, token })
    }

    /// Issue a bearer token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if signing fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.as_i32().to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + TOKEN_TTL).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.expose_secret().as_bytes()),
        )
        .map_err(|_| AuthError::InvalidToken)
    }
}

/// Decode and validate a bearer token, returning the caller's identity.
///
/// # Errors
///
/// Returns `AuthError::InvalidToken` on a bad signature, malformed claims,
/// or an expired token.
pub fn verify_token(jwt_secret: &SecretString, token: &str) -> Result<(UserId, UserRole), AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.expose_secret().as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::InvalidToken)?;

    let user_id = data
        .claims
        .sub
        .parse::<i32>()
        .map_err(|_| AuthError::InvalidToken)?;

    Ok((UserId::new(user_id), data.claims.role))
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Validate password strength requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough password").is_ok());
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn token_round_trips_with_matching_secret() {
        let secret = SecretString::from("test-secret-that-is-long-enough-000");
        let now = Utc::now();
        let claims = Claims {
            sub: "42".to_owned(),
            role: UserRole::Customer,
            iat: now.timestamp(),
            exp: (now + TOKEN_TTL).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .expect("encode");

        let (user_id, role) = verify_token(&secret, &token).expect("verify");
        assert_eq!(user_id, UserId::new(42));
        assert_eq!(role, UserRole::Customer);

        let other = SecretString::from("a-completely-different-secret-value");
        assert!(matches!(
            verify_token(&other, &token),
            Err(AuthError::InvalidToken)
        ));
    }
}
