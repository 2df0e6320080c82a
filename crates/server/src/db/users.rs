//! User and address repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use trendmart_core::{AddressId, Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::{Address, User};

/// Fields accepted when creating or updating a shipping address.
#[derive(Debug, Clone)]
pub struct AddressFields {
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub is_default: bool,
}

/// Repository for user and address database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, full_name, role, email_verified_at, created_at, updated_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, full_name, role, email_verified_at, created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user's password hash alongside the user row.
    ///
    /// Returns `None` if no user exists for the email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: User,
            password_hash: String,
        }

        let row = sqlx::query_as::<_, Row>(
            r"
            SELECT id, email, full_name, role, email_verified_at, created_at, updated_at,
                   password_hash
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Create an unverified customer, or refresh the pending registration
    /// if one already exists for the email.
    ///
    /// Verified accounts are never touched here; the caller checks
    /// verification state first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_pending_registration(
        &self,
        email: &Email,
        full_name: &str,
        password_hash: &str,
        otp_secret: &str,
        otp_expires_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (email, full_name, password_hash, role, otp_secret, otp_expires_at)
            VALUES ($1, $2, $3, 'CUSTOMER', $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                password_hash = EXCLUDED.password_hash,
                otp_secret = EXCLUDED.otp_secret,
                otp_expires_at = EXCLUDED.otp_expires_at,
                updated_at = NOW()
            RETURNING id, email, full_name, role, email_verified_at, created_at, updated_at
            ",
        )
        .bind(email)
        .bind(full_name)
        .bind(password_hash)
        .bind(otp_secret)
        .bind(otp_expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    /// Get the pending OTP state for an email, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_otp_state(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>, Option<DateTime<Utc>>)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: User,
            otp_secret: Option<String>,
            otp_expires_at: Option<DateTime<Utc>>,
        }

        let row = sqlx::query_as::<_, Row>(
            r"
            SELECT id, email, full_name, role, email_verified_at, created_at, updated_at,
                   otp_secret, otp_expires_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.otp_secret, r.otp_expires_at)))
    }

    /// Mark a user's email verified and clear the OTP fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn mark_verified(&self, email: &Email) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            UPDATE users
            SET email_verified_at = NOW(),
                otp_secret = NULL,
                otp_expires_at = NULL,
                updated_at = NOW()
            WHERE email = $1
            RETURNING id, email, full_name, role, email_verified_at, created_at, updated_at
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(user)
    }

    /// List customers (paginated, newest first) with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_customers(
        &self,
        skip: i64,
        take: i64,
    ) -> Result<(Vec<User>, i64), RepositoryError> {
        let customers = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, full_name, role, email_verified_at, created_at, updated_at
            FROM users
            WHERE role = 'CUSTOMER'
            ORDER BY created_at DESC
            OFFSET $1 LIMIT $2
            ",
        )
        .bind(skip)
        .bind(take)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'CUSTOMER'")
                .fetch_one(self.pool)
                .await?;

        Ok((customers, total))
    }

    /// Get a customer by ID, with their addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no customer matches.
    pub async fn get_customer(
        &self,
        id: UserId,
    ) -> Result<(User, Vec<Address>), RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, full_name, role, email_verified_at, created_at, updated_at
            FROM users
            WHERE id = $1 AND role = 'CUSTOMER'
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let addresses = self.addresses_for_user(id).await?;
        Ok((user, addresses))
    }

    /// List a user's addresses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn addresses_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(
            r"
            SELECT id, user_id, full_name, phone_number, address_line1, city, state,
                   postal_code, is_default, created_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(addresses)
    }
}

/// Fetch an address within a transaction, scoped to its owner.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_address(
    conn: &mut PgConnection,
    user_id: UserId,
    address_id: AddressId,
) -> Result<Option<Address>, RepositoryError> {
    let address = sqlx::query_as::<_, Address>(
        r"
        SELECT id, user_id, full_name, phone_number, address_line1, city, state,
               postal_code, is_default, created_at
        FROM addresses
        WHERE id = $1 AND user_id = $2
        ",
    )
    .bind(address_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(address)
}

/// Insert a new address for a user within a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_address(
    conn: &mut PgConnection,
    user_id: UserId,
    fields: &AddressFields,
) -> Result<Address, RepositoryError> {
    if fields.is_default {
        // Only one default address per user
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }

    let address = sqlx::query_as::<_, Address>(
        r"
        INSERT INTO addresses (user_id, full_name, phone_number, address_line1, city, state,
                               postal_code, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, user_id, full_name, phone_number, address_line1, city, state,
                  postal_code, is_default, created_at
        ",
    )
    .bind(user_id)
    .bind(&fields.full_name)
    .bind(&fields.phone_number)
    .bind(&fields.address_line1)
    .bind(&fields.city)
    .bind(&fields.state)
    .bind(&fields.postal_code)
    .bind(fields.is_default)
    .fetch_one(&mut *conn)
    .await?;

    Ok(address)
}

/// Look up a user's role without loading the full row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_role(pool: &PgPool, user_id: UserId) -> Result<Option<UserRole>, RepositoryError> {
    let role: Option<(UserRole,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(role.map(|(r,)| r))
}
