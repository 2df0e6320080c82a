//! User and address domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use trendmart_core::{AddressId, Email, UserId, UserRole};

/// A back-office user: either a dashboard admin or a storefront customer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub role: UserRole,
    /// Set once the registration OTP has been confirmed.
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user completed email verification.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// A shipping address owned by a user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}
