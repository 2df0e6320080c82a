//! Return request repository.

use sqlx::PgPool;

use trendmart_core::{OrderItemId, ReturnRequestId, ReturnStatus, UserId};

use super::RepositoryError;
use crate::models::ReturnRequest;

/// Repository for customer return requests.
pub struct ReturnRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReturnRepository<'a> {
    /// Create a new return repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// File a return request for an order item the user owns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order item does not belong
    /// to the user, or `RepositoryError::Conflict` if a request already
    /// exists for the item.
    pub async fn create(
        &self,
        user_id: UserId,
        order_item_id: OrderItemId,
        reason: &str,
    ) -> Result<ReturnRequest, RepositoryError> {
        let owns_item: Option<(i32,)> = sqlx::query_as(
            r"
            SELECT 1
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE oi.id = $1 AND o.user_id = $2
            ",
        )
        .bind(order_item_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        if owns_item.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let request = sqlx::query_as::<_, ReturnRequest>(
            r"
            INSERT INTO return_requests (order_item_id, user_id, reason)
            VALUES ($1, $2, $3)
            RETURNING id, order_item_id, user_id, reason, status, created_at, updated_at
            ",
        )
        .bind(order_item_id)
        .bind(user_id)
        .bind(reason)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "return already requested for this item"))?;

        Ok(request)
    }

    /// List all return requests (newest first) with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        skip: i64,
        take: i64,
    ) -> Result<(Vec<ReturnRequest>, i64), RepositoryError> {
        let requests = sqlx::query_as::<_, ReturnRequest>(
            r"
            SELECT id, order_item_id, user_id, reason, status, created_at, updated_at
            FROM return_requests
            ORDER BY created_at DESC
            OFFSET $1 LIMIT $2
            ",
        )
        .bind(skip)
        .bind(take)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM return_requests")
            .fetch_one(self.pool)
            .await?;

        Ok((requests, total))
    }

    /// List a user's own return requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReturnRequest>, RepositoryError> {
        let requests = sqlx::query_as::<_, ReturnRequest>(
            r"
            SELECT id, order_item_id, user_id, reason, status, created_at, updated_at
            FROM return_requests
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(requests)
    }

    /// Approve or reject a return request.
    ///
    /// Stock is never restored on approval; returned goods go through manual
    /// inspection before any restock decision.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the request does not exist.
    pub async fn set_status(
        &self,
        id: ReturnRequestId,
        status: ReturnStatus,
    ) -> Result<ReturnRequest, RepositoryError> {
        let request = sqlx::query_as::<_, ReturnRequest>(
            r"
            UPDATE return_requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, order_item_id, user_id, reason, status, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(request)
    }
}
