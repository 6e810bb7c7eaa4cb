//! Order repository for database operations.
//!
//! Item snapshots are stored as JSONB; the payment receipt is flattened into
//! `payment_*` columns. Every write bumps `version`.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use shopdesk_core::{Email, OrderId, OrderStatus};

use super::{OrderStore, PaymentRecord, RepositoryError, map_unique_violation};
use crate::models::{
    CustomerSnapshot, NewOrder, Order, OrderItem, PaymentResult, PlacedOrder,
};

macro_rules! order_columns {
    () => {
        "id, customer_name, customer_email, items, total, status, is_paid, paid_at, \
         payment_id, payment_reference, payment_status, payment_channel, \
         idempotency_key, version, created_at, updated_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_name: String,
    customer_email: String,
    items: Json<Vec<OrderItem>>,
    total: Decimal,
    status: OrderStatus,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    payment_id: Option<String>,
    payment_reference: Option<String>,
    payment_status: Option<String>,
    payment_channel: Option<String>,
    idempotency_key: Option<String>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let payment_result = match (
            row.payment_id,
            row.payment_reference,
            row.payment_status,
            row.payment_channel,
        ) {
            (Some(id), Some(reference), Some(status), Some(channel)) => Some(PaymentResult {
                id,
                reference,
                status,
                channel,
            }),
            (None, None, None, None) => None,
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "order {} has a partial payment receipt",
                    row.id
                )));
            }
        };

        if row.is_paid && (row.paid_at.is_none() || payment_result.is_none()) {
            return Err(RepositoryError::DataCorruption(format!(
                "order {} is paid without a receipt",
                row.id
            )));
        }

        Ok(Self {
            id: OrderId::new(row.id),
            customer: CustomerSnapshot {
                name: row.customer_name,
                email,
            },
            items: row.items.0,
            total: row.total,
            status: row.status,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            payment_result,
            idempotency_key: row.idempotency_key,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn exists(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    async fn fetch_one(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

impl OrderStore for OrderRepository<'_> {
    fn create(
        &self,
        draft: NewOrder,
    ) -> impl Future<Output = Result<PlacedOrder, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, OrderRow>(concat!(
                "INSERT INTO orders (customer_name, customer_email, items, total, idempotency_key) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (idempotency_key) DO NOTHING \
                 RETURNING ",
                order_columns!()
            ))
            .bind(&draft.customer.name)
            .bind(&draft.customer.email)
            .bind(Json(&draft.items))
            .bind(draft.total)
            .bind(draft.idempotency_key.as_deref())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "order already exists"))?;

            if let Some(row) = row {
                return Ok(PlacedOrder {
                    order: row.try_into()?,
                    replayed: false,
                });
            }

            // Nothing inserted: the idempotency key is already taken.
            let key = draft.idempotency_key.as_deref().ok_or_else(|| {
                RepositoryError::Conflict("order insert was skipped without a key".to_owned())
            })?;
            let existing = self
                .find_by_idempotency_key(key)
                .await?
                .ok_or(RepositoryError::NotFound)?;

            Ok(PlacedOrder {
                order: existing,
                replayed: true,
            })
        }
    }

    fn get_by_id(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send {
        self.fetch_one(id)
    }

    fn list_by_customer_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send {
        async move {
            let rows = sqlx::query_as::<_, OrderRow>(concat!(
                "SELECT ",
                order_columns!(),
                " FROM orders WHERE customer_email = $1 ORDER BY created_at DESC, id DESC"
            ))
            .bind(email)
            .fetch_all(self.pool)
            .await?;

            rows.into_iter().map(TryInto::try_into).collect()
        }
    }

    fn list_all(&self) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send {
        async move {
            let rows = sqlx::query_as::<_, OrderRow>(concat!(
                "SELECT ",
                order_columns!(),
                " FROM orders ORDER BY created_at DESC, id DESC"
            ))
            .fetch_all(self.pool)
            .await?;

            rows.into_iter().map(TryInto::try_into).collect()
        }
    }

    fn update(&self, order: &Order) -> impl Future<Output = Result<Order, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, OrderRow>(concat!(
                "UPDATE orders SET status = $2, version = version + 1, updated_at = NOW() \
                 WHERE id = $1 AND version = $3 \
                 RETURNING ",
                order_columns!()
            ))
            .bind(order.id)
            .bind(order.status)
            .bind(order.version)
            .fetch_optional(self.pool)
            .await?;

            match row {
                Some(row) => row.try_into(),
                None if self.exists(order.id).await? => Err(RepositoryError::Conflict(format!(
                    "order {} was modified concurrently",
                    order.id
                ))),
                None => Err(RepositoryError::NotFound),
            }
        }
    }

    fn record_payment(
        &self,
        id: OrderId,
        payment: &PaymentResult,
        paid_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<PaymentRecord, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, OrderRow>(concat!(
                "UPDATE orders SET is_paid = TRUE, status = 'paid', paid_at = $2, \
                 payment_id = $3, payment_reference = $4, payment_status = $5, \
                 payment_channel = $6, version = version + 1, updated_at = NOW() \
                 WHERE id = $1 AND is_paid = FALSE AND status IN ('pending', 'processing') \
                 RETURNING ",
                order_columns!()
            ))
            .bind(id)
            .bind(paid_at)
            .bind(&payment.id)
            .bind(&payment.reference)
            .bind(&payment.status)
            .bind(&payment.channel)
            .fetch_optional(self.pool)
            .await?;

            if let Some(row) = row {
                return Ok(PaymentRecord::Recorded(row.try_into()?));
            }

            Ok(match self.fetch_one(id).await? {
                None => PaymentRecord::Missing,
                Some(order) if order.is_paid => PaymentRecord::AlreadyPaid(order),
                Some(order) => PaymentRecord::NotPayable(order),
            })
        }
    }

    fn delete(&self, id: OrderId) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async move {
            let result = sqlx::query("DELETE FROM orders WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }

            Ok(())
        }
    }
}
