//! Product repository for database operations.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shopdesk_core::ProductId;

use super::{ProductStore, RepositoryError};
use crate::models::{NewProduct, Product};

macro_rules! product_columns {
    () => {
        "id, name, price, description, image, category, stock, created_at, updated_at"
    };
}

/// Internal row type for `PostgreSQL` product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    description: String,
    image: String,
    category: String,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: row.price,
            description: row.description,
            image: row.image,
            category: row.category,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl ProductStore for ProductRepository<'_> {
    fn get_by_id(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, ProductRow>(concat!(
                "SELECT ",
                product_columns!(),
                " FROM products WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

            Ok(row.map(Into::into))
        }
    }

    fn list_all(&self) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send {
        async move {
            let rows = sqlx::query_as::<_, ProductRow>(concat!(
                "SELECT ",
                product_columns!(),
                " FROM products ORDER BY created_at DESC, id DESC"
            ))
            .fetch_all(self.pool)
            .await?;

            Ok(rows.into_iter().map(Into::into).collect())
        }
    }

    fn create(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, ProductRow>(concat!(
                "INSERT INTO products (name, price, description, image, category, stock) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING ",
                product_columns!()
            ))
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.description)
            .bind(&product.image)
            .bind(&product.category)
            .bind(product.stock)
            .fetch_one(self.pool)
            .await?;

            Ok(row.into())
        }
    }

    fn update(
        &self,
        product: &Product,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send {
        async move {
            let row = sqlx::query_as::<_, ProductRow>(concat!(
                "UPDATE products SET name = $2, price = $3, description = $4, image = $5, \
                 category = $6, stock = $7, updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING ",
                product_columns!()
            ))
            .bind(product.id)
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.description)
            .bind(&product.image)
            .bind(&product.category)
            .bind(product.stock)
            .fetch_optional(self.pool)
            .await?;

            row.map(Into::into).ok_or(RepositoryError::NotFound)
        }
    }

    fn delete(&self, id: ProductId) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async move {
            let result = sqlx::query("DELETE FROM products WHERE id = $1")
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
