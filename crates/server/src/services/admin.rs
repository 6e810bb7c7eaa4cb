//! Access-gated administration.
//!
//! Every operation starts with [`authorize`] for the admin role, so a
//! rejected caller never reaches a store. Order status changes are delegated
//! to [`OrderLifecycle`], which applies the same guard again.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use shopdesk_core::{OrderId, OrderStatus, ProductId, Role, UserId};

use super::access::{Caller, authorize};
use super::orders::OrderLifecycle;
use crate::db::{OrderStore, ProductStore, UserStore};
use crate::error::AppError;
use crate::models::{NewProduct, Order, Product, ProductPatch, PublicUser, check_amount};

/// Body of an admin order update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
}

/// Admin operations over users, orders and products.
pub struct AdminService<U, O, P> {
    users: U,
    orders: OrderLifecycle<O>,
    products: P,
}

impl<U, O, P> AdminService<U, O, P>
where
    U: UserStore,
    O: OrderStore,
    P: ProductStore,
{
    #[must_use]
    pub const fn new(users: U, orders: OrderLifecycle<O>, products: P) -> Self {
        Self {
            users,
            orders,
            products,
        }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// All users, without credential fields.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers.
    pub async fn list_users(&self, caller: Option<&Caller>) -> Result<Vec<PublicUser>, AppError> {
        authorize(caller, Role::Admin)?;
        let users = self.users.list_all().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    /// Delete a non-admin user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers,
    /// `AppError::NotFound` if the user does not exist, and
    /// `AppError::Conflict` if the target is an admin.
    #[instrument(skip_all, fields(target_user_id = %target))]
    pub async fn delete_user(
        &self,
        caller: Option<&Caller>,
        target: UserId,
    ) -> Result<(), AppError> {
        let caller = authorize(caller, Role::Admin)?;

        let user = self
            .users
            .get_by_id(target)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {target}")))?;
        if user.is_admin {
            return Err(AppError::Conflict(
                "admin accounts cannot be deleted".to_owned(),
            ));
        }

        // The store re-checks the admin flag in the same statement.
        self.users.delete_non_admin(target).await?;
        info!(admin_user_id = %caller.user_id, "User deleted");
        Ok(())
    }

    /// Grant or revoke admin rights.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers,
    /// `AppError::Conflict` when an admin tries to demote themselves, and
    /// `AppError::NotFound` if the user does not exist.
    #[instrument(skip_all, fields(target_user_id = %target, is_admin = is_admin))]
    pub async fn set_user_role(
        &self,
        caller: Option<&Caller>,
        target: UserId,
        is_admin: bool,
    ) -> Result<PublicUser, AppError> {
        let caller = authorize(caller, Role::Admin)?;

        if caller.user_id == target && !is_admin {
            return Err(AppError::Conflict(
                "admins cannot remove their own admin role".to_owned(),
            ));
        }

        let user = self
            .users
            .set_admin(target, is_admin)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::NotFound(_) => AppError::NotFound(format!("user {target}")),
                other => other,
            })?;

        info!(admin_user_id = %caller.user_id, "User role updated");
        Ok(user.into())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers.
    pub async fn list_orders(&self, caller: Option<&Caller>) -> Result<Vec<Order>, AppError> {
        authorize(caller, Role::Admin)?;
        self.orders.all_orders().await
    }

    /// Apply a partial update to an order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers,
    /// `AppError::NotFound` for unknown orders, and whatever
    /// [`OrderLifecycle::set_status`] rejects.
    pub async fn update_order(
        &self,
        caller: Option<&Caller>,
        id: OrderId,
        update: OrderUpdate,
    ) -> Result<Order, AppError> {
        authorize(caller, Role::Admin)?;

        match update.status {
            Some(status) => self.orders.set_status(id, status, caller).await,
            None => self.orders.get_order(id).await,
        }
    }

    /// Hard-delete an order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers and
    /// `AppError::NotFound` for unknown orders.
    pub async fn delete_order(&self, caller: Option<&Caller>, id: OrderId) -> Result<(), AppError> {
        authorize(caller, Role::Admin)?;
        self.orders.delete_order(id).await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers.
    pub async fn list_products(&self, caller: Option<&Caller>) -> Result<Vec<Product>, AppError> {
        authorize(caller, Role::Admin)?;
        Ok(self.products.list_all().await?)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers and
    /// `AppError::InvalidRequest` for a blank name, a negative stock, or a
    /// price that is negative or does not fit two decimal places below 10^10.
    #[instrument(skip_all, fields(name = %product.name))]
    pub async fn create_product(
        &self,
        caller: Option<&Caller>,
        product: NewProduct,
    ) -> Result<Product, AppError> {
        authorize(caller, Role::Admin)?;
        validate_product_fields(&product.name, product.price, product.stock)?;

        let created = self.products.create(product).await?;
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers,
    /// `AppError::NotFound` for unknown products and
    /// `AppError::InvalidRequest` if the result would be invalid.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn update_product(
        &self,
        caller: Option<&Caller>,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, AppError> {
        authorize(caller, Role::Admin)?;

        let mut product = self
            .products
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        if patch.is_empty() {
            return Ok(product);
        }

        product.apply(patch);
        validate_product_fields(&product.name, product.price, product.stock)?;

        let updated = self.products.update(&product).await?;
        info!("Product updated");
        Ok(updated)
    }

    /// Delete a product. Existing orders keep their item snapshots.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers and
    /// `AppError::NotFound` for unknown products.
    pub async fn delete_product(
        &self,
        caller: Option<&Caller>,
        id: ProductId,
    ) -> Result<(), AppError> {
        authorize(caller, Role::Admin)?;
        self.products.delete(id).await.map_err(|e| match AppError::from(e) {
            AppError::NotFound(_) => AppError::NotFound(format!("product {id}")),
            other => other,
        })?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

fn validate_product_fields(name: &str, price: Decimal, stock: i32) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidRequest("product name is required".to_owned()));
    }
    check_amount(price).map_err(|e| AppError::InvalidRequest(format!("price {e}")))?;
    if stock < 0 {
        return Err(AppError::InvalidRequest("stock cannot be negative".to_owned()));
    }
    Ok(())
}
