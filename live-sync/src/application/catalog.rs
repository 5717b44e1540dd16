use std::sync::Arc;
use tracker_core::{NewProduct, Product, ProductId, User, UserId, UserRequest};

use super::error::SyncError;
use super::stores::{ProductsStore, UsersStore};
use crate::domain::{ProductRepository, UserRepository};

/// Product and user administration. Server responses are written back
/// into the matching store.
pub struct Catalog {
    products_api: Arc<dyn ProductRepository>,
    users_api: Arc<dyn UserRepository>,
    products: Arc<ProductsStore>,
    users: Arc<UsersStore>,
}

impl Catalog {
    pub fn new(
        products_api: Arc<dyn ProductRepository>,
        users_api: Arc<dyn UserRepository>,
        products: Arc<ProductsStore>,
        users: Arc<UsersStore>,
    ) -> Self {
        Catalog {
            products_api,
            users_api,
            products,
            users,
        }
    }

    pub fn products(&self) -> &Arc<ProductsStore> {
        &self.products
    }

    pub fn users(&self) -> &Arc<UsersStore> {
        &self.users
    }

    // ========================================================================
    // Products
    // ========================================================================

    pub async fn load_products(&self) -> Result<usize, SyncError> {
        let products = self.products_api.list_products().await?;
        let count = products.len();
        self.products.set_products(products);
        Ok(count)
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, SyncError> {
        let created = self.products_api.create_product(product).await?;
        tracing::info!(product_id = created.id, name = %created.product, "product created");
        self.products.upsert(created.clone());
        Ok(created)
    }

    pub async fn update_product(&self, product: &Product) -> Result<Product, SyncError> {
        let updated = self.products_api.update_product(product).await?;
        self.products.upsert(updated.clone());
        Ok(updated)
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<(), SyncError> {
        self.products_api.delete_product(id).await?;
        self.products.remove(id);
        tracing::info!(product_id = id, "product deleted");
        Ok(())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn load_users(&self) -> Result<usize, SyncError> {
        let users = self.users_api.list_users().await?;
        let count = users.len();
        self.users.set_users(users);
        Ok(count)
    }

    pub async fn create_user(&self, user: &UserRequest) -> Result<User, SyncError> {
        let created = self.users_api.create_user(user).await?;
        tracing::info!(user_id = created.id, username = %created.username, "user created");
        self.users.upsert(created.clone());
        Ok(created)
    }

    pub async fn update_user(&self, user: &UserRequest) -> Result<User, SyncError> {
        let updated = self.users_api.update_user(user).await?;
        self.users.upsert(updated.clone());
        Ok(updated)
    }

    pub async fn delete_user(&self, id: UserId) -> Result<(), SyncError> {
        self.users_api.delete_user(id).await?;
        self.users.remove(id);
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }
}
