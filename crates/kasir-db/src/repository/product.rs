//! # Product Repository
//!
//! Catalog reads for checkout pricing, plus the writes the tests and
//! seeding paths need. Checkout never mutates the catalog; it only
//! snapshots prices into transaction items.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::{Product, ProductVariant};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product.
    pub async fn create(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, base_price, tax_rate_bps,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(product.base_price)
        .bind(product.tax_rate_bps)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a product variant.
    pub async fn create_variant(&self, variant: &ProductVariant) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, name, additional_price)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.name)
        .bind(variant.additional_price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, base_price, tax_rate_bps,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a variant by ID, scoped to its product.
    pub async fn find_variant(
        &self,
        product_id: &str,
        variant_id: &str,
    ) -> DbResult<Option<ProductVariant>> {
        let variant = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT id, product_id, name, additional_price
            FROM product_variants
            WHERE id = ?1 AND product_id = ?2
            "#,
        )
        .bind(variant_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variant)
    }

    /// Lists all variants for a product.
    pub async fn variants(&self, product_id: &str) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT id, product_id, name, additional_price
            FROM product_variants
            WHERE product_id = ?1
            ORDER BY name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Lists active products for a tenant.
    pub async fn list_active(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, base_price, tax_rate_bps,
                   is_active, created_at, updated_at
            FROM products
            WHERE tenant_id = ?1 AND is_active = 1
            ORDER BY name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Deactivates a product (soft delete).
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use kasir_core::Money;
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_product(tenant_id: &str) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: "Kopi Susu".to_string(),
            base_price: Money::from_minor(18_000),
            tax_rate_bps: 1_000,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_product() {
        let db = test_db().await;
        let repo = db.products();

        let product = sample_product("tenant-1");
        repo.create(&product).await.unwrap();

        let found = repo.find_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Kopi Susu");
        assert_eq!(found.base_price, Money::from_minor(18_000));
        assert_eq!(found.tax_rate_bps, 1_000);
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn test_variants() {
        let db = test_db().await;
        let repo = db.products();

        let product = sample_product("tenant-1");
        repo.create(&product).await.unwrap();

        let variant = ProductVariant {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            name: "Large".to_string(),
            additional_price: Money::from_minor(4_000),
        };
        repo.create_variant(&variant).await.unwrap();

        let found = repo
            .find_variant(&product.id, &variant.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.additional_price, Money::from_minor(4_000));

        let all = repo.variants(&product.id).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_list_active_excludes_deactivated() {
        let db = test_db().await;
        let repo = db.products();

        let product = sample_product("tenant-1");
        repo.create(&product).await.unwrap();
        assert_eq!(repo.list_active("tenant-1").await.unwrap().len(), 1);

        repo.deactivate(&product.id).await.unwrap();
        assert!(repo.list_active("tenant-1").await.unwrap().is_empty());
    }
}
