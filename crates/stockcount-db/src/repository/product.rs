//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Barcode lookup on every scan (company scoped, active only)
//! - Create/edit from the counting screen (row becomes `pending`)
//! - Soft delete: synced products are never removed, only deactivated
//!
//! ## Scan Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Scanner: "7891000100103"                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_by_barcode(company_id, barcode)                                    │
//! │       │        idx_products_barcode (company_id, barcode)               │
//! │       ├── Some(product) → SCAN_ADD with product_id                      │
//! │       └── None          → PENDING_UNKNOWN with the raw barcode          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockcount_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, company_id, sku, name, barcode, unit, price, active, created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
/// let product = repo.get_by_barcode(&company_id, "7891000100103").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Finds the active product carrying `barcode` within a company.
    ///
    /// If two rows share the barcode (created on two offline devices), the
    /// most recently updated one wins.
    pub async fn get_by_barcode(&self, company_id: &str, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE company_id = ?1 AND barcode = ?2 AND active = 1
            ORDER BY updated_at DESC
            LIMIT 1
            "#
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(company_id)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Active products of a company, by name.
    pub async fn list_active(&self, company_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE company_id = ?1 AND active = 1 ORDER BY name COLLATE NOCASE"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Every product, inactive ones included.
    ///
    /// Reports use this so events that reference a deactivated product
    /// still resolve to its name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product as `pending`.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(product_id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, company_id, sku, name, barcode, unit, price, active,
                created_at, updated_at,
                sync_status, sync_attempts, last_sync_error
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10,
                'pending', 0, NULL
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.company_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.unit)
        .bind(product.price)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing product and marks it `pending`.
    ///
    /// ## Errors
    /// `DbError::NotFound` if the product doesn't exist.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(product_id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                barcode = ?4,
                unit = ?5,
                price = ?6,
                active = ?7,
                updated_at = ?8,
                sync_status = 'pending'
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.unit)
        .bind(product.price)
        .bind(product.active)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product by clearing `active`.
    ///
    /// Past events keep referencing the product id.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(product_id = %id, "Deactivating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                active = 0,
                updated_at = ?2,
                sync_status = 'pending'
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Products created or edited locally that the backend hasn't stored.
    pub async fn pending_products(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sync_status IN ('pending', 'failed') ORDER BY created_at ASC"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Marks pushed products as synced.
    ///
    /// Each entry pairs an id with the `updated_at` that was pushed; rows
    /// edited after the snapshot stay pending.
    pub async fn mark_products_synced(&self, pushed: &[(String, DateTime<Utc>)]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for (id, version) in pushed {
            sqlx::query(
                r#"
                UPDATE products SET
                    sync_status = 'synced',
                    sync_attempts = 0,
                    last_sync_error = NULL
                WHERE id = ?1 AND updated_at = ?2
                "#,
            )
            .bind(id)
            .bind(version)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Records a push failure on each product.
    pub async fn mark_products_failed(&self, ids: &[String], error: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for id in ids {
            sqlx::query(
                r#"
                UPDATE products SET
                    sync_status = 'failed',
                    sync_attempts = sync_attempts + 1,
                    last_sync_error = ?2
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .bind(error)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Counts active products (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use stockcount_core::{Product, ProductDraft};

    fn draft(name: &str, barcode: &str) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            barcode: Some(barcode.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_barcode_lookup_is_company_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let ours = Product::from_draft(draft("Beans 1kg", "789"), "company-a");
        let theirs = Product::from_draft(draft("Other beans", "789"), "company-b");
        repo.insert(&ours).await.unwrap();
        repo.insert(&theirs).await.unwrap();

        let found = repo.get_by_barcode("company-a", "789").await.unwrap().unwrap();
        assert_eq!(found.id, ours.id);
        assert!(repo.get_by_barcode("company-a", "000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut product = Product::from_draft(draft("Rice", "111"), "company-a");
        repo.insert(&product).await.unwrap();

        product.apply_draft(draft("Rice 5kg", "111"));
        repo.update(&product).await.unwrap();
        let loaded = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Rice 5kg");

        repo.deactivate(&product.id).await.unwrap();
        assert!(repo.get_by_barcode("company-a", "111").await.unwrap().is_none());
        assert!(repo.list_active("company-a").await.unwrap().is_empty());
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
        assert!(!repo.get_by_id(&product.id).await.unwrap().unwrap().active);

        assert!(repo.deactivate("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_pending_products_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let a = Product::from_draft(draft("A", "1"), "c");
        let b = Product::from_draft(draft("B", "2"), "c");
        repo.insert(&a).await.unwrap();
        repo.insert(&b).await.unwrap();
        assert_eq!(repo.pending_products().await.unwrap().len(), 2);

        repo.mark_products_synced(&[(a.id.clone(), a.updated_at)])
            .await
            .unwrap();
        repo.mark_products_failed(&[b.id.clone()], "timeout")
            .await
            .unwrap();

        let pending = repo.pending_products().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }
}
