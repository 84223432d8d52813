//! # Product Repository
//!
//! Menu items and their tax categories.
//!
//! The tax engine only ever asks one question of this table: which category
//! does a product belong to. Batched lookups answer it for a whole order in
//! a single `IN (...)` query. Soft-deleted products still answer, since an
//! order may reference an item taken off the menu after it was rung up.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use tavola_core::{LookupResult, Product, ProductTaxLookup, TaxCategory};

use crate::error::{DbError, DbResult};
use crate::repository::with_timeout;

const STORE: &str = "products";

/// Row as stored; `tax_category` is validated on the way out.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    tenant_id: String,
    sku: String,
    name: String,
    price_cents: i64,
    tax_category: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let tax_category = parse_category(&row.id, row.tax_category.as_deref())?;
        Ok(Product {
            id: row.id,
            tenant_id: row.tenant_id,
            sku: row.sku,
            name: row.name,
            price_cents: row.price_cents,
            tax_category,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Empty or missing labels mean "untaxed"; anything else must be a valid category.
fn parse_category(product_id: &str, raw: Option<&str>) -> DbResult<Option<TaxCategory>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => TaxCategory::new(label)
            .map(Some)
            .map_err(|e| DbError::malformed("product", product_id, e)),
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: String,
    tax_category: Option<String>,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let stored = repo.insert(&Product::new("STEAK-01", "Ribeye", 8475, Some(food))).await?;
/// let category = repo.tax_category(&stored.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    tenant_id: String,
    query_timeout: Duration,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, tenant_id: impl Into<String>, query_timeout: Duration) -> Self {
        ProductRepository {
            pool,
            tenant_id: tenant_id.into(),
            query_timeout,
        }
    }

    /// Inserts a product under this repository's tenant.
    ///
    /// ## Returns
    /// The stored product (tenant id replaced by the repository's).
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - SKU already used by this tenant
    /// * `DbError::QueryFailed` - negative price (CHECK constraint)
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        let stored = Product {
            tenant_id: self.tenant_id.clone(),
            ..product.clone()
        };

        let result = with_timeout(
            self.query_timeout,
            "products.insert",
            sqlx::query(
                r#"
                INSERT INTO products (
                    id, tenant_id, sku, name, price_cents,
                    tax_category, is_active, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&stored.id)
            .bind(&stored.tenant_id)
            .bind(&stored.sku)
            .bind(&stored.name)
            .bind(stored.price_cents)
            .bind(stored.tax_category.as_ref())
            .bind(stored.is_active)
            .bind(stored.created_at)
            .bind(stored.updated_at)
            .execute(&self.pool),
        )
        .await;

        match result {
            Ok(_) => Ok(stored),
            Err(DbError::UniqueViolation { field, .. }) => {
                Err(DbError::duplicate(field, stored.sku.clone()))
            }
            Err(other) => Err(other),
        }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found for this tenant
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = with_timeout(
            self.query_timeout,
            "products.get_by_id",
            sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT id, tenant_id, sku, name, price_cents, tax_category,
                       is_active, created_at, updated_at
                FROM products
                WHERE tenant_id = ?1 AND id = ?2
                "#,
            )
            .bind(&self.tenant_id)
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Gets a product by its SKU (e.g. "STEAK-01").
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let row = with_timeout(
            self.query_timeout,
            "products.get_by_sku",
            sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT id, tenant_id, sku, name, price_cents, tax_category,
                       is_active, created_at, updated_at
                FROM products
                WHERE tenant_id = ?1 AND sku = ?2
                "#,
            )
            .bind(&self.tenant_id)
            .bind(sku)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Counts active products for this tenant.
    pub async fn count(&self) -> DbResult<i64> {
        with_timeout(
            self.query_timeout,
            "products.count",
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND is_active = 1",
            )
            .bind(&self.tenant_id)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn fetch_categories(
        &self,
        product_ids: &BTreeSet<String>,
    ) -> DbResult<BTreeMap<String, Option<TaxCategory>>> {
        // Unknown products are untaxed
        let mut categories: BTreeMap<String, Option<TaxCategory>> =
            product_ids.iter().map(|id| (id.clone(), None)).collect();
        if product_ids.is_empty() {
            return Ok(categories);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, tax_category FROM products WHERE tenant_id = ");
        builder.push_bind(self.tenant_id.clone());
        builder.push(" AND id IN (");
        let mut ids = builder.separated(", ");
        for id in product_ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(")");

        let rows = with_timeout(
            self.query_timeout,
            "products.tax_categories",
            builder.build_query_as::<CategoryRow>().fetch_all(&self.pool),
        )
        .await?;

        debug!(
            requested = product_ids.len(),
            found = rows.len(),
            "Fetched product tax categories"
        );

        for row in rows {
            let category = parse_category(&row.id, row.tax_category.as_deref())?;
            categories.insert(row.id, category);
        }
        Ok(categories)
    }
}

impl ProductTaxLookup for ProductRepository {
    async fn tax_category(&self, product_id: &str) -> LookupResult<Option<TaxCategory>> {
        let ids = BTreeSet::from([product_id.to_string()]);
        let mut categories = self
            .fetch_categories(&ids)
            .await
            .map_err(|e| e.into_data_access(STORE))?;
        Ok(categories.remove(product_id).flatten())
    }

    async fn tax_categories(
        &self,
        product_ids: &BTreeSet<String>,
    ) -> LookupResult<BTreeMap<String, Option<TaxCategory>>> {
        self.fetch_categories(product_ids)
            .await
            .map_err(|e| e.into_data_access(STORE))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tavola_core::DataAccessError;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn food() -> TaxCategory {
        TaxCategory::new("FOOD").unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = db.products();

        let stored = repo
            .insert(&Product::new("STEAK-01", "Ribeye", 8475, Some(food())))
            .await
            .unwrap();
        let loaded = repo.get_by_id(&stored.id).await.unwrap().unwrap();

        assert_eq!(loaded.sku, "STEAK-01");
        assert_eq!(loaded.price_cents, 8475);
        assert_eq!(loaded.tax_category, Some(food()));
        assert!(loaded.is_active);
        assert_eq!(repo.count().await.unwrap(), 1);

        let by_sku = repo.get_by_sku("STEAK-01").await.unwrap().unwrap();
        assert_eq!(by_sku.id, stored.id);
        assert!(repo.get_by_sku("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = setup().await;
        let repo = db.products();
        repo.insert(&Product::new("FRIES", "Fries", 1500, Some(food())))
            .await
            .unwrap();

        let err = repo
            .insert(&Product::new("FRIES", "Large fries", 1900, Some(food())))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { value, .. } if value == "FRIES"));
    }

    #[tokio::test]
    async fn test_negative_price_violates_check() {
        let db = setup().await;
        let err = db
            .products()
            .insert(&Product::new("BAD", "Refund", -100, None))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_batched_categories() {
        let db = setup().await;
        let repo = db.products();
        let burger = repo
            .insert(&Product::new("BURGER", "Burger", 2400, Some(food())))
            .await
            .unwrap();
        let water = repo
            .insert(&Product::new("WATER", "Still water", 300, None))
            .await
            .unwrap();

        let ids = BTreeSet::from([burger.id.clone(), water.id.clone(), "missing".to_string()]);
        let categories = repo.tax_categories(&ids).await.unwrap();

        assert_eq!(categories.len(), 3);
        assert_eq!(categories[&burger.id], Some(food()));
        assert_eq!(categories[&water.id], None);
        assert_eq!(categories["missing"], None);
    }

    #[tokio::test]
    async fn test_other_tenant_is_invisible() {
        let db = setup().await;
        let stored = db
            .products()
            .insert(&Product::new("BURGER", "Burger", 2400, Some(food())))
            .await
            .unwrap();

        let other = ProductRepository::new(db.pool().clone(), "tenant-b", db.query_timeout());
        assert!(other.get_by_id(&stored.id).await.unwrap().is_none());
        assert_eq!(other.tax_category(&stored.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_category_surfaces() {
        let db = setup().await;
        let stored = db
            .products()
            .insert(&Product::new("WINE", "House red", 900, None))
            .await
            .unwrap();
        sqlx::query("UPDATE products SET tax_category = 'not a category!' WHERE id = ?1")
            .bind(&stored.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.products().tax_category(&stored.id).await.unwrap_err();
        assert!(matches!(err, DataAccessError::Malformed { store, .. } if store == STORE));
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let db = setup().await;
        let repo = db.products();
        db.close().await;

        let err = repo.tax_category("anything").await.unwrap_err();
        assert!(matches!(err, DataAccessError::Unavailable { .. }));
    }
}
