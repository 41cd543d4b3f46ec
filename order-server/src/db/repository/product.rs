//! Product Repository
//!
//! 库存的原子增减 (`reserve_stock` / `release_stock`) 都是单条条件 UPDATE，
//! 由存储层保证并发安全，不做读后写。

use super::{BaseRepository, RepoError, RepoResult, parse_record_id, retry_on_conflict};
use crate::db::models::{Product, ProductId};
use shared::models::{ProductCreate, ProductUpdate};
use shared::util::{money_to_f64, now_millis};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all products
    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product ORDER BY name")
            .await?
            .take(0)?;
        Ok(products)
    }

    /// Find product by "product:xxx" id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        let thing = parse_record_id("product", id)?;
        self.find_by_record(&thing).await
    }

    pub async fn find_by_record(&self, id: &ProductId) -> RepoResult<Option<Product>> {
        let product: Option<Product> = self.base.db().select(id.clone()).await?;
        Ok(product)
    }

    /// Create a new product
    pub async fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        let now = now_millis();
        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE product SET
                    name = $name,
                    description = $description,
                    price = $price,
                    discount = $discount,
                    stock = $stock,
                    size = $size,
                    category = $category,
                    created_at = $now,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("name", data.name))
            .bind(("description", data.description))
            .bind(("price", money_to_f64(data.price)))
            .bind(("discount", money_to_f64(data.discount)))
            .bind(("stock", data.stock))
            .bind(("size", data.size))
            .bind(("category", data.category))
            .bind(("now", now))
            .await?;

        let created: Option<Product> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    /// Update a product (only fields present in `data` are written)
    pub async fn update(&self, id: &str, data: ProductUpdate) -> RepoResult<Product> {
        let thing = parse_record_id("product", id)?;
        if self.find_by_record(&thing).await?.is_none() {
            return Err(RepoError::NotFound(format!("Product {} not found", id)));
        }

        let mut patch = serde_json::to_value(&data)
            .map_err(|e| RepoError::Validation(format!("Invalid product update: {}", e)))?;
        if let Some(fields) = patch.as_object_mut() {
            fields.insert("updated_at".to_string(), now_millis().into());
        }

        let mut result = retry_on_conflict("product.update", || {
            let thing = thing.clone();
            let patch = patch.clone();
            async move {
                Ok(self
                    .base
                    .db()
                    .query("UPDATE $thing MERGE $patch RETURN AFTER")
                    .bind(("thing", thing))
                    .bind(("patch", patch))
                    .await?)
            }
        })
        .await?;

        result
            .take::<Option<Product>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    /// Hard delete a product
    ///
    /// Historical orders keep their own snapshot of name and price.
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let thing = parse_record_id("product", id)?;
        let deleted: Option<Product> = self.base.db().delete(thing).await?;
        Ok(deleted.is_some())
    }

    /// 原子扣减库存: 仅当 `stock >= quantity` 时生效
    ///
    /// 返回扣减后的商品；库存不足或商品不存在时返回 `None`。
    /// 写冲突时按指数退避重试。
    pub async fn reserve_stock(&self, id: &ProductId, quantity: i64) -> RepoResult<Option<Product>> {
        retry_on_conflict("product.reserve_stock", || async move {
            let mut result = self
                .base
                .db()
                .query(
                    "UPDATE $product SET stock -= $qty, updated_at = $now \
                     WHERE stock >= $qty RETURN AFTER",
                )
                .bind(("product", id.clone()))
                .bind(("qty", quantity))
                .bind(("now", now_millis()))
                .await?;
            let updated: Vec<Product> = result.take(0)?;
            Ok(updated.into_iter().next())
        })
        .await
    }

    /// 原子归还库存
    ///
    /// 商品已被删除时返回 `None`。
    pub async fn release_stock(&self, id: &ProductId, quantity: i64) -> RepoResult<Option<Product>> {
        retry_on_conflict("product.release_stock", || async move {
            let mut result = self
                .base
                .db()
                .query("UPDATE $product SET stock += $qty, updated_at = $now RETURN AFTER")
                .bind(("product", id.clone()))
                .bind(("qty", quantity))
                .bind(("now", now_millis()))
                .await?;
            let updated: Vec<Product> = result.take(0)?;
            Ok(updated.into_iter().next())
        })
        .await
    }
}
