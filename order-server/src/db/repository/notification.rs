//! Notification Repository

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{Notification, OrderId};
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct NotificationRepository {
    base: BaseRepository,
}

impl NotificationRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Create an unread notification for a new order
    pub async fn create(
        &self,
        order: &OrderId,
        customer_name: &str,
        product_summary: &str,
    ) -> RepoResult<Notification> {
        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE notification SET
                    order_id = $order,
                    customer_name = $customer_name,
                    product_summary = $product_summary,
                    is_read = false,
                    created_at = $now
                RETURN AFTER"#,
            )
            .bind(("order", order.clone()))
            .bind(("customer_name", customer_name.to_string()))
            .bind(("product_summary", product_summary.to_string()))
            .bind(("now", now_millis()))
            .await?;

        let created: Option<Notification> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create notification".to_string()))
    }

    /// Newest first
    pub async fn find_all(&self, unread_only: bool) -> RepoResult<Vec<Notification>> {
        let sql = if unread_only {
            "SELECT * FROM notification WHERE is_read = false ORDER BY created_at DESC"
        } else {
            "SELECT * FROM notification ORDER BY created_at DESC"
        };
        let notifications: Vec<Notification> = self.base.db().query(sql).await?.take(0)?;
        Ok(notifications)
    }

    pub async fn mark_read(&self, id: &str) -> RepoResult<Notification> {
        let thing = parse_record_id("notification", id)?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $thing SET is_read = true RETURN AFTER")
            .bind(("thing", thing))
            .await?;
        let updated: Vec<Notification> = result.take(0)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Notification {} not found", id)))
    }

    /// 返回被标记的条数
    pub async fn mark_all_read(&self) -> RepoResult<usize> {
        let updated: Vec<Notification> = self
            .base
            .db()
            .query("UPDATE notification SET is_read = true WHERE is_read = false RETURN AFTER")
            .await?
            .take(0)?;
        Ok(updated.len())
    }
}
