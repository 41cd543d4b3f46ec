//! User Repository

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{User, UserId};
use shared::models::Role;
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

/// 新用户 (密码已哈希)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub hash_pass: String,
    pub name: String,
    pub mobile: String,
    pub role: Role,
    pub approved: bool,
}

#[derive(Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_all(&self) -> RepoResult<Vec<User>> {
        let users: Vec<User> = self
            .base
            .db()
            .query("SELECT * FROM user ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(users)
    }

    /// Find user by "user:xxx" id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let thing = parse_record_id("user", id)?;
        self.find_by_record(&thing).await
    }

    pub async fn find_by_record(&self, id: &UserId) -> RepoResult<Option<User>> {
        let user: Option<User> = self.base.db().select(id.clone()).await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let username_owned = username.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM user WHERE username = $username LIMIT 1")
            .bind(("username", username_owned))
            .await?;
        let users: Vec<User> = result.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Create a new user
    pub async fn create(&self, data: NewUser) -> RepoResult<User> {
        // Check duplicate username
        if self.find_by_username(&data.username).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Username '{}' already exists",
                data.username
            )));
        }

        // 管理员始终视为已审核
        let approved = data.approved || data.role == Role::Admin;

        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE user SET
                    username = $username,
                    hash_pass = $hash_pass,
                    name = $name,
                    mobile = $mobile,
                    role = $role,
                    approved = $approved,
                    reward_points = 0,
                    created_at = $now
                RETURN AFTER"#,
            )
            .bind(("username", data.username.clone()))
            .bind(("hash_pass", data.hash_pass))
            .bind(("name", data.name))
            .bind(("mobile", data.mobile))
            .bind(("role", data.role))
            .bind(("approved", approved))
            .bind(("now", now_millis()))
            .await
            .map_err(|e| duplicate_or_database(e, &data.username))?;

        let created: Option<User> = result
            .take(0)
            .map_err(|e| duplicate_or_database(e, &data.username))?;
        created.ok_or_else(|| RepoError::Database("Failed to create user".to_string()))
    }

    /// 审核 / 撤销顾客的下单资格
    pub async fn set_approved(&self, id: &str, approved: bool) -> RepoResult<User> {
        let thing = parse_record_id("user", id)?;
        let existing = self
            .find_by_record(&thing)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("User {} not found", id)))?;

        if existing.is_admin() && !approved {
            return Err(RepoError::Validation(
                "Admin accounts are always approved".to_string(),
            ));
        }

        let mut result = self
            .base
            .db()
            .query("UPDATE $thing SET approved = $approved RETURN AFTER")
            .bind(("thing", thing))
            .bind(("approved", approved))
            .await?;
        result
            .take::<Option<User>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("User {} not found", id)))
    }

    /// 写入新的密码哈希
    pub async fn update_password(&self, id: &UserId, hash_pass: String) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $thing SET hash_pass = $hash_pass")
            .bind(("thing", id.clone()))
            .bind(("hash_pass", hash_pass))
            .await?
            .check()?;
        Ok(())
    }
}

/// 并发注册时唯一索引兜底
fn duplicate_or_database(err: surrealdb::Error, username: &str) -> RepoError {
    let message = err.to_string();
    if message.contains("user_username") {
        RepoError::Duplicate(format!("Username '{}' already exists", username))
    } else {
        RepoError::Database(message)
    }
}
