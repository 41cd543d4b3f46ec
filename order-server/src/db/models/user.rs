//! User Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use shared::models::{Role, UserInfo};
use surrealdb::RecordId;

/// User ID type
pub type UserId = RecordId;

/// User model matching SurrealDB schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<UserId>,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default, skip_serializing)]
    pub hash_pass: String,
    pub role: Role,
    /// 顾客需管理员审核后才能下单；管理员始终为 true
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub approved: bool,
    #[serde(default)]
    pub reward_points: i64,
    #[serde(default)]
    pub created_at: i64,
}

impl User {
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 管理员视为已审核
    pub fn can_order(&self) -> bool {
        self.is_admin() || self.approved
    }

    pub fn verify_password(&self, password: &str) -> Result<bool, argon2::password_hash::Error> {
        crate::auth::password::verify_password(password, &self.hash_pass)
    }

    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id_string(),
            username: self.username.clone(),
            name: self.name.clone(),
            mobile: self.mobile.clone(),
            role: self.role,
            approved: self.can_order(),
            reward_points: self.reward_points,
        }
    }
}
