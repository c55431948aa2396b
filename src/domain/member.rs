use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::MemberId;

/// 会員
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: Option<String>,
    /// falseにすると貸出権限を失う（記録は残る）
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

/// 会員登録の入力
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMember {
    #[validate(length(min = 1, message = "last_name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    pub phone: Option<String>,
}

/// 会員情報の部分更新
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MemberUpdate {
    #[validate(length(min = 1, message = "last_name must not be empty"))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    pub first_name: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

impl Member {
    /// 新規会員（有効状態で登録）
    pub fn register(input: NewMember, registered_at: DateTime<Utc>) -> Self {
        Self {
            member_id: MemberId::new(),
            last_name: input.last_name,
            first_name: input.first_name,
            email: input.email,
            phone: input.phone.filter(|p| !p.is_empty()),
            active: true,
            registered_at,
        }
    }

    /// 指定されたフィールドだけを置き換えた会員を返す
    pub fn apply(&self, update: MemberUpdate) -> Self {
        Self {
            last_name: update.last_name.unwrap_or_else(|| self.last_name.clone()),
            first_name: update.first_name.unwrap_or_else(|| self.first_name.clone()),
            email: update.email.unwrap_or_else(|| self.email.clone()),
            phone: update.phone.or_else(|| self.phone.clone()),
            active: update.active.unwrap_or(self.active),
            ..self.clone()
        }
    }
}
