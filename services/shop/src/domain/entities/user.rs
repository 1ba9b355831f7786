//! 用户实体

use chrono::{DateTime, Utc};
use review_ports::Identified;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub phone: String,
    pub nick_name: String,
    pub icon: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(phone: impl Into<String>, nick_name: impl Into<String>) -> Self {
        Self {
            id: None,
            phone: phone.into(),
            nick_name: nick_name.into(),
            icon: String::new(),
            created_at: None,
        }
    }

    /// 对外展示的摘要，不含手机号；未持久化的用户没有摘要
    pub fn summary(&self) -> Option<UserSummary> {
        self.id.map(|id| UserSummary {
            id,
            nick_name: self.nick_name.clone(),
            icon: self.icon.clone(),
        })
    }
}

impl Identified for User {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

/// 用户摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub nick_name: String,
    pub icon: String,
}
