use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 关注关系：`user_id` 关注了 `follow_user_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub id: Option<i64>,
    pub user_id: i64,
    pub follow_user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    pub fn new(user_id: i64, follow_user_id: i64) -> Self {
        Self {
            id: None,
            user_id,
            follow_user_id,
            created_at: Utc::now(),
        }
    }
}
