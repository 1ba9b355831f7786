//! 关注与共同关注
//!
//! 关注关系以数据库为准，同时镜像到 `follows:{userId}` 集合，共同关注直接求集合交集

use std::sync::Arc;

use metrics::counter;
use review_errors::AppResult;
use review_ports::{CachePort, RecordStore};
use tracing::{info, warn};

use crate::domain::entities::{Follow, User, UserSummary};
use crate::domain::repositories::FollowRepository;
use crate::error::ShopError;

pub fn follow_key(user_id: i64) -> String {
    format!("follows:{}", user_id)
}

pub struct FollowService {
    cache: Arc<dyn CachePort>,
    follows: Arc<dyn FollowRepository>,
    users: Arc<dyn RecordStore<User>>,
}

impl FollowService {
    pub fn new(
        cache: Arc<dyn CachePort>,
        follows: Arc<dyn FollowRepository>,
        users: Arc<dyn RecordStore<User>>,
    ) -> Self {
        Self {
            cache,
            follows,
            users,
        }
    }

    /// 关注（`follow = true`）或取关
    pub async fn follow(&self, user_id: i64, target_id: i64, follow: bool) -> AppResult<()> {
        if user_id == target_id {
            return Err(ShopError::SelfFollow.into());
        }

        let key = follow_key(user_id);
        if follow {
            self.follows.insert(&Follow::new(user_id, target_id)).await?;
            self.cache.set_add(&key, &target_id.to_string()).await?;
            counter!("follow_total", "action" => "follow").increment(1);
        } else {
            if self.follows.delete(user_id, target_id).await? {
                self.cache.set_remove(&key, &target_id.to_string()).await?;
            }
            counter!("follow_total", "action" => "unfollow").increment(1);
        }

        info!(user_id, target_id, follow, "Follow state changed");
        Ok(())
    }

    pub async fn is_following(&self, user_id: i64, target_id: i64) -> AppResult<bool> {
        self.follows.exists(user_id, target_id).await
    }

    /// 两个用户共同关注的人，按用户 ID 升序
    pub async fn common_follows(&self, user_id: i64, other_id: i64) -> AppResult<Vec<UserSummary>> {
        let (mine, theirs) = (follow_key(user_id), follow_key(other_id));
        let members = self.cache.set_intersect(&[mine.as_str(), theirs.as_str()]).await?;

        let ids: Vec<i64> = members
            .iter()
            .filter_map(|member| match member.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(member = %member, "Ignoring non-numeric follow member");
                    None
                }
            })
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut summaries: Vec<UserSummary> = self
            .users
            .list_by_ids(&ids)
            .await?
            .iter()
            .filter_map(User::summary)
            .collect();
        summaries.sort_by_key(|summary| summary.id);
        Ok(summaries)
    }
}
