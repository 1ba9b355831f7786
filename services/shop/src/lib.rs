//! Shop Service Library
//!
//! 在缓存一致性层之上实现的点评业务：
//! - `domain`: 店铺、店铺类型、用户、关注实体与仓储 trait
//! - `application`: 店铺查询/更新、类型列表、关注、签到
//! - `infrastructure`: PostgreSQL 持久化
//! - `wiring`: 按配置组装读策略

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod wiring;
