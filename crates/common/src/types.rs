//! 通用类型定义

use serde::{Deserialize, Serialize};

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// 分页参数（page 从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size,
        }
    }

    /// 当前页第一条记录之前需要跳过的条数，溢出时取 u32::MAX
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// 当前页最后一条记录的位置（不含），即需要拉取的总条数，溢出时取 u32::MAX
    pub fn end(&self) -> u32 {
        self.page.max(1).saturating_mul(self.page_size)
    }
}
