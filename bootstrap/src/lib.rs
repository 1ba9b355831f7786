//! review-bootstrap - 服务启动骨架
//!
//! 配置加载之后的公共步骤：遥测初始化、基础设施连接、关闭信号

mod infrastructure;
mod runtime;

pub use infrastructure::*;
pub use runtime::*;
