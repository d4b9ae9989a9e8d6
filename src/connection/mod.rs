//! vSphere 连接抽象
//!
//! Connector 根据 EndpointConfig 建立 Connection；Connection 在一次执行内由容器与内部步骤共享，
//! 执行结束前由 ConnectionGuard 负责断开且只断开一次。

pub mod guard;
pub mod mock;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;

use crate::cloud::EndpointConfig;

pub use guard::ConnectionGuard;
pub use mock::{ConnectionStats, MockConnector};
pub use rest::RestConnector;

/// 已建立的 vSphere 会话
#[async_trait]
pub trait Connection: Send + Sync {
    /// 建立连接时使用的端点配置
    fn endpoint(&self) -> &EndpointConfig;

    fn session_id(&self) -> &str;

    /// 断开会话；重复调用无副作用，失败只记录日志
    async fn disconnect(&self);
}

/// 连接工厂
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Connection>, String>;
}
