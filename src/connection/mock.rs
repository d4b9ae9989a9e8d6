//! Mock 连接器（用于测试与 --dry-run，无需真实 vCenter）
//!
//! 统计打开 / 释放次数，可配置为连接失败。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::cloud::EndpointConfig;
use crate::connection::{Connection, Connector};

/// 打开 / 释放计数，连接器与其产出的连接共享
#[derive(Debug, Default)]
pub struct ConnectionStats {
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl ConnectionStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// 当前未释放的连接数
    pub fn active(&self) -> usize {
        self.opened().saturating_sub(self.released())
    }
}

#[derive(Debug, Default)]
pub struct MockConnector {
    stats: Arc<ConnectionStats>,
    fail_with: Option<String>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次 connect 都返回该错误
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            stats: Arc::default(),
            fail_with: Some(message.into()),
        }
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Connection>, String> {
        if let Some(msg) = &self.fail_with {
            return Err(msg.clone());
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            endpoint: endpoint.clone(),
            session_id: uuid::Uuid::new_v4().to_string(),
            closed: AtomicBool::new(false),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MockConnection {
    endpoint: EndpointConfig,
    session_id: String,
    closed: AtomicBool,
    stats: Arc<ConnectionStats>,
}

#[async_trait]
impl Connection for MockConnection {
    fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn disconnect(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.stats.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
