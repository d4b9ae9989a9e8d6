//! 连接守卫：保证已打开的连接恰好释放一次
//!
//! 正常路径显式调用 release().await；若执行 future 被丢弃或内部步骤 panic，
//! Drop 时把断开操作交给当前 tokio 运行时。

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::connection::Connection;

pub struct ConnectionGuard {
    conn: Arc<dyn Connection>,
    released: bool,
}

impl ConnectionGuard {
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Self {
            conn,
            released: false,
        }
    }

    /// 供注入内部步骤的共享句柄
    pub fn connection(&self) -> Arc<dyn Connection> {
        Arc::clone(&self.conn)
    }

    pub async fn release(mut self) {
        self.released = true;
        tracing::debug!(
            endpoint = %self.conn.endpoint().name,
            session = %self.conn.session_id(),
            "disconnecting from vSphere"
        );
        self.conn.disconnect().await;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let conn = Arc::clone(&self.conn);
        match Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    endpoint = %conn.endpoint().name,
                    "connection dropped without release, disconnecting in background"
                );
                handle.spawn(async move {
                    conn.disconnect().await;
                });
            }
            Err(_) => {
                tracing::error!(
                    endpoint = %conn.endpoint().name,
                    "connection dropped outside of a runtime, session left open"
                );
            }
        }
    }
}
