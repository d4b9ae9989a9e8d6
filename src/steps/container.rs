//! vSphere 构建步骤容器
//!
//! 构造时把字面服务器名解析为稳定 hash 并保存（之后不再按名称查找）；哨兵 `${VSPHERE_CLOUD_NAME}`
//! 推迟到执行时按展开后的名称查找。执行顺序严格为：解析 → 连接 → 委托内部步骤 → 断开，
//! 已打开的连接在任何退出路径上都恰好断开一次；所有错误统一转为只带消息的 AbortError。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::cloud::{EndpointConfig, EndpointRegistry};
use crate::connection::{ConnectionGuard, Connector};
use crate::core::{AbortError, StepError};
use crate::steps::{BuildStep, ExecutionContext};

/// 「使用执行环境绑定的服务器」哨兵
pub const SELECTABLE_SERVER_NAME: &str = "${VSPHERE_CLOUD_NAME}";

/// 服务器引用：字面名（可含变量）或从环境变量选择
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointReference {
    Literal(String),
    FromEnvironment,
}

impl EndpointReference {
    pub fn parse(server_name: &str) -> Self {
        if server_name == SELECTABLE_SERVER_NAME {
            EndpointReference::FromEnvironment
        } else {
            EndpointReference::Literal(server_name.to_string())
        }
    }

    /// 原始字符串形式（哨兵还原为 `${VSPHERE_CLOUD_NAME}`）
    pub fn as_str(&self) -> &str {
        match self {
            EndpointReference::Literal(name) => name,
            EndpointReference::FromEnvironment => SELECTABLE_SERVER_NAME,
        }
    }
}

pub struct BuildStepContainer {
    step: Box<dyn BuildStep>,
    reference: EndpointReference,
    /// 仅字面引用持有；哨兵模式为 None
    server_hash: Option<i32>,
    registry: Arc<dyn EndpointRegistry>,
    connector: Arc<dyn Connector>,
}

impl BuildStepContainer {
    /// 字面服务器名必须已注册，否则返回 Configuration 错误
    pub fn new(
        step: Box<dyn BuildStep>,
        server_name: &str,
        registry: Arc<dyn EndpointRegistry>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, StepError> {
        let reference = EndpointReference::parse(server_name);
        let server_hash = match &reference {
            EndpointReference::Literal(name) => Some(
                registry
                    .lookup_by_name(name)
                    .map_err(|e| StepError::Configuration(e.to_string()))?
                    .hash(),
            ),
            EndpointReference::FromEnvironment => None,
        };
        Ok(Self {
            step,
            reference,
            server_hash,
            registry,
            connector,
        })
    }

    /// 从持久化记录恢复：不访问注册表，沿用保存的 hash
    pub fn restore(
        step: Box<dyn BuildStep>,
        server_name: &str,
        server_hash: Option<i32>,
        registry: Arc<dyn EndpointRegistry>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let reference = EndpointReference::parse(server_name);
        let server_hash = match reference {
            EndpointReference::Literal(_) => server_hash,
            EndpointReference::FromEnvironment => None,
        };
        Self {
            step,
            reference,
            server_hash,
            registry,
            connector,
        }
    }

    pub fn server_name(&self) -> &str {
        self.reference.as_str()
    }

    pub fn reference(&self) -> &EndpointReference {
        &self.reference
    }

    pub fn server_hash(&self) -> Option<i32> {
        self.server_hash
    }

    pub fn build_step(&self) -> &dyn BuildStep {
        self.step.as_ref()
    }

    pub async fn execute(&mut self, ctx: &ExecutionContext) -> Result<(), AbortError> {
        let server_name = ctx.effective_env().expand(self.server_name());
        self.start_logs(ctx, &server_name);

        self.run(ctx, &server_name).await.map_err(|e| {
            tracing::warn!(
                run = %ctx.run_id,
                step = %self.step.kind(),
                server = %server_name,
                error = %e,
                "vSphere build step aborted"
            );
            AbortError::from(e)
        })
    }

    async fn run(&mut self, ctx: &ExecutionContext, server_name: &str) -> Result<(), StepError> {
        let endpoint = self.resolve(server_name)?;
        if ctx.is_cancelled() {
            return Err(StepError::Cancelled);
        }

        // connect 不可中途取消：已建立的会话必须交给守卫释放
        let conn = self
            .connector
            .connect(&endpoint)
            .await
            .map_err(StepError::Connection)?;
        let guard = ConnectionGuard::new(conn);
        if ctx.is_cancelled() {
            guard.release().await;
            return Err(StepError::Cancelled);
        }
        tracing::info!(
            run = %ctx.run_id,
            endpoint = %endpoint.name,
            session = %guard.connection().session_id(),
            "connected to vSphere"
        );

        self.step.set_connection(guard.connection());
        let outcome = match AssertUnwindSafe(self.step.perform(ctx)).catch_unwind().await {
            Ok(result) => result.map_err(StepError::DelegatedAction),
            Err(payload) => Err(StepError::DelegatedAction(panic_message(payload.as_ref()))),
        };

        guard.release().await;
        outcome
    }

    /// 有 hash 按 hash 查找（容忍改名）；否则按展开后的名称查找
    fn resolve(&self, server_name: &str) -> Result<EndpointConfig, StepError> {
        let found = match self.server_hash {
            Some(hash) => self.registry.lookup_by_hash(hash),
            None => self.registry.lookup_by_name(server_name),
        };
        let endpoint = found.map_err(StepError::Resolution)?;
        tracing::debug!(
            endpoint = %endpoint.name,
            hash = endpoint.hash(),
            by_hash = self.server_hash.is_some(),
            "resolved vSphere cloud"
        );
        Ok(endpoint)
    }

    fn start_logs(&self, ctx: &ExecutionContext, server_name: &str) {
        ctx.log("");
        ctx.log(&format!(
            "Performing vSphere build step: \"{}\"",
            self.step.display_name()
        ));
        ctx.log(&format!("Using vSphere server configuration: {server_name}"));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "build step panicked".to_string()
    }
}
