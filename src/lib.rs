//! vsphere-step - vSphere 构建步骤容器
//!
//! 模块划分：
//! - **cloud**: 端点配置、稳定 hash、注册表（按名称 / hash 查找）与可选服务器列表
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **connection**: 连接工厂与会话（REST / Mock）、恰好释放一次的连接守卫
//! - **core**: 错误类型
//! - **observability**: tracing 初始化
//! - **steps**: 构建步骤 trait 与注册表、执行上下文、容器（解析 → 连接 → 委托 → 断开）、持久化记录

pub mod cloud;
pub mod config;
pub mod connection;
pub mod core;
pub mod observability;
pub mod steps;

pub use cloud::{selectable_server_names, EndpointConfig, EndpointRegistry, InMemoryRegistry};
pub use core::{AbortError, RegistryError, StepError};
pub use steps::{BuildStep, BuildStepContainer, ExecutionContext, SELECTABLE_SERVER_NAME};
