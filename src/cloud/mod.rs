//! vSphere 云端点：配置、稳定 hash、注册表与可选服务器列表

pub mod endpoint;
pub mod registry;

pub use endpoint::EndpointConfig;
pub use registry::{EndpointRegistry, InMemoryRegistry};

use crate::steps::SELECTABLE_SERVER_NAME;

/// 可选服务器名：所有已注册端点名 + 「从环境变量选择」哨兵；没有端点时为空列表。
/// 注册表不可读时只记录警告并返回空列表，不让上层失败。
pub fn selectable_server_names(registry: &dyn EndpointRegistry) -> Vec<String> {
    match registry.names() {
        Ok(mut names) => {
            if !names.is_empty() {
                names.push(SELECTABLE_SERVER_NAME.to_string());
            }
            names
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to list vSphere clouds");
            Vec::new()
        }
    }
}
