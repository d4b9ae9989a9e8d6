//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 config/default.toml 与 --config 指定的文件，再用环境变量 `VSPHERE_STEP__*` 覆盖（双下划线表示嵌套，如 `VSPHERE_STEP__LOGGING__FILTER=debug`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::cloud::{EndpointConfig, InMemoryRegistry};
use crate::core::RegistryError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// [[clouds]]：已注册的 vSphere 端点
    pub clouds: Vec<EndpointConfig>,
    pub connection: ConnectionSection,
    pub logging: LoggingSection,
}

/// [connection] 段：REST 请求超时
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSection {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// [logging] 段：tracing EnvFilter 指令
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl AppConfig {
    /// 由 [[clouds]] 构建端点注册表；hash 冲突的端点被拒绝
    pub fn registry(&self) -> Result<InMemoryRegistry, RegistryError> {
        InMemoryRegistry::from_endpoints(self.clouds.iter().cloned())
    }
}

/// 加载配置并校验 [[clouds]]：两个端点 hash 相同时返回错误
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("VSPHERE_STEP")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.registry()
        .map_err(|e| config::ConfigError::Message(e.to_string()))?;
    Ok(cfg)
}
