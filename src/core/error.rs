//! 构建步骤错误类型
//!
//! 注册表查找错误（RegistryError）、执行过程中的分类错误（StepError），
//! 以及对调用方统一暴露的中止错误（AbortError，仅携带原始消息）。

use thiserror::Error;

/// 端点注册表查找失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No vSphere cloud found with name: {0}")]
    NotFoundByName(String),

    #[error("No vSphere cloud found with hash: {0}")]
    NotFoundByHash(i32),

    /// 两个不同端点派生出相同 hash（同一 vCenter + 用户 + 数据中心）
    #[error("vSphere clouds '{existing}' and '{new}' share hash {hash}")]
    DuplicateHash {
        hash: i32,
        existing: String,
        new: String,
    },

    /// 注册表内有多个端点匹配同一 hash
    #[error("Multiple vSphere clouds found with hash: {0}")]
    AmbiguousHash(i32),

    /// 注册表本身不可读（锁中毒、后端不可达等）
    #[error("vSphere cloud registry unavailable: {0}")]
    Unavailable(String),
}

/// 构建步骤生命周期中的错误；对调用方统一折叠为 AbortError
#[derive(Error, Debug)]
pub enum StepError {
    /// 构造时引用的端点名称未注册、步骤类型未知等配置问题
    #[error("{0}")]
    Configuration(String),

    /// 执行时按 hash / 名称查找失败（端点被删除或改名）
    #[error("{0}")]
    Resolution(RegistryError),

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    DelegatedAction(String),

    #[error("Build step interrupted")]
    Cancelled,
}

/// 使本次构建中止的错误：只保留原始错误的消息
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AbortError(pub String);

impl AbortError {
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<StepError> for AbortError {
    fn from(err: StepError) -> Self {
        AbortError(err.to_string())
    }
}
