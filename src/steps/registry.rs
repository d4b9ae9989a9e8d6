//! 构建步骤注册表
//!
//! 所有内部步骤实现 BuildStep trait（kind / display_name / set_connection / perform），
//! BuildStepRegistry 按类型名保存工厂，供 CLI 与持久化记录按 (kind, args) 重建步骤。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::connection::Connection;
use crate::steps::ExecutionContext;

/// 容器委托执行的内部步骤
#[async_trait]
pub trait BuildStep: Send + Sync {
    /// 类型名（注册表键，持久化记录中的 kind）
    fn kind(&self) -> &str;

    /// 控制台中显示的步骤名
    fn display_name(&self) -> &str;

    /// 持久化用参数；与 kind 一起可由注册表重建该步骤
    fn args(&self) -> Value {
        Value::Object(Default::default())
    }

    /// 执行前由容器注入本次连接
    fn set_connection(&mut self, conn: Arc<dyn Connection>);

    async fn perform(&mut self, ctx: &ExecutionContext) -> Result<(), String>;
}

type StepFactory = Arc<dyn Fn(Value) -> Result<Box<dyn BuildStep>, String> + Send + Sync>;

struct StepDescriptor {
    description: String,
    factory: StepFactory,
}

#[derive(Default)]
pub struct BuildStepRegistry {
    steps: HashMap<String, StepDescriptor>,
}

impl BuildStepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 带内置步骤（echo）
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            crate::steps::echo::KIND,
            "Echo a message through the vSphere connection (for testing)",
            |args| Ok(Box::new(crate::steps::EchoStep::from_args(&args)?) as Box<dyn BuildStep>),
        );
        registry
    }

    pub fn register<F>(&mut self, kind: &str, description: &str, factory: F)
    where
        F: Fn(Value) -> Result<Box<dyn BuildStep>, String> + Send + Sync + 'static,
    {
        self.steps.insert(
            kind.to_string(),
            StepDescriptor {
                description: description.to_string(),
                factory: Arc::new(factory),
            },
        );
    }

    pub fn create(&self, kind: &str, args: Value) -> Result<Box<dyn BuildStep>, String> {
        let desc = self
            .steps
            .get(kind)
            .ok_or_else(|| format!("Unknown build step: {kind}"))?;
        (desc.factory)(args)
    }

    /// 已注册类型名（排序）
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.steps.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// 返回 (kind, description) 列表
    pub fn descriptions(&self) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = self
            .steps
            .iter()
            .map(|(kind, d)| (kind.clone(), d.description.clone()))
            .collect();
        list.sort();
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_echo() {
        let registry = BuildStepRegistry::with_builtin();
        assert_eq!(registry.kinds(), vec!["echo".to_string()]);
        let step = registry
            .create("echo", serde_json::json!({"text": "hi"}))
            .unwrap();
        assert_eq!(step.kind(), "echo");
        assert_eq!(step.args()["text"], "hi");
    }

    #[test]
    fn test_unknown_kind() {
        let registry = BuildStepRegistry::with_builtin();
        let err = registry.create("clone", Value::Null).err().unwrap();
        assert_eq!(err, "Unknown build step: clone");
    }
}
