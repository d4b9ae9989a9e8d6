//! 执行上下文：环境变量、多配置构建变量、控制台输出、取消信号

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::steps::EnvVars;

/// 控制台输出前缀
pub const LOG_PREFIX: &str = "[vSphere] ";

/// 构建控制台输出
pub trait OutputSink: Send + Sync {
    fn line(&self, line: &str);
}

/// 写到标准输出
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn line(&self, line: &str) {
        println!("{line}");
    }
}

/// 收集到内存（测试用）
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl OutputSink for BufferSink {
    fn line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// 一次构建执行的上下文；同一个上下文原样传给内部步骤
#[derive(Clone)]
pub struct ExecutionContext {
    pub run_id: String,
    pub env: EnvVars,
    /// 多配置（matrix）构建的轴变量；普通构建为 None
    pub build_variables: Option<HashMap<String, String>>,
    pub sink: Arc<dyn OutputSink>,
    pub cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(env: EnvVars, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            env,
            build_variables: None,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_build_variables(mut self, vars: HashMap<String, String>) -> Self {
        self.build_variables = Some(vars);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 环境变量 + 构建变量（后者优先）
    pub fn effective_env(&self) -> EnvVars {
        let mut env = self.env.clone();
        if let Some(vars) = &self.build_variables {
            env.override_all(vars);
        }
        env
    }

    /// 带 [vSphere] 前缀写一行控制台输出
    pub fn log(&self, msg: &str) {
        self.sink.line(&format!("{LOG_PREFIX}{msg}"));
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
