//! Echo 步骤（测试 / 演示用）：通过已注入的连接回显一行文本

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::connection::Connection;
use crate::steps::{BuildStep, ExecutionContext};

pub const KIND: &str = "echo";

pub struct EchoStep {
    text: String,
    conn: Option<Arc<dyn Connection>>,
}

impl EchoStep {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            conn: None,
        }
    }

    /// args: {"text": "message"}
    pub fn from_args(args: &Value) -> Result<Self, String> {
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or("echo step requires a \"text\" argument")?;
        Ok(Self::new(text))
    }
}

#[async_trait]
impl BuildStep for EchoStep {
    fn kind(&self) -> &str {
        KIND
    }

    fn display_name(&self) -> &str {
        "Echo"
    }

    fn args(&self) -> Value {
        serde_json::json!({ "text": self.text })
    }

    fn set_connection(&mut self, conn: Arc<dyn Connection>) {
        self.conn = Some(conn);
    }

    async fn perform(&mut self, ctx: &ExecutionContext) -> Result<(), String> {
        let conn = self.conn.as_ref().ok_or("vSphere connection not set")?;
        if ctx.is_cancelled() {
            return Err("Build step interrupted".to_string());
        }
        let text = ctx.effective_env().expand(&self.text);
        ctx.log(&format!("{} (via {})", text, conn.endpoint().name));
        Ok(())
    }
}
