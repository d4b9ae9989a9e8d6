//! 构建步骤容器的持久化记录（JSON）
//!
//! 记录以 "type" 字段标记类型；旧版本写出的全限定类型名作为别名仍可读取。
//! 恢复时沿用保存的 server_hash，不按名称重新解析。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cloud::EndpointRegistry;
use crate::connection::Connector;
use crate::core::StepError;
use crate::steps::{BuildStepContainer, BuildStepRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StepRecord {
    #[serde(
        rename = "vsphere.BuildStepContainer",
        alias = "org.jenkinsci.plugins.vsphere.VSphereBuildStepContainer",
        alias = "org.jenkinsci.plugins.vsphere.builders.VSphereBuildStepContainer"
    )]
    Container(ContainerRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub server_name: String,
    #[serde(default)]
    pub server_hash: Option<i32>,
    pub build_step: StepConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub kind: String,
    #[serde(default)]
    pub args: Value,
}

impl StepRecord {
    pub fn from_container(container: &BuildStepContainer) -> Self {
        let step = container.build_step();
        StepRecord::Container(ContainerRecord {
            server_name: container.server_name().to_string(),
            server_hash: container.server_hash(),
            build_step: StepConfig {
                kind: step.kind().to_string(),
                args: step.args(),
            },
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// 通过步骤注册表重建内部步骤并恢复容器
    pub fn restore(
        self,
        steps: &BuildStepRegistry,
        registry: Arc<dyn EndpointRegistry>,
        connector: Arc<dyn Connector>,
    ) -> Result<BuildStepContainer, StepError> {
        match self {
            StepRecord::Container(rec) => {
                let step = steps
                    .create(&rec.build_step.kind, rec.build_step.args)
                    .map_err(StepError::Configuration)?;
                Ok(BuildStepContainer::restore(
                    step,
                    &rec.server_name,
                    rec.server_hash,
                    registry,
                    connector,
                ))
            }
        }
    }
}
