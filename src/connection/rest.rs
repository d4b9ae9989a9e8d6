//! vSphere Automation REST 会话
//!
//! connect: POST {host}/rest/com/vmware/cis/session（Basic Auth），响应 {"value": "<session id>"}；
//! disconnect: DELETE 同一路径，带 vmware-api-session-id 头。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cloud::EndpointConfig;
use crate::connection::{Connection, Connector};

const SESSION_PATH: &str = "/rest/com/vmware/cis/session";
const SESSION_HEADER: &str = "vmware-api-session-id";

#[derive(Debug, Deserialize)]
struct SessionResponse {
    value: String,
}

/// 通过 REST API 建立会话的连接器；request_timeout 作用于每个请求
pub struct RestConnector {
    request_timeout: Duration,
}

impl RestConnector {
    pub fn new(request_timeout_secs: u64) -> Self {
        Self {
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }
}

fn session_url(endpoint: &EndpointConfig) -> String {
    format!("{}{}", endpoint.host.trim_end_matches('/'), SESSION_PATH)
}

#[async_trait]
impl Connector for RestConnector {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Connection>, String> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .danger_accept_invalid_certs(endpoint.ignore_cert)
            .build()
            .map_err(|e| e.to_string())?;

        let url = session_url(endpoint);
        let resp = client
            .post(&url)
            .basic_auth(&endpoint.username, Some(&endpoint.password))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("{} returned {}", endpoint.host, status));
        }
        let session: SessionResponse = resp.json().await.map_err(|e| e.to_string())?;

        tracing::info!(endpoint = %endpoint.name, host = %endpoint.host, "vSphere session opened");
        Ok(Arc::new(RestConnection {
            client,
            url,
            endpoint: endpoint.clone(),
            session_id: session.value,
            closed: AtomicBool::new(false),
        }))
    }
}

struct RestConnection {
    client: reqwest::Client,
    url: String,
    endpoint: EndpointConfig,
    session_id: String,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for RestConnection {
    fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let result = self
            .client
            .delete(&self.url)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(endpoint = %self.endpoint.name, "vSphere session closed");
            }
            Ok(resp) => {
                tracing::warn!(endpoint = %self.endpoint.name, status = %resp.status(), "vSphere logout rejected");
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint.name, error = %e, "vSphere logout failed");
            }
        }
    }
}
