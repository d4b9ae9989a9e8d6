//! vSphere 云端点配置
//!
//! name 是显示名（可改名）；hash() 由连接相关字段派生，改名后保持不变，
//! 构建步骤据此在执行时重新找到同一个端点。

use serde::{Deserialize, Serialize};

/// 一个已注册的 vSphere 端点：地址 + 凭据 + 显示名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// 显示名（UI 中的 vsDescription）
    pub name: String,
    /// vCenter 地址，如 https://vcenter.example.com
    pub host: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub datacenter: Option<String>,
    /// 跳过 TLS 证书校验（自签名 vCenter）
    #[serde(default)]
    pub ignore_cert: bool,
}

impl EndpointConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            username: username.into(),
            password: String::new(),
            datacenter: None,
            ignore_cert: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    /// 稳定身份 token：对 host / username / datacenter 做 FNV-1a，跨进程一致，不含显示名
    pub fn hash(&self) -> i32 {
        let mut h = Fnv1a::new();
        h.write(self.host.trim_end_matches('/').as_bytes());
        h.write(&[0]);
        h.write(self.username.as_bytes());
        h.write(&[0]);
        if let Some(dc) = &self.datacenter {
            h.write(dc.as_bytes());
        }
        h.finish() as i32
    }
}

struct Fnv1a(u32);

impl Fnv1a {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    fn new() -> Self {
        Self(Self::OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 ^= u32::from(*b);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn finish(&self) -> u32 {
        self.0
    }
}
