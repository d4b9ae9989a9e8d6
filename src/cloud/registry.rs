//! 端点注册表
//!
//! 构建步骤通过注入的 EndpointRegistry 句柄按名称或稳定 hash 查找端点，
//! 不依赖进程级单例。InMemoryRegistry 由配置文件中的 [[clouds]] 构建，可在运行期改名 / 删除 / 整体替换。
//! 注册表内 hash 唯一：派生出相同 hash 的两个端点无法同时注册。

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cloud::EndpointConfig;
use crate::core::RegistryError;

/// 只读查找接口；实现必须可被多个并发执行同时调用
pub trait EndpointRegistry: Send + Sync {
    fn lookup_by_name(&self, name: &str) -> Result<EndpointConfig, RegistryError>;

    fn lookup_by_hash(&self, hash: i32) -> Result<EndpointConfig, RegistryError>;

    /// 按注册顺序返回所有端点显示名
    fn names(&self) -> Result<Vec<String>, RegistryError>;
}

/// 内存注册表：保持注册顺序，读多写少
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    endpoints: RwLock<Vec<EndpointConfig>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_endpoints(
        endpoints: impl IntoIterator<Item = EndpointConfig>,
    ) -> Result<Self, RegistryError> {
        let endpoints: Vec<EndpointConfig> = endpoints.into_iter().collect();
        check_unique_hashes(&endpoints)?;
        Ok(Self {
            endpoints: RwLock::new(endpoints),
        })
    }

    /// 注册端点；同名端点被替换，与其他端点 hash 冲突时拒绝
    pub fn register(&self, endpoint: EndpointConfig) -> Result<(), RegistryError> {
        let mut endpoints = self.write()?;
        let hash = endpoint.hash();
        if let Some(other) = endpoints
            .iter()
            .find(|e| e.name != endpoint.name && e.hash() == hash)
        {
            return Err(RegistryError::DuplicateHash {
                hash,
                existing: other.name.clone(),
                new: endpoint.name,
            });
        }
        match endpoints.iter_mut().find(|e| e.name == endpoint.name) {
            Some(existing) => *existing = endpoint,
            None => endpoints.push(endpoint),
        }
        Ok(())
    }

    /// 删除端点，返回被删除的配置
    pub fn remove(&self, name: &str) -> Result<EndpointConfig, RegistryError> {
        let mut endpoints = self.write()?;
        let idx = endpoints
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| RegistryError::NotFoundByName(name.to_string()))?;
        Ok(endpoints.remove(idx))
    }

    /// 仅修改显示名，hash 不变
    pub fn rename(&self, old: &str, new: &str) -> Result<(), RegistryError> {
        let mut endpoints = self.write()?;
        let endpoint = endpoints
            .iter_mut()
            .find(|e| e.name == old)
            .ok_or_else(|| RegistryError::NotFoundByName(old.to_string()))?;
        endpoint.name = new.to_string();
        Ok(())
    }

    /// 配置重载：整体替换端点列表
    pub fn replace_all(&self, endpoints: Vec<EndpointConfig>) -> Result<(), RegistryError> {
        check_unique_hashes(&endpoints)?;
        *self.write()? = endpoints;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<EndpointConfig>>, RegistryError> {
        self.endpoints
            .read()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<EndpointConfig>>, RegistryError> {
        self.endpoints
            .write()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))
    }
}

impl EndpointRegistry for InMemoryRegistry {
    fn lookup_by_name(&self, name: &str) -> Result<EndpointConfig, RegistryError> {
        self.read()?
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFoundByName(name.to_string()))
    }

    fn lookup_by_hash(&self, hash: i32) -> Result<EndpointConfig, RegistryError> {
        let endpoints = self.read()?;
        let mut matches = endpoints.iter().filter(|e| e.hash() == hash);
        match (matches.next(), matches.next()) {
            (Some(endpoint), None) => Ok(endpoint.clone()),
            (Some(_), Some(_)) => Err(RegistryError::AmbiguousHash(hash)),
            (None, _) => Err(RegistryError::NotFoundByHash(hash)),
        }
    }

    fn names(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.read()?.iter().map(|e| e.name.clone()).collect())
    }
}

fn check_unique_hashes(endpoints: &[EndpointConfig]) -> Result<(), RegistryError> {
    for (i, endpoint) in endpoints.iter().enumerate() {
        let hash = endpoint.hash();
        if let Some(other) = endpoints[..i].iter().find(|e| e.hash() == hash) {
            return Err(RegistryError::DuplicateHash {
                hash,
                existing: other.name.clone(),
                new: endpoint.name.clone(),
            });
        }
    }
    Ok(())
}
