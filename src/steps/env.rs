//! 构建环境变量与 `${VAR}` / `$VAR` 展开

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

static VAR_RE: OnceLock<Regex> = OnceLock::new();

fn var_re() -> &'static Regex {
    VAR_RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
    })
}

/// 环境变量表；后写入的同名变量覆盖先前的值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取当前进程环境
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// 用 overrides 覆盖同名变量（多配置构建的轴变量优先于环境）
    pub fn override_all(&mut self, overrides: &HashMap<String, String>) {
        for (k, v) in overrides {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    /// 展开 `${VAR}` 与 `$VAR`；未定义的变量原样保留
    pub fn expand(&self, input: &str) -> String {
        var_re()
            .replace_all(input, |caps: &Captures| {
                let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
                match self.vars.get(name) {
                    Some(v) => v.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
