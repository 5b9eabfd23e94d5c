use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_server_version")]
    pub version: String,
}

fn default_server_name() -> String {
    "finmcp".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSourceConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    /// The quote hosts reject default client identification.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_referer")]
    pub referer: String,
}

fn default_http_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_referer() -> String {
    "https://finance.sina.com.cn".to_string()
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
            referer: default_referer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonSourceConfig {
    /// Interpreter binary. Looked up on PATH when unset.
    #[serde(default)]
    pub interpreter: Option<String>,
    #[serde(default = "default_python_module")]
    pub module: String,
    #[serde(default = "default_python_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_python_module() -> String {
    "akshare".to_string()
}

fn default_python_timeout() -> u64 {
    30
}

fn default_max_records() -> usize {
    1000
}

impl Default for PythonSourceConfig {
    fn default() -> Self {
        Self {
            interpreter: None,
            module: default_python_module(),
            timeout_secs: default_python_timeout(),
            max_records: default_max_records(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackConfig {
    /// Retry list tools once against the library source.
    #[serde(default = "default_true")]
    pub secondary: bool,
    /// Substitute randomized, schema-stable data when live sources fail.
    #[serde(default = "default_true")]
    pub synthetic: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            secondary: true,
            synthetic: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpSourceConfig,
    #[serde(default)]
    pub python: PythonSourceConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(Error::Config("http.timeoutSecs must be greater than 0".into()));
        }
        if self.python.timeout_secs == 0 {
            return Err(Error::Config("python.timeoutSecs must be greater than 0".into()));
        }
        if self.python.max_records == 0 {
            return Err(Error::Config("python.maxRecords must be greater than 0".into()));
        }
        if self.python.module.trim().is_empty() {
            return Err(Error::Config("python.module must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.http.timeout_secs, 15);
        assert_eq!(cfg.python.timeout_secs, 30);
        assert_eq!(cfg.python.max_records, 1000);
        assert_eq!(cfg.python.module, "akshare");
        assert!(cfg.fallback.secondary);
        assert!(cfg.fallback.synthetic);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{ "python": { "interpreter": "/usr/bin/python3" }, "fallback": { "synthetic": false } }"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.python.interpreter.as_deref(), Some("/usr/bin/python3"));
        assert_eq!(cfg.python.timeout_secs, 30);
        assert!(!cfg.fallback.synthetic);
        assert!(cfg.fallback.secondary);
        assert_eq!(cfg.server.name, "finmcp");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut cfg = Config::default();
        cfg.http.timeout_secs = 5;
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.http.timeout_secs, 5);
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "python": { "timeoutSecs": 0 } }"#).unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_base(dir.path().to_path_buf());
        let cfg = Config::load_or_default(&paths).unwrap();
        assert_eq!(cfg.http.timeout_secs, 15);
    }
}
