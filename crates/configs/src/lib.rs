use std::fmt;
use std::path::Path;

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.jsonbin.io/v3";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8081, worker_threads: Some(4) }
    }
}

/// Remote JSON bin service plus the local cache that mirrors it.
#[derive(Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Shared secret sent with every remote call. No default on purpose.
    #[serde(default)]
    pub master_key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cache_path")]
    pub cache_path: String,
    #[serde(default)]
    pub bins: BinsConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BinsConfig {
    #[serde(default)]
    pub products: Option<String>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub customers: Option<String>,
}

fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_request_timeout() -> u64 { 15 }
fn default_cache_path() -> String { "data/local_cache.json".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            master_key: String::new(),
            request_timeout_secs: default_request_timeout(),
            cache_path: default_cache_path(),
            bins: BinsConfig::default(),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("base_url", &self.base_url)
            .field("master_key", &if self.master_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cache_path", &self.cache_path)
            .field("bins", &self.bins)
            .finish()
    }
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    from_toml_str(&content)
}

pub fn from_toml_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

/// Read `CONFIG_PATH` (or `config.toml`) when present, defaults otherwise.
pub fn load_or_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_from_file(&path)
    } else {
        Ok(AppConfig::default())
    }
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_or_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env();
        self.server.normalize()?;
        self.storage.normalize_from_env();
        self.storage.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize_from_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() {
                self.host = host;
            }
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(w) = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()) {
            self.worker_threads = Some(w);
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

fn fill_from_env(slot: &mut String, var: &str) {
    if slot.trim().is_empty() {
        if let Ok(v) = std::env::var(var) {
            *slot = v;
        }
    }
}

fn fill_opt_from_env(slot: &mut Option<String>, var: &str) {
    let missing = slot.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true);
    if missing {
        *slot = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
    }
}

impl StorageConfig {
    /// Values absent from the TOML file are taken from the environment.
    pub fn normalize_from_env(&mut self) {
        fill_from_env(&mut self.master_key, "JSONBIN_MASTER_KEY");
        if let Ok(url) = std::env::var("JSONBIN_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        fill_opt_from_env(&mut self.bins.products, "JSONBIN_PRODUCTS_BIN_ID");
        fill_opt_from_env(&mut self.bins.categories, "JSONBIN_CATEGORIES_BIN_ID");
        fill_opt_from_env(&mut self.bins.customers, "JSONBIN_CUSTOMERS_BIN_ID");
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.master_key.trim().is_empty() {
            return Err(anyhow!(
                "storage.master_key is empty; set it in config.toml or JSONBIN_MASTER_KEY"
            ));
        }
        let lower = self.base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("storage.base_url must start with http:// or https://"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("storage.request_timeout_secs must be a positive number of seconds"));
        }
        if self.cache_path.trim().is_empty() {
            return Err(anyhow!("storage.cache_path is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [storage]
        master_key = "secret"
        cache_path = "tmp/cache.json"

        [storage.bins]
        products = "bin-p"
        categories = "bin-c"
    "#;

    #[test]
    fn parses_toml_with_defaults() {
        let cfg = from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.storage.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.storage.request_timeout_secs, 15);
        assert_eq!(cfg.storage.bins.products.as_deref(), Some("bin-p"));
        assert!(cfg.storage.bins.customers.is_none());
        assert!(cfg.storage.validate().is_ok());
    }

    #[test]
    fn missing_master_key_is_rejected() {
        let cfg = StorageConfig::default();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("master_key"));
    }

    #[test]
    fn base_url_must_be_http() {
        let cfg = StorageConfig {
            master_key: "k".into(),
            base_url: "ftp://example".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_master_key() {
        let cfg = StorageConfig { master_key: "super-secret".into(), ..Default::default() };
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
