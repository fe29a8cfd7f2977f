use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VmwatchError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub scale_set: String,
    pub http_addr: String,
    pub arm_endpoint: String,
    pub login_endpoint: String,
    pub request_timeout: Duration,
    pub max_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            subscription_id: String::new(),
            resource_group: String::new(),
            scale_set: String::new(),
            http_addr: "127.0.0.1:7070".to_string(),
            arm_endpoint: "https://management.azure.com".to_string(),
            login_endpoint: "https://login.microsoftonline.com".to_string(),
            request_timeout: Duration::from_secs(10),
            max_pages: 32,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("AZURE_TENANT_ID", &self.tenant_id),
            ("AZURE_CLIENT_ID", &self.client_id),
            ("AZURE_CLIENT_SECRET", &self.client_secret),
            ("AZURE_SUBSCRIPTION_ID", &self.subscription_id),
            ("AZURE_RESOURCE_GROUP", &self.resource_group),
            ("AZURE_VMSS_NAME", &self.scale_set),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(VmwatchError::Config(format!("{name} must be set")));
            }
        }
        if self.max_pages == 0 {
            return Err(VmwatchError::Config("max_pages must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    subscription_id: Option<String>,
    resource_group: Option<String>,
    scale_set: Option<String>,
    http_addr: Option<String>,
    arm_endpoint: Option<String>,
    login_endpoint: Option<String>,
    request_timeout: Option<String>,
    max_pages: Option<usize>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("VMWATCH_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("vmwatch/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| VmwatchError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| VmwatchError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let max_pages = match env::var("VMWATCH_MAX_PAGES") {
        Ok(v) => Some(v.parse::<usize>().map_err(|e| {
            VmwatchError::Config(format!("bad VMWATCH_MAX_PAGES in environment: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        tenant_id: env::var("AZURE_TENANT_ID").ok(),
        client_id: env::var("AZURE_CLIENT_ID").ok(),
        client_secret: env::var("AZURE_CLIENT_SECRET").ok(),
        subscription_id: env::var("AZURE_SUBSCRIPTION_ID").ok(),
        resource_group: env::var("AZURE_RESOURCE_GROUP").ok(),
        scale_set: env::var("AZURE_VMSS_NAME").ok(),
        http_addr: env::var("VMWATCH_HTTP_ADDR").ok(),
        arm_endpoint: env::var("VMWATCH_ARM_ENDPOINT").ok(),
        login_endpoint: env::var("VMWATCH_LOGIN_ENDPOINT").ok(),
        request_timeout: env::var("VMWATCH_REQUEST_TIMEOUT").ok(),
        max_pages,
    })
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.tenant_id {
        cfg.tenant_id = v;
    }
    if let Some(v) = overrides.client_id {
        cfg.client_id = v;
    }
    if let Some(v) = overrides.client_secret {
        cfg.client_secret = v;
    }
    if let Some(v) = overrides.subscription_id {
        cfg.subscription_id = v;
    }
    if let Some(v) = overrides.resource_group {
        cfg.resource_group = v;
    }
    if let Some(v) = overrides.scale_set {
        cfg.scale_set = v;
    }
    if let Some(v) = overrides.http_addr {
        cfg.http_addr = v;
    }
    if let Some(v) = overrides.arm_endpoint {
        cfg.arm_endpoint = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = overrides.login_endpoint {
        cfg.login_endpoint = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = overrides.request_timeout {
        cfg.request_timeout = humantime::parse_duration(&v).map_err(|e| {
            VmwatchError::Config(format!("bad request_timeout in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.max_pages {
        cfg.max_pages = v;
    }
    Ok(())
}
