use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_session_file() -> String {
    "./session.toml".to_string()
}

fn default_listen_port() -> u16 {
    5173
}

fn default_prefixes() -> Vec<String> {
    ["/config", "/task", "/refresh", "/results", "/weibo", "/static"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PanelConfig {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_session_file")]
    pub session_file: String,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Dev-time forwarding of path prefixes to the backend origin.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProxyConfig {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            session_file: default_session_file(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            prefixes: default_prefixes(),
        }
    }
}

impl PanelConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ProxyConfig {
    pub fn forwards(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Reads the panel configuration. A missing file yields the defaults.
pub fn load_panel_config(path: &str) -> Result<PanelConfig, Box<dyn std::error::Error>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(PanelConfig::default()),
        Err(err) => return Err(err.into()),
    };
    let config: PanelConfig = toml::from_str(&text)?;
    Ok(config)
}

pub fn save_panel_config(path: &str, config: &PanelConfig) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(config)?;
    fs::write(path, toml_str)?;
    Ok(())
}
