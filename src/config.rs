use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use figment::{
    providers::{Format, Toml},
    Figment,
};

const DEFAULT_CONFIG: &str = r#"
[web]
base_url = "/"

[github]
verify_signature = false
secret = ""

[trigger_api]
base_url = "https://app.bitrise.io"
timeout_secs = 30
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    pub verify_signature: bool,

    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub base_url: String,

    pub bind: Vec<String>,

    // Upper bound for webhook and proxied request bodies, in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

// GitHub caps webhook payloads at 25 MB
pub const DEFAULT_MAX_BODY_SIZE: usize = 25 * 1024 * 1024;

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct TriggerApiConfig {
    pub base_url: Url,

    // Debugging aid: send every trigger request here instead
    #[serde(default)]
    pub send_request_to: Option<Url>,

    pub timeout_secs: u64,
}

/// A request forwarding route, see [`crate::proxy::SameHostProxy`].
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyRoute {
    pub path: String,

    pub target: Url,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,

    pub github: GithubConfig,

    pub trigger_api: TriggerApiConfig,

    #[serde(default)]
    pub proxy: Vec<ProxyRoute>,
}

pub fn read(path: &str) -> Result<Config> {
    load(Figment::new().merge(Toml::file(path))).context(format!("Error loading config from {path}"))
}

fn load(user_config: Figment) -> Result<Config> {
    let config: Config = Figment::new()
        .merge(Toml::string(DEFAULT_CONFIG))
        .merge(user_config)
        .extract()?;

    if config.web.bind.is_empty() {
        return Err(anyhow::anyhow!("Must include at least one bind interface"));
    }

    if config.github.verify_signature && config.github.secret.is_empty() {
        return Err(anyhow::anyhow!(
            "github.secret must be set when github.verify_signature is enabled"
        ));
    }

    Ok(config)
}
