use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Environment variable name for the server URL override
const ENV_SERVER_URL: &str = "LIBRENMS_URL";

/// Environment variable name for the API token override
const ENV_API_TOKEN: &str = "LIBRENMS_TOKEN";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerSection {
    /// Server address or full API URL (e.g., "librenms.example.com" or
    /// "https://librenms.example.com/api/v0")
    url: Option<String>,
    /// API token generated under Settings > API > API Access
    api_token: Option<String>,
}

/// Runtime server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL for API calls, normalized to include scheme and /api/v0
    pub api_url: String,
    /// Token sent in the X-Auth-Token header on every request
    pub api_token: String,
    /// Source of the configuration (for logging)
    pub source: ConfigSource,
}

/// Where the configuration came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigSource {
    /// Loaded from environment variables
    Environment,
    /// Loaded from config file
    ConfigFile,
    /// URL and token came from different sources
    Mixed,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Environment => write!(f, "environment variables"),
            ConfigSource::ConfigFile => write!(f, "config file"),
            ConfigSource::Mixed => write!(f, "environment variables + config file"),
        }
    }
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("bulkadd").join("config.toml"))
}

/// Load configuration from the config file
fn load_config_file() -> Option<ConfigFile> {
    let path = get_config_file_path()?;

    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

/// Normalize a configured server address into a full API base URL.
///
/// Accepts a bare host/IP, a host with scheme, or a full API URL, and
/// produces e.g. "http://192.0.2.10/api/v0" with no trailing slash.
fn normalize_api_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    let with_scheme = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    };
    if with_scheme.contains("/api/") {
        with_scheme
    } else {
        format!("{}/api/v0", with_scheme)
    }
}

/// Load server configuration with priority:
/// 1. Environment variables (LIBRENMS_URL, LIBRENMS_TOKEN)
/// 2. Config file (~/.config/bulkadd/config.toml)
///
/// There is no default server; a missing URL or token is an error.
pub fn load_server_config() -> Result<ServerConfig> {
    let file = load_config_file();
    let section = file.and_then(|f| f.server).unwrap_or_default();

    let env_url = std::env::var(ENV_SERVER_URL)
        .ok()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let env_token = std::env::var(ENV_API_TOKEN)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let url_from_env = env_url.is_some();
    let token_from_env = env_token.is_some();

    let url = env_url
        .or_else(|| section.url.clone().filter(|u| !u.trim().is_empty()))
        .with_context(|| {
            format!(
                "No LibreNMS server configured; set {} or add [server] url to {}",
                ENV_SERVER_URL,
                get_config_file_path_string()
            )
        })?;

    let api_token = env_token
        .or_else(|| section.api_token.clone().filter(|t| !t.trim().is_empty()))
        .with_context(|| {
            format!(
                "No API token configured; set {} or add [server] api_token to {}",
                ENV_API_TOKEN,
                get_config_file_path_string()
            )
        })?;

    let source = match (url_from_env, token_from_env) {
        (true, true) => ConfigSource::Environment,
        (false, false) => ConfigSource::ConfigFile,
        _ => ConfigSource::Mixed,
    };

    let api_url = normalize_api_url(&url);
    tracing::debug!("Using LibreNMS API at {} (from {})", api_url, source);

    Ok(ServerConfig {
        api_url,
        api_token,
        source,
    })
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/bulkadd/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Bulkadd Configuration
# Place this file at: ~/.config/bulkadd/config.toml

[server]
# LibreNMS server address or full API URL
# url = "librenms.example.com"

# API token, generated in LibreNMS under Settings > API > API Access
# api_token = "0123456789abcdef0123456789abcdef"
"#
    .to_string()
}
