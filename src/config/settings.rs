// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::tools::FieldPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub gateway: GatewayConfig,
    pub executor: ExecutorConfig,
    pub chat: ChatConfig,
    pub debug: DebugConfig,
}

/// Tool dispatch service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Tools probed with `which` by `/health`
    pub essential_tools: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            essential_tools: ["nmap", "gobuster", "dirb", "nikto"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// MCP gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Where the dispatch service lives
    pub api_base_url: String,
    pub health_timeout_secs: u64,
    pub forward_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_base_url: "http://localhost:5000".to_string(),
            health_timeout_secs: 5,
            forward_timeout_secs: 300,
        }
    }
}

impl GatewayConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub timeout_secs: u64,
    pub shell: PathBuf,
    /// Apply metacharacter checks to fields that have no allow-list
    /// (sqlmap data, wordlists, hydra credentials, metasploit options)
    pub strict_uncovered_fields: bool,
    /// Directory for metasploit resource scripts (default: system temp dir)
    pub script_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            shell: PathBuf::from("/bin/sh"),
            strict_uncovered_fields: false,
            script_dir: None,
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn field_policy(&self) -> FieldPolicy {
        if self.strict_uncovered_fields {
            FieldPolicy::Strict
        } else {
            FieldPolicy::Permissive
        }
    }
}

/// Conversational client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,
    pub ollama_url: String,
    pub gateway_url: String,
    /// Ask before running a tool the model suggested
    pub confirm_tools: bool,
    /// Transcript length kept for the model
    pub max_messages: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "llama3".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            gateway_url: "http://localhost:8080".to_string(),
            confirm_tools: true,
            max_messages: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    /// Request history entries kept per server
    pub history_capacity: usize,
    /// Debug log file, defaults to ~/.kali-mcp/debug.log
    pub log_file: Option<PathBuf>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            history_capacity: 100,
            log_file: None,
        }
    }
}

impl DebugConfig {
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".kali-mcp/debug.log")))
    }
}
