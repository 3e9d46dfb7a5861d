// Configuration loader
// Loads ~/.kali-mcp/config.toml, then applies environment overrides

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kali-mcp/config.toml"))
}

/// Load configuration from the default file (if any) and the environment
pub fn load_config() -> Result<Config> {
    let mut config = match default_config_path() {
        Some(path) if path.exists() => load_from_path(&path)?,
        _ => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration from an explicit file, then the environment
pub fn load_config_from(path: &Path) -> Result<Config> {
    let mut config = load_from_path(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Apply `API_PORT`, `MCP_PORT`, `KALI_API_BASE_URL`, `DEBUG_MODE` and
/// `OLLAMA_HOST` on top of the file configuration.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("API_PORT").and_then(|v| v.parse::<u16>().ok()) {
        config.api.port = port;
        config.gateway.api_base_url = format!("http://localhost:{}", port);
    }

    if let Some(port) = lookup("MCP_PORT").and_then(|v| v.parse::<u16>().ok()) {
        config.gateway.port = port;
        config.chat.gateway_url = format!("http://localhost:{}", port);
    }

    // An explicit base URL wins over the one derived from API_PORT
    if let Some(url) = lookup("KALI_API_BASE_URL").filter(|v| !v.is_empty()) {
        config.gateway.api_base_url = url;
    }

    if let Some(flag) = lookup("DEBUG_MODE") {
        config.debug.enabled = parse_flag(&flag);
    }

    if let Some(host) = lookup("OLLAMA_HOST").filter(|v| !v.is_empty()) {
        config.chat.ollama_url = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("http://{}", host)
        };
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 5000);
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.api_base_url, "http://localhost:5000");
        assert_eq!(config.executor.timeout_secs, 300);
        assert!(!config.executor.strict_uncovered_fields);
        assert_eq!(config.debug.history_capacity, 100);
        assert_eq!(config.chat.model, "llama3");
    }

    #[test]
    fn test_api_port_derives_base_url() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("API_PORT", "5500")]));
        assert_eq!(config.api.port, 5500);
        assert_eq!(config.gateway.api_base_url, "http://localhost:5500");
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[("API_PORT", "5500"), ("KALI_API_BASE_URL", "http://kali:5000")]),
        );
        assert_eq!(config.api.port, 5500);
        assert_eq!(config.gateway.api_base_url, "http://kali:5000");
    }

    #[test]
    fn test_debug_mode_flag_values() {
        for (value, expected) in [("1", true), ("TRUE", true), ("y", true), ("0", false), ("no", false)] {
            let mut config = Config::default();
            apply_env_overrides(&mut config, env(&[("DEBUG_MODE", value)]));
            assert_eq!(config.debug.enabled, expected, "{}", value);
        }
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("MCP_PORT", "eighty")]));
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn test_ollama_host_gets_scheme() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("OLLAMA_HOST", "127.0.0.1:11434")]));
        assert_eq!(config.chat.ollama_url, "http://127.0.0.1:11434");
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[executor]\ntimeout_secs = 60\nstrict_uncovered_fields = true\n\n[gateway]\nport = 9090"
        )
        .unwrap();

        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.executor.timeout_secs, 60);
        assert!(config.executor.strict_uncovered_fields);
        assert_eq!(config.executor.shell, PathBuf::from("/bin/sh"));
        assert_eq!(config.gateway.port, 9090);
        assert_eq!(config.api.port, 5000);
    }

    #[test]
    fn test_bad_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nport = \"not a port\"").unwrap();
        let err = load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
