// User-friendly error messages
//
// Turns connection and config failures into messages that say what to try
// next. Labels follow the LANG environment variable where a translation
// exists.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;

fn get_locale() -> &'static str {
    match std::env::var("LANG") {
        Ok(lang) if lang.starts_with("es") => "es",
        Ok(lang) if lang.starts_with("fr") => "fr",
        Ok(lang) if lang.starts_with("de") => "de",
        _ => "en",
    }
}

/// Localized label
fn t(key: &str) -> &'static str {
    match (get_locale(), key) {
        ("es", "try") => "Intenta",
        ("es", "suggestion") => "Sugerencia",
        ("es", "possible_causes") => "Posibles causas",
        ("fr", "try") => "Essayez",
        ("fr", "possible_causes") => "Causes possibles",
        ("de", "try") => "Versuchen Sie",
        ("de", "suggestion") => "Vorschlag",
        ("de", "possible_causes") => "Mögliche Ursachen",
        (_, "try") => "Try",
        (_, "possible_causes") => "Possible causes",
        _ => "Suggestion",
    }
}

/// Wrap an error with user-friendly context
pub trait UserFriendlyError {
    fn user_context(self, message: &str) -> Self;

    fn user_context_with_suggestion(self, problem: &str, suggestion: &str) -> Self;
}

impl<T> UserFriendlyError for Result<T> {
    fn user_context(self, message: &str) -> Self {
        self.with_context(|| message.to_string())
    }

    fn user_context_with_suggestion(self, problem: &str, suggestion: &str) -> Self {
        self.with_context(|| {
            format!(
                "{}\n\n\x1b[1;33m{}:\x1b[0m {}",
                problem,
                t("suggestion"),
                suggestion
            )
        })
    }
}

/// The chat client could not reach the gateway
pub fn gateway_unreachable_error(url: &str) -> String {
    format!(
        "Could not connect to the MCP gateway at {}\n\n\
        \x1b[1;33m{}:\x1b[0m\n\
        • Gateway is not running\n\
        • Gateway is listening on a different port\n\
        • Dispatch server is down, so the gateway refuses tool calls\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Start both servers:\n\
           \x1b[36mkali-mcp run\x1b[0m\n\n\
        2. Or point the client elsewhere:\n\
           \x1b[36mkali-mcp chat --gateway-url http://HOST:8080\x1b[0m\n\n\
        3. Check the gateway health endpoint:\n\
           \x1b[36mcurl {}/health\x1b[0m",
        url,
        t("possible_causes"),
        t("try"),
        url
    )
}

/// The chat client could not get a reply from Ollama
pub fn ollama_unreachable_error() -> String {
    format!(
        "Could not get a reply from Ollama\n\n\
        \x1b[1;33m{}:\x1b[0m\n\
        • Ollama is not running\n\
        • The model has not been pulled\n\
        • OLLAMA_HOST points at the wrong address\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Start Ollama:\n\
           \x1b[36mollama serve\x1b[0m\n\n\
        2. Pull the model:\n\
           \x1b[36mollama pull llama3\x1b[0m\n\n\
        3. Choose another model or host:\n\
           \x1b[36mkali-mcp chat --model mistral --ollama-url http://HOST:11434\x1b[0m",
        t("possible_causes"),
        t("try")
    )
}

/// Format a config parse error with helpful suggestions
///
/// `path` is the `--config` argument; `None` means the default location.
pub fn config_parse_error(path: Option<&Path>) -> String {
    let path = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.kali-mcp/config.toml".to_string());
    format!(
        "Failed to load config file {}\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat {}\x1b[0m\n\n\
        2. Move it aside to fall back to defaults:\n\
           \x1b[36mmv {} {}.backup\x1b[0m\n\n\
        3. Common mistakes:\n\
           • Missing quotes around strings\n\
           • Port numbers outside 0-65535\n\
           • Section names other than [api], [gateway], [executor], [chat], [debug]",
        path,
        t("try"),
        path,
        path,
        path
    )
}

/// Format a bind failure with helpful suggestions
pub fn address_in_use_error(address: &str) -> String {
    format!(
        "Could not bind to {}\n\n\
        \x1b[1;32m{}:\x1b[0m\n\
        1. Find the process holding the port:\n\
           \x1b[36mss -ltnp | grep {}\x1b[0m\n\n\
        2. Pick another port:\n\
           \x1b[36mkali-mcp api --port 5001\x1b[0m",
        address,
        t("try"),
        address.rsplit(':').next().unwrap_or(address)
    )
}

/// Wrap a generic error with suggestions
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\x1b[1;33m{}:\x1b[0m {}",
        error,
        t("suggestion"),
        suggestion
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_unreachable_names_url_and_fix() {
        let msg = gateway_unreachable_error("http://localhost:8080");
        assert!(msg.contains("http://localhost:8080/health"));
        assert!(msg.contains("kali-mcp run"));
    }

    #[test]
    fn test_ollama_unreachable_suggests_pull() {
        assert!(ollama_unreachable_error().contains("ollama pull"));
    }

    #[test]
    fn test_address_in_use_extracts_port() {
        assert!(address_in_use_error("0.0.0.0:5000").contains("grep 5000"));
    }

    #[test]
    fn test_config_parse_error_names_file() {
        let msg = config_parse_error(Some(Path::new("/etc/kali-mcp.toml")));
        assert!(msg.contains("Failed to load config file /etc/kali-mcp.toml"));
        assert!(msg.contains("mv /etc/kali-mcp.toml /etc/kali-mcp.toml.backup"));
        assert!(config_parse_error(None).contains("~/.kali-mcp/config.toml"));
    }

    #[test]
    fn test_user_context_keeps_cause() {
        let result: Result<()> = Err(anyhow::anyhow!("expected `=`"));
        let err = result.user_context("Failed to load config").unwrap_err();
        assert_eq!(format!("{:#}", err), "Failed to load config: expected `=`");
    }

    #[test]
    fn test_wrap_error_with_suggestion() {
        let msg = wrap_error_with_suggestion("connection refused", "start the gateway");
        assert!(msg.starts_with("connection refused\n\n"));
        assert!(msg.ends_with("start the gateway"));
    }

    #[test]
    fn test_user_context_with_suggestion() {
        let result: Result<()> = Err(anyhow::anyhow!("boom"));
        let err = result
            .user_context_with_suggestion("Config unreadable", "check permissions")
            .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Config unreadable"));
        assert!(msg.contains("check permissions"));
        assert!(msg.contains("boom"));
    }
}
