// Tool intent extraction
//
// Best-effort heuristic, not a parser. A tool is picked when its name appears
// anywhere in the lowercased text, so "johnny" matches john and a model that
// merely mentions nmap triggers it. Only IPv4 addresses and http(s) URLs are
// recognised as parameters: hostnames, IPv6 targets and tools whose required
// parameters are not IP or URL shaped (metasploit, hydra, john) are never
// extracted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::tools::{ToolKind, ToolRegistry};

static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("IPv4 pattern is valid")
});

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("URL pattern is valid"));

/// Characters stripped from the end of a matched URL
const URL_TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"', '`', '>'];

/// A tool call recovered from free text
#[derive(Debug, Clone, PartialEq)]
pub struct ToolIntent {
    pub kind: ToolKind,
    pub params: Map<String, Value>,
}

/// Find the first registered tool mentioned in `text` whose parameter can be
/// pulled out of the same text
pub fn extract_tool_intent(text: &str) -> Option<ToolIntent> {
    let lowered = text.to_lowercase();

    for spec in ToolRegistry::all() {
        if !lowered.contains(spec.name()) {
            continue;
        }

        let param = match spec.kind {
            ToolKind::Nmap | ToolKind::Enum4linux => first_ipv4(text).map(|ip| ("target", ip)),
            ToolKind::Gobuster | ToolKind::Dirb | ToolKind::Wpscan | ToolKind::Sqlmap => {
                first_url(text).map(|url| ("url", url))
            }
            ToolKind::Nikto => first_url(text).map(|url| ("target", url)),
            ToolKind::Metasploit | ToolKind::Hydra | ToolKind::John => None,
        };

        if let Some((field, value)) = param {
            let mut params = Map::new();
            params.insert(field.to_string(), Value::String(value));
            tracing::debug!(tool = %spec.kind, params = ?params, "Extracted tool intent");
            return Some(ToolIntent {
                kind: spec.kind,
                params,
            });
        }
    }

    None
}

fn first_ipv4(text: &str) -> Option<String> {
    IPV4.find(text).map(|m| m.as_str().to_string())
}

fn first_url(text: &str) -> Option<String> {
    URL.find_iter(text)
        .map(|m| m.as_str().trim_end_matches(URL_TRAILING))
        .find(|url| !url.ends_with("://"))
        .map(str::to_string)
}
