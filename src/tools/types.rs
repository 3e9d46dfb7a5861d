// Core types for the tool execution contract
//
// Requests are decoded from loosely typed JSON into one typed parameter
// record per tool, so validation can match exhaustively on the tool.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::validation::ValidationError;

/// The closed set of tools the dispatch service knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Nmap,
    Gobuster,
    Dirb,
    Nikto,
    Sqlmap,
    Metasploit,
    Hydra,
    John,
    Wpscan,
    Enum4linux,
}

impl ToolKind {
    /// All tools, in registry order
    pub const ALL: [ToolKind; 10] = [
        ToolKind::Nmap,
        ToolKind::Gobuster,
        ToolKind::Dirb,
        ToolKind::Nikto,
        ToolKind::Sqlmap,
        ToolKind::Metasploit,
        ToolKind::Hydra,
        ToolKind::John,
        ToolKind::Wpscan,
        ToolKind::Enum4linux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Nmap => "nmap",
            ToolKind::Gobuster => "gobuster",
            ToolKind::Dirb => "dirb",
            ToolKind::Nikto => "nikto",
            ToolKind::Sqlmap => "sqlmap",
            ToolKind::Metasploit => "metasploit",
            ToolKind::Hydra => "hydra",
            ToolKind::John => "john",
            ToolKind::Wpscan => "wpscan",
            ToolKind::Enum4linux => "enum4linux",
        }
    }

    /// Dispatch service route for this tool
    pub fn api_path(&self) -> String {
        format!("/api/tools/{}", self.as_str())
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tool name is not in the registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for ToolKind {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// Accept strings, numbers and booleans for a parameter; anything else is a
/// malformed body.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string, found {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NmapParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub scan_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub ports: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GobusterParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub wordlist: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirbParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub wordlist: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NiktoParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqlmapParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub data: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetasploitParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub module: Option<String>,
    /// Module options, written as `set KEY VALUE` lines in request order
    #[serde(default)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HydraParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub service: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub username_file: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password_file: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JohnParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub hash_file: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub wordlist: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WpscanParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Enum4linuxParams {
    #[serde(default, deserialize_with = "scalar_string")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub additional_args: Option<String>,
}

/// A tool invocation with its typed parameters
#[derive(Debug, Clone)]
pub enum ToolRequest {
    Nmap(NmapParams),
    Gobuster(GobusterParams),
    Dirb(DirbParams),
    Nikto(NiktoParams),
    Sqlmap(SqlmapParams),
    Metasploit(MetasploitParams),
    Hydra(HydraParams),
    John(JohnParams),
    Wpscan(WpscanParams),
    Enum4linux(Enum4linuxParams),
}

impl ToolRequest {
    /// Decode a JSON request body for the given tool
    ///
    /// Unknown keys are ignored. The body must be a JSON object.
    pub fn from_json(kind: ToolKind, body: Value) -> Result<Self, ValidationError> {
        if !body.is_object() {
            return Err(ValidationError::InvalidBody(
                "request body must be a JSON object".to_string(),
            ));
        }

        fn decode<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ValidationError> {
            serde_json::from_value(body).map_err(|e| ValidationError::InvalidBody(e.to_string()))
        }

        Ok(match kind {
            ToolKind::Nmap => ToolRequest::Nmap(decode(body)?),
            ToolKind::Gobuster => ToolRequest::Gobuster(decode(body)?),
            ToolKind::Dirb => ToolRequest::Dirb(decode(body)?),
            ToolKind::Nikto => ToolRequest::Nikto(decode(body)?),
            ToolKind::Sqlmap => ToolRequest::Sqlmap(decode(body)?),
            ToolKind::Metasploit => ToolRequest::Metasploit(decode(body)?),
            ToolKind::Hydra => ToolRequest::Hydra(decode(body)?),
            ToolKind::John => ToolRequest::John(decode(body)?),
            ToolKind::Wpscan => ToolRequest::Wpscan(decode(body)?),
            ToolKind::Enum4linux => ToolRequest::Enum4linux(decode(body)?),
        })
    }
}

/// Outcome of one process invocation
///
/// Timeouts and spawn failures are reported here with `return_code = -1`
/// rather than as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
    pub success: bool,
}

impl ExecutionResult {
    pub fn completed(stdout: String, stderr: String, return_code: i32) -> Self {
        Self {
            stdout,
            stderr,
            return_code,
            success: return_code == 0,
        }
    }

    pub fn failed(stderr: String) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            return_code: -1,
            success: false,
        }
    }
}

/// Tool definition advertised through the gateway capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

/// JSON Schema for tool input parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    pub required: Vec<String>,
}

impl ToolInputSchema {
    /// String parameters, split into required and optional
    pub fn strings(required: &[&str], optional: &[&str]) -> Self {
        let mut properties = Map::new();
        for name in required.iter().chain(optional.iter()) {
            properties.insert(name.to_string(), serde_json::json!({ "type": "string" }));
        }

        Self {
            schema_type: "object".to_string(),
            properties: Value::Object(properties),
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }
}
