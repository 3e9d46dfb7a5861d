// Parameter validation for command construction
//
// Allow-list checks per field. This is a best-effort mitigation against
// shell injection, not a shell parser.

use serde::{Deserialize, Serialize};

/// Why a tool request was rejected before anything ran
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} parameter is required")]
    MissingParameter(String),

    #[error("Invalid {field} parameter: {value:?} contains disallowed characters")]
    InjectionSuspected { field: String, value: String },

    #[error("Invalid {field}: {value}. Must be one of: {}", .allowed.join(", "))]
    InvalidEnum {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ValidationError {
    /// The offending field, if the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingParameter(field) => Some(field),
            ValidationError::InjectionSuspected { field, .. } => Some(field),
            ValidationError::InvalidEnum { field, .. } => Some(field),
            ValidationError::InvalidBody(_) => None,
        }
    }
}

/// A set of characters a field may contain
#[derive(Debug, Clone, Copy)]
pub struct AllowList {
    digits_only: bool,
    extra: &'static str,
}

impl AllowList {
    const fn alphanumeric(extra: &'static str) -> Self {
        Self {
            digits_only: false,
            extra,
        }
    }

    const fn digits(extra: &'static str) -> Self {
        Self {
            digits_only: true,
            extra,
        }
    }

    pub fn permits_char(&self, c: char) -> bool {
        let base = if self.digits_only {
            c.is_ascii_digit()
        } else {
            c.is_ascii_alphanumeric()
        };
        base || self.extra.contains(c)
    }

    pub fn permits(&self, value: &str) -> bool {
        value.chars().all(|c| self.permits_char(c))
    }
}

/// Hostnames, IPv4 and IPv6 addresses
pub const HOST: AllowList = AllowList::alphanumeric(".-_:");
/// Port lists and ranges (`22,80,8000-8100`)
pub const PORTS: AllowList = AllowList::digits(",-");
/// Service names such as `ssh` or `http-post-form`
pub const SERVICE: AllowList = AllowList::alphanumeric("._-");
/// Metasploit module paths
pub const MODULE: AllowList = AllowList::alphanumeric("/._-");
/// John the Ripper hash formats
pub const FORMAT: AllowList = AllowList::alphanumeric("-_");
/// URLs without shell metacharacters or whitespace
pub const URL: AllowList = AllowList::alphanumeric(":/._-?=%~+#@,[]");

/// Characters rejected in `additional_args`-class fields
pub const SHELL_METACHARACTERS: [char; 3] = [';', '&', '|'];

/// How fields without an allow-list are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPolicy {
    /// Concatenated unfiltered
    #[default]
    Permissive,
    /// Metacharacters, backticks, `$(` and line breaks are rejected
    Strict,
}

/// A parameter value, with empty strings treated as absent
pub fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub fn require<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, ValidationError> {
    optional(value).ok_or_else(|| ValidationError::MissingParameter(field.to_string()))
}

pub fn check_allowed<'a>(
    field: &str,
    value: &'a str,
    allow_list: AllowList,
) -> Result<&'a str, ValidationError> {
    if allow_list.permits(value) {
        Ok(value)
    } else {
        tracing::warn!(field = field, value = value, "Potential command injection attempt");
        Err(injection(field, value))
    }
}

/// Reject `;`, `&` and `|` in free-form argument strings
pub fn check_metacharacters<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.contains(SHELL_METACHARACTERS) {
        tracing::warn!(field = field, value = value, "Potential command injection in arguments");
        Err(injection(field, value))
    } else {
        Ok(value)
    }
}

pub fn check_enum<'a>(
    field: &str,
    value: &'a str,
    allowed: &[&str],
) -> Result<&'a str, ValidationError> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        tracing::warn!(field = field, value = value, "Value outside of allowed set");
        Err(ValidationError::InvalidEnum {
            field: field.to_string(),
            value: value.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// Check a field that has no allow-list of its own
pub fn check_uncovered<'a>(
    field: &str,
    value: &'a str,
    policy: FieldPolicy,
) -> Result<&'a str, ValidationError> {
    match policy {
        FieldPolicy::Permissive => Ok(value),
        FieldPolicy::Strict => {
            let suspicious = value.contains(SHELL_METACHARACTERS)
                || value.contains('`')
                || value.contains("$(")
                || value.contains('\n')
                || value.contains('\r');
            if suspicious {
                tracing::warn!(field = field, value = value, "Rejected unfiltered field");
                Err(injection(field, value))
            } else {
                Ok(value)
            }
        }
    }
}

fn injection(field: &str, value: &str) -> ValidationError {
    ValidationError::InjectionSuspected {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_allow_list() {
        for ok in ["10.10.10.10", "scanme.nmap.org", "fe80::1", "host_1-a"] {
            assert!(HOST.permits(ok), "{} should pass", ok);
        }
        for bad in [
            "10.0.0.1;id",
            "10.0.0.1 && id",
            "$(id)",
            "a b",
            "10.0.0.0/24",
            "`id`",
            "host\n",
            "hôst",
        ] {
            assert!(!HOST.permits(bad), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_host_rejection_reports_field_and_value() {
        let err = check_allowed("target", "10.0.0.1|nc", HOST).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InjectionSuspected {
                field: "target".into(),
                value: "10.0.0.1|nc".into()
            }
        );
        assert_eq!(err.field(), Some("target"));
    }

    #[test]
    fn test_ports_allow_list() {
        assert!(PORTS.permits("22,80,443"));
        assert!(PORTS.permits("1-1024"));
        assert!(!PORTS.permits("80 -oN /tmp/x"));
        assert!(!PORTS.permits("http"));
    }

    #[test]
    fn test_metacharacters() {
        assert!(check_metacharacters("additional_args", "-T4 -Pn").is_ok());
        for bad in ["-T4; id", "-T4 & id", "-T4 | tee", "&&"] {
            assert!(check_metacharacters("additional_args", bad).is_err());
        }
        // backticks are not in the additional_args set
        assert!(check_metacharacters("additional_args", "`id`").is_ok());
    }

    #[test]
    fn test_enum_is_case_sensitive() {
        let allowed = ["dir", "dns"];
        assert_eq!(check_enum("mode", "dir", &allowed).unwrap(), "dir");
        let err = check_enum("mode", "DIR", &allowed).unwrap_err();
        assert_eq!(err.to_string(), "Invalid mode: DIR. Must be one of: dir, dns");
    }

    #[test]
    fn test_require_treats_empty_as_missing() {
        assert_eq!(
            require("target", &Some(String::new())).unwrap_err(),
            ValidationError::MissingParameter("target".into())
        );
        assert_eq!(require("target", &None).unwrap_err().to_string(), "target parameter is required");
        assert_eq!(require("target", &Some("x".into())).unwrap(), "x");
    }

    #[test]
    fn test_uncovered_policy() {
        let value = "user=a&pass=b";
        assert_eq!(check_uncovered("data", value, FieldPolicy::Permissive).unwrap(), value);
        assert!(check_uncovered("data", value, FieldPolicy::Strict).is_err());
        assert!(check_uncovered("wordlist", "$(id)", FieldPolicy::Strict).is_err());
        assert!(check_uncovered("wordlist", "/usr/share/wordlists/rockyou.txt", FieldPolicy::Strict).is_ok());
    }
}
