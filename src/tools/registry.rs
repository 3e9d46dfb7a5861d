// Tool registry
//
// Static description of every tool: route, parameters and an example used in
// the chat guide and the gateway capabilities.

use super::types::{ToolDefinition, ToolInputSchema, ToolKind};

/// Everything known about a tool at compile time
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub summary: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Natural-language example request
    pub example: &'static str,
    /// Parameters matching the example
    pub example_params: &'static str,
}

impl ToolSpec {
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.summary.to_string(),
            input_schema: self.input_schema(),
        }
    }

    fn input_schema(&self) -> ToolInputSchema {
        let mut schema = ToolInputSchema::strings(self.required, self.optional);
        // metasploit options are a map, not a string
        if self.kind == ToolKind::Metasploit {
            schema.properties["options"] = serde_json::json!({ "type": "object" });
        }
        schema
    }
}

static TOOLS: [ToolSpec; 10] = [
    ToolSpec {
        kind: ToolKind::Nmap,
        summary: "Network scanning and host discovery",
        required: &["target"],
        optional: &["scan_type", "ports", "additional_args"],
        example: "Run nmap scan on 10.10.10.10 with service detection",
        example_params: "target=10.10.10.10, scan_type=-sV, ports=80,443,22",
    },
    ToolSpec {
        kind: ToolKind::Gobuster,
        summary: "Directory and file brute forcing",
        required: &["url"],
        optional: &["mode", "wordlist", "additional_args"],
        example: "Run gobuster on http://10.10.10.10 using common wordlist",
        example_params: "url=http://10.10.10.10, mode=dir, wordlist=/usr/share/wordlists/dirb/common.txt",
    },
    ToolSpec {
        kind: ToolKind::Dirb,
        summary: "Web content scanner",
        required: &["url"],
        optional: &["wordlist", "additional_args"],
        example: "Run dirb on http://10.10.10.10",
        example_params: "url=http://10.10.10.10, wordlist=/usr/share/wordlists/dirb/common.txt",
    },
    ToolSpec {
        kind: ToolKind::Nikto,
        summary: "Web server scanner",
        required: &["target"],
        optional: &["additional_args"],
        example: "Run nikto scan on http://10.10.10.10",
        example_params: "target=http://10.10.10.10",
    },
    ToolSpec {
        kind: ToolKind::Sqlmap,
        summary: "SQL injection testing",
        required: &["url"],
        optional: &["data", "additional_args"],
        example: "Run sqlmap on http://10.10.10.10/page.php?id=1",
        example_params: "url=http://10.10.10.10/page.php?id=1, data=username=test&password=test",
    },
    ToolSpec {
        kind: ToolKind::Metasploit,
        summary: "Exploitation framework",
        required: &["module"],
        optional: &["options"],
        example: "Run metasploit module exploit/multi/http/apache_struts2_content_type_rce",
        example_params: "module=exploit/multi/http/apache_struts2_content_type_rce, options.RHOSTS=10.10.10.10",
    },
    ToolSpec {
        kind: ToolKind::Hydra,
        summary: "Password brute forcing",
        required: &["target", "service"],
        optional: &[
            "username",
            "username_file",
            "password",
            "password_file",
            "additional_args",
        ],
        example: "Run hydra to brute force SSH on 10.10.10.10 for user admin",
        example_params: "target=10.10.10.10, service=ssh, username=admin, password_file=/usr/share/wordlists/rockyou.txt",
    },
    ToolSpec {
        kind: ToolKind::John,
        summary: "Password cracking",
        required: &["hash_file"],
        optional: &["wordlist", "format", "additional_args"],
        example: "Run john on hash file with rockyou wordlist",
        example_params: "hash_file=/path/to/hashes.txt, wordlist=/usr/share/wordlists/rockyou.txt, format=md5crypt",
    },
    ToolSpec {
        kind: ToolKind::Wpscan,
        summary: "WordPress vulnerability scanner",
        required: &["url"],
        optional: &["additional_args"],
        example: "Run wpscan on http://10.10.10.10",
        example_params: "url=http://10.10.10.10, additional_args=--enumerate u,p,t",
    },
    ToolSpec {
        kind: ToolKind::Enum4linux,
        summary: "Windows/Samba enumeration",
        required: &["target"],
        optional: &["additional_args"],
        example: "Run enum4linux on 10.10.10.10",
        example_params: "target=10.10.10.10, additional_args=-a",
    },
];

/// Read-only view over the tool table
pub struct ToolRegistry;

impl ToolRegistry {
    /// All tools, in registry order
    pub fn all() -> &'static [ToolSpec] {
        &TOOLS
    }

    pub fn get(kind: ToolKind) -> &'static ToolSpec {
        // TOOLS is laid out in ToolKind::ALL order
        &TOOLS[kind as usize]
    }

    pub fn lookup(name: &str) -> Option<&'static ToolSpec> {
        name.parse::<ToolKind>().ok().map(Self::get)
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        TOOLS.iter().map(ToolSpec::definition).collect()
    }
}
