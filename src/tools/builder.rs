// Command construction
//
// Token order is fixed per tool: base command, fixed flags, optional flags,
// then the positional argument(s).

use serde_json::Value;

use super::types::{
    DirbParams, Enum4linuxParams, GobusterParams, HydraParams, JohnParams, MetasploitParams,
    NiktoParams, NmapParams, SqlmapParams, ToolRequest, WpscanParams,
};
use super::validation::{
    check_allowed, check_enum, check_metacharacters, check_uncovered, optional, require,
    FieldPolicy, ValidationError, FORMAT, HOST, MODULE, PORTS, SERVICE, URL,
};

pub const DEFAULT_NMAP_SCAN_TYPE: &str = "-sV";
pub const DEFAULT_GOBUSTER_MODE: &str = "dir";
pub const GOBUSTER_MODES: [&str; 4] = ["dir", "dns", "fuzz", "vhost"];
pub const DEFAULT_WORDLIST: &str = "/usr/share/wordlists/dirb/common.txt";
pub const DEFAULT_ENUM4LINUX_ARGS: &str = "-a";
pub const HYDRA_TASKS: &str = "4";

/// A validated command, ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltCommand {
    /// A single shell command line
    Shell(String),
    /// A Metasploit resource script, run with `msfconsole -q -r <file>`
    MsfResource { script: String },
}

/// Command line under construction, joined with single spaces
struct Line(Vec<String>);

impl Line {
    fn new(base: &str) -> Self {
        Self(vec![base.to_string()])
    }

    fn push(&mut self, token: impl Into<String>) -> &mut Self {
        self.0.push(token.into());
        self
    }

    fn finish(self) -> BuiltCommand {
        BuiltCommand::Shell(self.0.join(" "))
    }
}

/// Turns tool requests into command lines
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandBuilder {
    policy: FieldPolicy,
}

impl CommandBuilder {
    pub fn new(policy: FieldPolicy) -> Self {
        Self { policy }
    }

    pub fn build(&self, request: &ToolRequest) -> Result<BuiltCommand, ValidationError> {
        match request {
            ToolRequest::Nmap(p) => self.nmap(p),
            ToolRequest::Gobuster(p) => self.gobuster(p),
            ToolRequest::Dirb(p) => self.dirb(p),
            ToolRequest::Nikto(p) => self.nikto(p),
            ToolRequest::Sqlmap(p) => self.sqlmap(p),
            ToolRequest::Metasploit(p) => self.metasploit(p),
            ToolRequest::Hydra(p) => self.hydra(p),
            ToolRequest::John(p) => self.john(p),
            ToolRequest::Wpscan(p) => self.wpscan(p),
            ToolRequest::Enum4linux(p) => self.enum4linux(p),
        }
    }

    fn push_additional_args(line: &mut Line, value: &Option<String>) -> Result<(), ValidationError> {
        if let Some(args) = optional(value) {
            line.push(check_metacharacters("additional_args", args)?);
        }
        Ok(())
    }

    fn nmap(&self, p: &NmapParams) -> Result<BuiltCommand, ValidationError> {
        let target = check_allowed("target", require("target", &p.target)?, HOST)?;
        let scan_type = optional(&p.scan_type).unwrap_or(DEFAULT_NMAP_SCAN_TYPE);

        let mut line = Line::new("nmap");
        line.push(check_metacharacters("scan_type", scan_type)?);

        if let Some(ports) = optional(&p.ports) {
            line.push("-p").push(check_allowed("ports", ports, PORTS)?);
        }

        Self::push_additional_args(&mut line, &p.additional_args)?;
        line.push(target);
        Ok(line.finish())
    }

    fn gobuster(&self, p: &GobusterParams) -> Result<BuiltCommand, ValidationError> {
        let url = require("url", &p.url)?;
        let mode = check_enum(
            "mode",
            optional(&p.mode).unwrap_or(DEFAULT_GOBUSTER_MODE),
            &GOBUSTER_MODES,
        )?;
        let url = check_allowed("url", url, URL)?;
        let wordlist = optional(&p.wordlist).unwrap_or(DEFAULT_WORDLIST);

        let mut line = Line::new("gobuster");
        line.push(mode)
            .push("-u")
            .push(url)
            .push("-w")
            .push(check_uncovered("wordlist", wordlist, self.policy)?);
        Self::push_additional_args(&mut line, &p.additional_args)?;
        Ok(line.finish())
    }

    fn dirb(&self, p: &DirbParams) -> Result<BuiltCommand, ValidationError> {
        let url = check_allowed("url", require("url", &p.url)?, URL)?;
        let wordlist = optional(&p.wordlist).unwrap_or(DEFAULT_WORDLIST);

        let mut line = Line::new("dirb");
        line.push(url)
            .push(check_uncovered("wordlist", wordlist, self.policy)?);
        Self::push_additional_args(&mut line, &p.additional_args)?;
        Ok(line.finish())
    }

    fn nikto(&self, p: &NiktoParams) -> Result<BuiltCommand, ValidationError> {
        // nikto accepts either a host or a URL here
        let target = check_allowed("target", require("target", &p.target)?, URL)?;

        let mut line = Line::new("nikto");
        line.push("-h").push(target);
        Self::push_additional_args(&mut line, &p.additional_args)?;
        Ok(line.finish())
    }

    fn sqlmap(&self, p: &SqlmapParams) -> Result<BuiltCommand, ValidationError> {
        let url = check_allowed("url", require("url", &p.url)?, URL)?;

        let mut line = Line::new("sqlmap");
        line.push("-u").push(url);
        if let Some(data) = optional(&p.data) {
            let data = check_uncovered("data", data, self.policy)?;
            line.push(format!("--data=\"{}\"", data));
        }
        Self::push_additional_args(&mut line, &p.additional_args)?;
        Ok(line.finish())
    }

    fn metasploit(&self, p: &MetasploitParams) -> Result<BuiltCommand, ValidationError> {
        let module = check_allowed("module", require("module", &p.module)?, MODULE)?;

        let mut script = format!("use {}\n", module);
        for (key, value) in &p.options {
            let value = option_value(value);
            check_uncovered("options", key, self.policy)?;
            check_uncovered("options", &value, self.policy)?;
            script.push_str(&format!("set {} {}\n", key, value));
        }
        script.push_str("exploit\n");

        Ok(BuiltCommand::MsfResource { script })
    }

    fn hydra(&self, p: &HydraParams) -> Result<BuiltCommand, ValidationError> {
        let target = require("target", &p.target)?;
        let service = require("service", &p.service)?;

        let user_flag = match (optional(&p.username), optional(&p.username_file)) {
            (Some(username), _) => ("-l", check_uncovered("username", username, self.policy)?),
            (None, Some(file)) => ("-L", check_uncovered("username_file", file, self.policy)?),
            (None, None) => {
                return Err(ValidationError::MissingParameter(
                    "username/username_file".to_string(),
                ))
            }
        };
        let pass_flag = match (optional(&p.password), optional(&p.password_file)) {
            (Some(password), _) => ("-p", check_uncovered("password", password, self.policy)?),
            (None, Some(file)) => ("-P", check_uncovered("password_file", file, self.policy)?),
            (None, None) => {
                return Err(ValidationError::MissingParameter(
                    "password/password_file".to_string(),
                ))
            }
        };

        let target = check_allowed("target", target, HOST)?;
        let service = check_allowed("service", service, SERVICE)?;

        let mut line = Line::new("hydra");
        line.push("-t")
            .push(HYDRA_TASKS)
            .push(user_flag.0)
            .push(user_flag.1)
            .push(pass_flag.0)
            .push(pass_flag.1);
        Self::push_additional_args(&mut line, &p.additional_args)?;
        line.push(target).push(service);
        Ok(line.finish())
    }

    fn john(&self, p: &JohnParams) -> Result<BuiltCommand, ValidationError> {
        let hash_file = require("hash_file", &p.hash_file)?;

        let mut line = Line::new("john");
        if let Some(format) = optional(&p.format) {
            line.push(format!("--format={}", check_allowed("format", format, FORMAT)?));
        }
        if let Some(wordlist) = optional(&p.wordlist) {
            let wordlist = check_uncovered("wordlist", wordlist, self.policy)?;
            line.push(format!("--wordlist={}", wordlist));
        }
        Self::push_additional_args(&mut line, &p.additional_args)?;
        line.push(check_uncovered("hash_file", hash_file, self.policy)?);
        Ok(line.finish())
    }

    fn wpscan(&self, p: &WpscanParams) -> Result<BuiltCommand, ValidationError> {
        let url = check_allowed("url", require("url", &p.url)?, URL)?;

        let mut line = Line::new("wpscan");
        line.push("--url").push(url);
        Self::push_additional_args(&mut line, &p.additional_args)?;
        Ok(line.finish())
    }

    fn enum4linux(&self, p: &Enum4linuxParams) -> Result<BuiltCommand, ValidationError> {
        let target = check_allowed("target", require("target", &p.target)?, HOST)?;
        let args = optional(&p.additional_args).unwrap_or(DEFAULT_ENUM4LINUX_ARGS);

        let mut line = Line::new("enum4linux");
        line.push(check_metacharacters("additional_args", args)?)
            .push(target);
        Ok(line.finish())
    }
}

/// Render a metasploit option value the way msfconsole expects it
fn option_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
