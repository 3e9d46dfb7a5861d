// Kali MCP - tool dispatch service, MCP gateway and chat client for
// Kali Linux security tools
// Library exports

pub mod cli; // Interactive chat client
pub mod client; // HTTP clients for the gateway and the chat loop
pub mod config;
pub mod errors;
pub mod metrics;
pub mod providers; // Local model access (Ollama)
pub mod server; // Dispatch service and MCP gateway
pub mod tools; // Command building, validation and execution
