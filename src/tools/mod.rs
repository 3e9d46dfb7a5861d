// Tool execution system
//
// Turns tool requests into validated command lines and runs them.

pub mod builder;
pub mod dispatch;
pub mod executor;
pub mod registry;
pub mod types;
pub mod validation;

pub use builder::{BuiltCommand, CommandBuilder};
pub use dispatch::{DispatchError, ToolDispatcher};
pub use executor::{CommandExecutor, ShellExecutor};
pub use registry::{ToolRegistry, ToolSpec};
pub use types::{ExecutionResult, ToolDefinition, ToolKind, ToolRequest, UnknownTool};
pub use validation::{FieldPolicy, ValidationError};
