pub mod content;
pub mod protocol;
pub mod tool;
pub mod utils;

pub use content::Content;
pub use mcp_error_rs as error;
pub use protocol::result::{CallToolResult, InitializeResult};
pub use tool::{Tool, ToolCall};
