pub mod http;
pub mod service;
pub mod sweep;
pub mod tools;

pub use mcp_core_rs as core;
pub use mcp_error_rs as error;
pub use mcp_server_rs as server;
