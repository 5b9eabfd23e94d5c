//! MCP server side: line-delimited JSON-RPC 2.0 over stdio.

pub mod protocol;
pub mod server;

pub use server::McpServer;
