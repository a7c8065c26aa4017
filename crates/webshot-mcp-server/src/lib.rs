//! webshot-mcp-server: MCP server for web page screenshots
//!
//! Thin protocol layer that wraps webshot-core with MCP tool routing
//! and response formatting.

pub mod mcp;
pub mod mcp_content;
