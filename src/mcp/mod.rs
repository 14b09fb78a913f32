//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes the chain drive calculations as MCP tools. The server
//! communicates over stdio transport using JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│    Tools    │    │
//! │   │   (stdio)   │    │ (lifecycle) │    │ (ChainTools)│    │
//! │   └─────────────┘    └─────────────┘    └──────┬──────┘    │
//! │                                                │            │
//! │                                                ▼            │
//! │                                       ┌─────────────────┐   │
//! │                                       │  drive (pure)   │   │
//! │                                       └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use tools::{ChainTools, ToolCallResult};
pub use transport::StdioTransport;
