//! MCP server implementation for chain drive calculations.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: EOF on stdin or a termination signal

use std::io;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::tools::{ChainTools, ToolCallResult};
use crate::mcp::transport::StdioTransport;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// The MCP server for chain drive calculations.
pub struct McpServer<R = tokio::io::BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: StdioTransport<R, W>,
    /// Tool handlers.
    tools: ChainTools,
}

impl McpServer {
    /// Creates a server speaking over stdin/stdout.
    #[must_use]
    pub fn new(tools: ChainTools) -> Self {
        Self::with_transport(tools, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary transport.
    pub const fn with_transport(tools: ChainTools, transport: StdioTransport<R, W>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport,
            tools,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Consumes the server, returning its transport.
    pub fn into_transport(self) -> StdioTransport<R, W> {
        self.transport
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: io::Result<Option<String>>,
    ) -> io::Result<bool> {
        let Some(line) = line_result? else {
            debug!("stdin closed");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        match parse_message(&line) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(&req).await?,
            Ok(IncomingMessage::Notification(notif)) => self.handle_notification(&notif),
            Err(error) => {
                warn!(code = error.error.code, "Rejected malformed message");
                self.transport.write_message(&error).await?;
            }
        }

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles an incoming request.
    async fn handle_request(&mut self, req: &JsonRpcRequest) -> io::Result<()> {
        debug!(id = %req.id, method = %req.method, "Request");

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => self.transport.write_message(&resp).await,
            Err(error) => self.transport.write_message(&error).await,
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            info!("Client initialised");
            self.state = ServerState::Running;
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request(
                Some(req.id.clone()),
                "Server already initialised",
            ));
        }

        let params: InitializeParams = parse_params(req, "initialize")?;

        if let Some(ref client) = params.client_info {
            info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                requested_version = %params.protocol_version,
                "Client connected"
            );
        }

        self.state = ServerState::Initialising;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": ServerInfo::default(),
            }),
        ))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": ChainTools::definitions() }),
        ))
    }

    /// Handles the tools/call request.
    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = parse_params(req, "tool call")?;
        let result: ToolCallResult = self.tools.call(&params.name, &params.arguments);

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                ErrorCode::InvalidRequest,
                "Server not initialised",
            ));
        }
        Ok(())
    }
}

/// Deserialises required request parameters.
fn parse_params<T: DeserializeOwned>(req: &JsonRpcRequest, what: &str) -> Result<T, JsonRpcError> {
    let params = req.params.clone().ok_or_else(|| {
        JsonRpcError::invalid_params(req.id.clone(), format!("Missing {what} params"))
    })?;

    serde_json::from_value(params).map_err(|e| {
        JsonRpcError::invalid_params(req.id.clone(), format!("Invalid {what} params: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::SearchConfig;
    use crate::drive::ChainSpec;

    fn memory_server(input: &str) -> McpServer<&[u8], Vec<u8>> {
        let tools = ChainTools::new(ChainSpec::new(0.25).unwrap(), SearchConfig::default());
        McpServer::with_transport(tools, StdioTransport::new(input.as_bytes(), Vec::new()))
    }

    async fn run_session(input: &str) -> (ServerState, Vec<Value>) {
        let mut server = memory_server(input);
        server.run().await.unwrap();
        let state = server.state();

        let output = String::from_utf8(server.into_transport().into_writer()).unwrap();
        let messages = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (state, messages)
    }

    const HANDSHAKE: &str = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test-client","version":"1.0.0"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
    );

    #[test]
    fn server_initial_state() {
        let server = memory_server("");
        assert_eq!(server.state(), ServerState::AwaitingInit);
    }

    #[tokio::test]
    async fn eof_shuts_down() {
        let (state, messages) = run_session("").await;
        assert_eq!(state, ServerState::ShuttingDown);
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn full_session() {
        let input = format!(
            "{HANDSHAKE}{}\n\n{}\n{}\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"solve_sprocket","arguments":{"distance":3.5,"fixed_teeth":11,"min_teeth":18,"max_teeth":36}}}"#,
            r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#,
        );

        let (_, messages) = run_session(&input).await;
        assert_eq!(messages.len(), 4);

        assert_eq!(messages[0]["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(messages[0]["result"]["serverInfo"]["name"], SERVER_NAME);

        let tools = messages[1]["result"]["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == "solve_both_sprockets"));

        let call = &messages[2]["result"];
        assert!(call.get("isError").is_none());
        let text = call["content"][0]["text"].as_str().unwrap();
        let solved: Value = serde_json::from_str(text).unwrap();
        assert_eq!(solved["teeth"], 24);

        assert_eq!(messages[3]["id"], 4);
        assert_eq!(messages[3]["result"], json!({}));
    }

    #[tokio::test]
    async fn tool_errors_are_results() {
        let input = format!(
            "{HANDSHAKE}{}\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"center_distance","arguments":{"length_in_pitches":20,"teeth_a":10,"teeth_b":30}}}"#,
        );

        let (_, messages) = run_session(&input).await;
        let call = &messages[1]["result"];
        assert_eq!(call["isError"], true);
        assert!(call["content"][0]["text"].as_str().unwrap().contains("too short"));
    }

    #[tokio::test]
    async fn requests_before_initialisation_are_rejected() {
        let input = concat!(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#, "\n");

        let (state, messages) = run_session(input).await;
        assert_eq!(state, ServerState::ShuttingDown);
        assert_eq!(messages[0]["error"]["code"], ErrorCode::InvalidRequest.code());
    }

    #[tokio::test]
    async fn double_initialise_is_rejected() {
        let input = format!(
            "{HANDSHAKE}{}\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
        );

        let (_, messages) = run_session(&input).await;
        assert_eq!(messages[1]["error"]["code"], ErrorCode::InvalidRequest.code());
    }

    #[tokio::test]
    async fn malformed_and_unknown_messages() {
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":8,"method":"initialize"}"#,
            "\n",
        );

        let (_, messages) = run_session(input).await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["error"]["code"], ErrorCode::ParseError.code());
        assert_eq!(messages[1]["error"]["code"], ErrorCode::MethodNotFound.code());
        assert_eq!(messages[2]["error"]["code"], ErrorCode::InvalidParams.code());
    }
}
