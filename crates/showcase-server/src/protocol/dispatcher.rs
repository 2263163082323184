//! MCP request dispatcher
//!
//! Routes incoming envelopes for one resolved session to the capability
//! registries and features. The session-id gate lives in the transports;
//! everything that reaches `dispatch` already has a live session. Exactly
//! one response (or structured error) is produced per request.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use showcase_core::{
    BrokerReply, CompletionEngine, CompletionReference, CoreError, LogLevel, RequestBroker,
    Session, SessionRegistry,
};

use super::capabilities::ServerCapabilities;
use super::types::*;
use crate::registry::{HandlerContext, PromptRegistry, ResourceRegistry, ToolRegistry};

/// Page size for resources/list
const RESOURCE_PAGE_SIZE: usize = 10;
/// Page size for tools/list and prompts/list
const LIST_PAGE_SIZE: usize = 50;

/// Dispatcher over the capability registries, shared by all transports
pub struct Dispatcher {
    sessions: Arc<SessionRegistry>,
    broker: Arc<RequestBroker>,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    completions: CompletionEngine,
    server_name: String,
    server_version: String,
}

impl Dispatcher {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        broker: Arc<RequestBroker>,
        tools: ToolRegistry,
        resources: ResourceRegistry,
        prompts: PromptRegistry,
        completions: CompletionEngine,
    ) -> Self {
        Self {
            sessions,
            broker,
            tools,
            resources,
            prompts,
            completions,
            server_name: "mcp-showcase".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn broker(&self) -> &Arc<RequestBroker> {
        &self.broker
    }

    /// Route a reply envelope to the broker. Returns false when no pending
    /// request matches, in which case the reply is discarded.
    pub fn accept_reply(&self, message: &McpMessage) -> bool {
        let Some(id) = message.id.as_ref().and_then(Value::as_str) else {
            warn!("Discarding reply without a string id");
            return false;
        };

        let reply = match &message.error {
            Some(err) => BrokerReply::Error {
                code: err.code as i64,
                message: err.message.clone(),
            },
            None => BrokerReply::Result(message.result.clone().unwrap_or(Value::Null)),
        };
        self.broker.resolve(id, reply)
    }

    /// Handle an incoming message for a resolved session
    pub async fn dispatch(&self, session: &Arc<Session>, message: McpMessage) -> Option<McpMessage> {
        if message.is_request() {
            let method = message.method.as_deref().unwrap_or_default().to_string();
            let id = message.id.clone().unwrap_or(Value::Null);

            debug!("Handling request: {}", method);

            // any post-init request moves the session out of the handshake
            if method != "initialize" && !session.is_initialized() {
                session.mark_initialized();
            }

            let result = match method.as_str() {
                "initialize" => self.handle_initialize(session, message.params),
                "ping" => Ok(json!({})),
                "tools/list" => self.handle_tools_list(message.params),
                "tools/call" => self.handle_tools_call(session, message.params).await,
                "resources/list" => self.handle_resources_list(message.params),
                "resources/templates/list" => self.handle_resource_templates_list(),
                "resources/read" => self.handle_resources_read(session, message.params).await,
                "resources/subscribe" => self.handle_subscribe(session, message.params),
                "resources/unsubscribe" => self.handle_unsubscribe(session, message.params),
                "prompts/list" => self.handle_prompts_list(message.params),
                "prompts/get" => self.handle_prompts_get(session, message.params).await,
                "completion/complete" => self.handle_complete(message.params),
                "logging/setLevel" => self.handle_set_level(session, message.params),
                _ => Err(McpError::method_not_found(&method)),
            };

            Some(match result {
                Ok(result) => McpMessage::response(id, result),
                Err(error) => McpMessage::error_response(Some(id), error),
            })
        } else if message.is_notification() {
            let method = message.method.as_deref().unwrap_or_default();
            debug!("Received notification: {}", method);

            match method {
                "notifications/initialized" | "initialized" => {
                    session.mark_initialized();
                    info!("Session {} initialized", session.id);
                }
                "notifications/cancelled" => {
                    debug!("Request cancelled by client");
                }
                other => {
                    debug!("Unknown notification: {}", other);
                }
            }
            None
        } else {
            // reply envelopes are routed to the broker by the transport
            debug!("Ignoring non-request message in dispatch");
            None
        }
    }

    fn context(&self, session: &Arc<Session>) -> HandlerContext {
        HandlerContext::new(session.clone(), self.broker.clone())
    }

    fn handle_initialize(
        &self,
        _session: &Arc<Session>,
        params: Option<Value>,
    ) -> Result<Value, McpError> {
        let params: InitializeParams = parse_params(params)?;

        info!(
            "Initializing session with client: {} v{}",
            params.client_info.name, params.client_info.version
        );

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities::full(),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
            },
        };
        to_result(result)
    }

    fn handle_tools_list(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: PaginatedParams = parse_optional_params(params)?;
        let page = showcase_core::cursor::paginate(
            &self.tools.list(),
            params.cursor.as_deref(),
            LIST_PAGE_SIZE,
        );

        to_result(ListToolsResult {
            tools: page.items,
            next_cursor: page.next_cursor,
        })
    }

    async fn handle_tools_call(
        &self,
        session: &Arc<Session>,
        params: Option<Value>,
    ) -> Result<Value, McpError> {
        let params: CallToolParams = parse_params(params)?;
        debug!("Calling tool: {}", params.name);

        let ctx = self
            .context(session)
            .with_progress_token(params.meta.and_then(|meta| meta.progress_token));
        let args = params.arguments.unwrap_or_else(|| json!({}));

        match self.tools.invoke(&params.name, args, &ctx).await {
            Ok(result) => to_result(result),
            Err(err @ (CoreError::ToolNotFound(_) | CoreError::InvalidInput { .. })) => {
                Err(err.into())
            }
            Err(err) => {
                // handler failures come back in-band; the session stays usable
                error!("Tool execution failed: {}", err);
                to_result(CallToolResult::error(err.to_string()))
            }
        }
    }

    fn handle_resources_list(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: PaginatedParams = parse_optional_params(params)?;
        let page = showcase_core::cursor::paginate(
            &self.resources.list(),
            params.cursor.as_deref(),
            RESOURCE_PAGE_SIZE,
        );

        to_result(ListResourcesResult {
            resources: page.items,
            next_cursor: page.next_cursor,
        })
    }

    fn handle_resource_templates_list(&self) -> Result<Value, McpError> {
        to_result(ListResourceTemplatesResult {
            resource_templates: self.resources.templates(),
        })
    }

    async fn handle_resources_read(
        &self,
        session: &Arc<Session>,
        params: Option<Value>,
    ) -> Result<Value, McpError> {
        let params: ReadResourceParams = parse_params(params)?;
        debug!("Reading resource: {}", params.uri);

        let ctx = self.context(session);
        let contents = self.resources.read(&params.uri, &ctx).await?;
        to_result(ReadResourceResult { contents })
    }

    fn handle_subscribe(
        &self,
        session: &Arc<Session>,
        params: Option<Value>,
    ) -> Result<Value, McpError> {
        let params: SubscribeParams = parse_params(params)?;
        session.subscribe(params.uri);
        Ok(json!({}))
    }

    fn handle_unsubscribe(
        &self,
        session: &Arc<Session>,
        params: Option<Value>,
    ) -> Result<Value, McpError> {
        let params: SubscribeParams = parse_params(params)?;
        session.unsubscribe(&params.uri);
        Ok(json!({}))
    }

    fn handle_prompts_list(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: PaginatedParams = parse_optional_params(params)?;
        let page = showcase_core::cursor::paginate(
            &self.prompts.list(),
            params.cursor.as_deref(),
            LIST_PAGE_SIZE,
        );

        to_result(ListPromptsResult {
            prompts: page.items,
            next_cursor: page.next_cursor,
        })
    }

    async fn handle_prompts_get(
        &self,
        session: &Arc<Session>,
        params: Option<Value>,
    ) -> Result<Value, McpError> {
        let params: GetPromptParams = parse_params(params)?;
        debug!("Getting prompt: {}", params.name);

        let ctx = self.context(session);
        let result = self
            .prompts
            .invoke(&params.name, params.arguments.unwrap_or_default(), &ctx)
            .await?;
        to_result(result)
    }

    fn handle_complete(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: CompleteParams = parse_params(params)?;

        let reference = match params.reference.kind.as_str() {
            "ref/resource" => CompletionReference::ResourceTemplate {
                uri: params.reference.uri.unwrap_or_default(),
            },
            "ref/prompt" => CompletionReference::Prompt {
                name: params.reference.name.unwrap_or_default(),
            },
            other => {
                // unknown reference kinds complete to nothing, not an error
                debug!("Unknown completion reference kind: {}", other);
                return to_result(CompleteResult {
                    completion: CompletionValues {
                        values: Vec::new(),
                        has_more: false,
                        total: 0,
                    },
                });
            }
        };

        let completion =
            self.completions
                .complete(&reference, &params.argument.name, &params.argument.value);

        to_result(CompleteResult {
            completion: CompletionValues {
                values: completion.values,
                has_more: completion.has_more,
                total: completion.total,
            },
        })
    }

    fn handle_set_level(
        &self,
        session: &Arc<Session>,
        params: Option<Value>,
    ) -> Result<Value, McpError> {
        let params: Value = parse_params(params)?;
        let level: LogLevel = serde_json::from_value(params["level"].clone())
            .map_err(|_| McpError::validation("level", format!("unknown log level: {}", params["level"])))?;

        session.set_log_level(level);
        info!("Session {} log level set to {}", session.id, level);

        // fire-and-forget confirmation, mirrored to the notification stream
        let _ = session.send(json!({
            "jsonrpc": "2.0",
            "method": "notifications/message",
            "params": {
                "level": "debug",
                "logger": self.server_name,
                "data": format!("Logging level set to: {}", level),
            },
        }));

        Ok(json!({}))
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, McpError> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|err| McpError::invalid_params(err.to_string()))?
        .ok_or_else(|| McpError::invalid_params("Missing params"))
}

fn parse_optional_params<T: serde::de::DeserializeOwned + Default>(
    params: Option<Value>,
) -> Result<T, McpError> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|err| McpError::invalid_params(err.to_string()))
        .map(Option::unwrap_or_default)
}

fn to_result<T: serde::Serialize>(result: T) -> Result<Value, McpError> {
    serde_json::to_value(result).map_err(|err| McpError::internal_error(err.to_string()))
}
