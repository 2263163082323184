//! Capability registries and the handler execution context
//!
//! The three registries (tools, resources, prompts) are built once at server
//! start and read-only afterwards. Listing order is insertion order.
//! Handlers never touch a registry; all side effects flow through the
//! [`HandlerContext`] they are given - notifications onto the session
//! outbox, nested client round trips through the broker.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::warn;

use showcase_core::{BrokerReply, CoreError, RequestBroker, Result, Session};

use crate::protocol::{
    CallToolResult, CreateMessageParams, CreateMessageResult, ElicitAction, ElicitResult,
    GetPromptResult, Prompt, ResourceContents, ResourceDescriptor, ResourceTemplate, Tool,
};
use crate::schema;

/// Execution context handed to every capability handler
pub struct HandlerContext {
    pub session: Arc<Session>,
    broker: Arc<RequestBroker>,
    /// Progress token from the request's `_meta`, if the client sent one
    pub progress_token: Option<Value>,
}

impl HandlerContext {
    pub fn new(session: Arc<Session>, broker: Arc<RequestBroker>) -> Self {
        Self {
            session,
            broker,
            progress_token: None,
        }
    }

    pub fn with_progress_token(mut self, token: Option<Value>) -> Self {
        self.progress_token = token;
        self
    }

    /// Ask the client to collect structured input from its user and suspend
    /// until it answers. A destroyed session resolves as a cancel outcome.
    pub async fn elicit(&self, message: &str, requested_schema: Value) -> Result<ElicitResult> {
        let params = json!({
            "message": message,
            "requestedSchema": requested_schema,
        });

        match self
            .broker
            .send(&self.session, "elicitation/create", params)
            .await?
        {
            BrokerReply::Result(value) => serde_json::from_value(value).map_err(|err| {
                warn!("Malformed elicitation reply: {}", err);
                CoreError::HandlerFailed(format!("malformed elicitation reply: {}", err))
            }),
            BrokerReply::Error { code, message } => Err(CoreError::HandlerFailed(format!(
                "elicitation rejected by client ({}): {}",
                code, message
            ))),
            BrokerReply::Cancelled => Ok(ElicitResult {
                action: ElicitAction::Cancel,
                content: None,
            }),
        }
    }

    /// Ask the client to sample a model response and suspend until it
    /// answers.
    pub async fn sample(&self, params: CreateMessageParams) -> Result<CreateMessageResult> {
        let params = serde_json::to_value(params)?;

        match self
            .broker
            .send(&self.session, "sampling/createMessage", params)
            .await?
        {
            BrokerReply::Result(value) => serde_json::from_value(value).map_err(|err| {
                warn!("Malformed sampling reply: {}", err);
                CoreError::HandlerFailed(format!("malformed sampling reply: {}", err))
            }),
            BrokerReply::Error { code, message } => Err(CoreError::HandlerFailed(format!(
                "sampling rejected by client ({}): {}",
                code, message
            ))),
            BrokerReply::Cancelled => {
                Err(CoreError::HandlerFailed("sampling request cancelled".into()))
            }
        }
    }

    /// Fire-and-forget notification onto the session's outbound channel
    pub fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.session.send(json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
    }

    /// Emit a `notifications/progress` update if the request carried a token
    pub fn progress(&self, progress: u64, total: u64) {
        if let Some(token) = &self.progress_token {
            let _ = self.notify(
                "notifications/progress",
                json!({
                    "progress": progress,
                    "total": total,
                    "progressToken": token,
                }),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// A named tool: descriptor plus handler
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> Tool;
    async fn call(&self, args: Value, ctx: &HandlerContext) -> Result<CallToolResult>;
}

/// Tool registry, insertion-ordered
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.descriptor().name;
        self.tools.insert(name, handler);
    }

    pub fn list(&self) -> Vec<Tool> {
        self.tools.values().map(|h| h.descriptor()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools.get(name)
    }

    /// Validate input against the tool's contract, then run the handler
    pub async fn invoke(
        &self,
        name: &str,
        args: Value,
        ctx: &HandlerContext,
    ) -> Result<CallToolResult> {
        let handler = self
            .tools
            .get(name)
            .ok_or_else(|| CoreError::ToolNotFound(name.to_string()))?;

        schema::validate(&handler.descriptor().input_schema, &args)?;
        handler.call(args, ctx).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Reads the contents behind one registered resource URI
#[async_trait]
pub trait ResourceReader: Send + Sync {
    async fn read(&self, uri: &str, ctx: &HandlerContext) -> Result<Vec<ResourceContents>>;
}

/// Resource registry: descriptors in insertion order plus template listing
#[derive(Default)]
pub struct ResourceRegistry {
    resources: IndexMap<String, (ResourceDescriptor, Arc<dyn ResourceReader>)>,
    templates: Vec<ResourceTemplate>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ResourceDescriptor, reader: Arc<dyn ResourceReader>) {
        self.resources
            .insert(descriptor.uri.clone(), (descriptor, reader));
    }

    pub fn register_template(&mut self, template: ResourceTemplate) {
        self.templates.push(template);
    }

    pub fn list(&self) -> Vec<ResourceDescriptor> {
        self.resources
            .values()
            .map(|(descriptor, _)| descriptor.clone())
            .collect()
    }

    pub fn templates(&self) -> Vec<ResourceTemplate> {
        self.templates.clone()
    }

    /// Read a resource by exact URI
    pub async fn read(&self, uri: &str, ctx: &HandlerContext) -> Result<Vec<ResourceContents>> {
        let (_, reader) = self
            .resources
            .get(uri)
            .ok_or_else(|| CoreError::ResourceNotFound(uri.to_string()))?;
        reader.read(uri, ctx).await
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// A named prompt: descriptor plus handler
#[async_trait]
pub trait PromptHandler: Send + Sync {
    fn descriptor(&self) -> Prompt;
    async fn get(
        &self,
        args: serde_json::Map<String, Value>,
        ctx: &HandlerContext,
    ) -> Result<GetPromptResult>;
}

/// Prompt registry, insertion-ordered
#[derive(Default)]
pub struct PromptRegistry {
    prompts: IndexMap<String, Arc<dyn PromptHandler>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn PromptHandler>) {
        let name = handler.descriptor().name;
        self.prompts.insert(name, handler);
    }

    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.values().map(|h| h.descriptor()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn PromptHandler>> {
        self.prompts.get(name)
    }

    /// Check declared required arguments, then run the handler
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Map<String, Value>,
        ctx: &HandlerContext,
    ) -> Result<GetPromptResult> {
        let handler = self
            .prompts
            .get(name)
            .ok_or_else(|| CoreError::PromptNotFound(name.to_string()))?;

        if let Some(declared) = handler.descriptor().arguments {
            for argument in declared {
                if argument.required == Some(true) && !args.contains_key(&argument.name) {
                    return Err(CoreError::invalid_input(
                        argument.name,
                        "missing required argument",
                    ));
                }
            }
        }

        handler.get(args, ctx).await
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showcase_core::SessionRegistry;
    use tokio::sync::mpsc;

    struct UpperTool;

    #[async_trait]
    impl ToolHandler for UpperTool {
        fn descriptor(&self) -> Tool {
            Tool {
                name: "upper".to_string(),
                description: Some("Uppercases a message".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"],
                }),
            }
        }

        async fn call(&self, args: Value, _ctx: &HandlerContext) -> Result<CallToolResult> {
            let message = args["message"].as_str().unwrap_or_default();
            Ok(CallToolResult::text(message.to_uppercase()))
        }
    }

    fn context() -> HandlerContext {
        let broker = Arc::new(RequestBroker::new());
        let registry = SessionRegistry::new(broker.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        HandlerContext::new(registry.create(tx), broker)
    }

    #[tokio::test]
    async fn test_invoke_validates_before_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));

        let err = registry
            .invoke("upper", json!({}), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));

        let result = registry
            .invoke("upper", json!({"message": "hi"}), &context())
            .await
            .unwrap();
        match &result.content[0] {
            crate::protocol::Content::Text { text, .. } => assert_eq!(text, "HI"),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found_never_partial() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));

        for name in ["Upper", "UPPER", "upp", "upper2"] {
            let err = registry
                .invoke(name, json!({"message": "x"}), &context())
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::ToolNotFound(_)), "{name}");
        }
    }

    #[test]
    fn test_listing_preserves_insertion_order() {
        struct Named(&'static str);

        #[async_trait]
        impl ToolHandler for Named {
            fn descriptor(&self) -> Tool {
                Tool {
                    name: self.0.to_string(),
                    description: None,
                    input_schema: json!({"type": "object"}),
                }
            }
            async fn call(&self, _: Value, _: &HandlerContext) -> Result<CallToolResult> {
                Ok(CallToolResult::text(""))
            }
        }

        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(Arc::new(Named(name)));
        }

        let names: Vec<String> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
