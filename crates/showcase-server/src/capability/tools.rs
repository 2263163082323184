//! Demo tools
//!
//! The plain ones (echo, add, printEnv, getTinyImage, annotatedMessage,
//! getResourceReference) compute their result directly. The interactive ones
//! (greeting, contact-info, startElicitation, sampleLLM) suspend on a broker
//! round trip to the client and resume when the reply arrives.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use showcase_core::{CoreError, Result};

use super::{resources, TINY_IMAGE_PNG};
use crate::protocol::{
    Annotations, CallToolResult, Content, CreateMessageParams, ElicitAction, Role,
    SamplingMessage, Tool,
};
use crate::registry::{HandlerContext, ToolHandler, ToolRegistry};

/// Build the tool registry with every demo tool
pub fn build_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(AddTool));
    registry.register(Arc::new(PrintEnvTool));
    registry.register(Arc::new(LongRunningOperationTool));
    registry.register(Arc::new(SampleLlmTool));
    registry.register(Arc::new(GetTinyImageTool));
    registry.register(Arc::new(AnnotatedMessageTool));
    registry.register(Arc::new(GetResourceReferenceTool));
    registry.register(Arc::new(GreetingTool));
    registry.register(Arc::new(ContactInfoTool));
    registry.register(Arc::new(StartElicitationTool));
    registry
}

fn decode_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|err| CoreError::HandlerFailed(format!("argument decode failed: {}", err)))
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoTool;

#[derive(Deserialize)]
struct EchoArgs {
    message: String,
}

#[async_trait]
impl ToolHandler for EchoTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "echo".to_string(),
            description: Some("Echoes back the input!".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string", "description": "Message to echo" },
                },
                "required": ["message"],
            }),
        }
    }

    async fn call(&self, args: Value, _ctx: &HandlerContext) -> Result<CallToolResult> {
        let args: EchoArgs = decode_args(args)?;
        Ok(CallToolResult::text(format!("Echo: {}", args.message)))
    }
}

// ---------------------------------------------------------------------------
// add
// ---------------------------------------------------------------------------

struct AddTool;

#[derive(Deserialize)]
struct AddArgs {
    a: f64,
    b: f64,
}

#[async_trait]
impl ToolHandler for AddTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "add".to_string(),
            description: Some("Adds two numbers".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "a": { "type": "number", "description": "First number" },
                    "b": { "type": "number", "description": "Second number" },
                },
                "required": ["a", "b"],
            }),
        }
    }

    async fn call(&self, args: Value, _ctx: &HandlerContext) -> Result<CallToolResult> {
        let args: AddArgs = decode_args(args)?;
        Ok(CallToolResult::text(format!(
            "The sum of {} and {} is {}.",
            args.a,
            args.b,
            args.a + args.b
        )))
    }
}

// ---------------------------------------------------------------------------
// printEnv
// ---------------------------------------------------------------------------

struct PrintEnvTool;

#[async_trait]
impl ToolHandler for PrintEnvTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "printEnv".to_string(),
            description: Some(
                "Prints all environment variables, helpful for debugging MCP server configuration"
                    .to_string(),
            ),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: Value, _ctx: &HandlerContext) -> Result<CallToolResult> {
        let env: serde_json::Map<String, Value> = std::env::vars()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Ok(CallToolResult::text(serde_json::to_string_pretty(&env)?))
    }
}

// ---------------------------------------------------------------------------
// longRunningOperation
// ---------------------------------------------------------------------------

struct LongRunningOperationTool;

#[derive(Deserialize)]
struct LongRunningArgs {
    #[serde(default = "default_duration")]
    duration: f64,
    #[serde(default = "default_steps")]
    steps: u64,
}

fn default_duration() -> f64 {
    10.0
}

fn default_steps() -> u64 {
    5
}

#[async_trait]
impl ToolHandler for LongRunningOperationTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "longRunningOperation".to_string(),
            description: Some(
                "Demonstrates a long running operation with progress updates".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "duration": {
                        "type": "number",
                        "description": "Duration of the operation in seconds",
                        "minimum": 0,
                    },
                    "steps": {
                        "type": "integer",
                        "description": "Number of steps in the operation",
                        "minimum": 1,
                    },
                },
            }),
        }
    }

    async fn call(&self, args: Value, ctx: &HandlerContext) -> Result<CallToolResult> {
        let args: LongRunningArgs = decode_args(args)?;
        let step_duration = args.duration / args.steps as f64;

        for step in 1..=args.steps {
            tokio::time::sleep(Duration::from_secs_f64(step_duration)).await;
            ctx.progress(step, args.steps);
        }

        Ok(CallToolResult::text(format!(
            "Long running operation completed. Duration: {} seconds, Steps: {}.",
            args.duration, args.steps
        )))
    }
}

// ---------------------------------------------------------------------------
// sampleLLM
// ---------------------------------------------------------------------------

struct SampleLlmTool;

#[derive(Deserialize)]
struct SampleLlmArgs {
    prompt: String,
    #[serde(rename = "maxTokens", default = "default_max_tokens")]
    max_tokens: u64,
}

fn default_max_tokens() -> u64 {
    100
}

#[async_trait]
impl ToolHandler for SampleLlmTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "sampleLLM".to_string(),
            description: Some("Samples from an LLM using MCP's sampling feature".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "The prompt to send to the LLM",
                    },
                    "maxTokens": {
                        "type": "integer",
                        "description": "Maximum number of tokens to generate",
                        "minimum": 1,
                    },
                },
                "required": ["prompt"],
            }),
        }
    }

    async fn call(&self, args: Value, ctx: &HandlerContext) -> Result<CallToolResult> {
        let args: SampleLlmArgs = decode_args(args)?;

        let result = ctx
            .sample(CreateMessageParams {
                messages: vec![SamplingMessage {
                    role: Role::User,
                    content: Content::text(args.prompt),
                }],
                model_preferences: None,
                system_prompt: Some("You are a helpful assistant.".to_string()),
                max_tokens: args.max_tokens,
            })
            .await?;

        let text = match result.content {
            Content::Text { text, .. } => text,
            other => format!("{:?}", other),
        };
        Ok(CallToolResult::text(format!(
            "LLM sampling result: {}",
            text
        )))
    }
}

// ---------------------------------------------------------------------------
// getTinyImage
// ---------------------------------------------------------------------------

struct GetTinyImageTool;

#[async_trait]
impl ToolHandler for GetTinyImageTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "getTinyImage".to_string(),
            description: Some("Returns a tiny demo image".to_string()),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: Value, _ctx: &HandlerContext) -> Result<CallToolResult> {
        Ok(CallToolResult {
            content: vec![
                Content::text("This is a tiny image:"),
                Content::image(TINY_IMAGE_PNG, "image/png"),
                Content::text("The image above is a 1x1 transparent PNG."),
            ],
            is_error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// annotatedMessage
// ---------------------------------------------------------------------------

struct AnnotatedMessageTool;

#[derive(Deserialize)]
struct AnnotatedMessageArgs {
    #[serde(rename = "messageType")]
    message_type: String,
    #[serde(rename = "includeImage", default)]
    include_image: bool,
}

#[async_trait]
impl ToolHandler for AnnotatedMessageTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "annotatedMessage".to_string(),
            description: Some(
                "Demonstrates how annotations can be used to provide metadata about content"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "messageType": {
                        "type": "string",
                        "enum": ["error", "success", "debug"],
                        "description": "Type of message to demonstrate different annotation patterns",
                    },
                    "includeImage": {
                        "type": "boolean",
                        "description": "Whether to include an example image",
                    },
                },
                "required": ["messageType"],
            }),
        }
    }

    async fn call(&self, args: Value, _ctx: &HandlerContext) -> Result<CallToolResult> {
        let args: AnnotatedMessageArgs = decode_args(args)?;

        let mut content = Vec::new();
        match args.message_type.as_str() {
            "error" => content.push(Content::text("Error: Operation failed").with_annotations(
                Annotations {
                    audience: Some(vec![Role::User, Role::Assistant]),
                    priority: Some(1.0),
                },
            )),
            "success" => content.push(
                Content::text("Operation completed successfully").with_annotations(Annotations {
                    audience: Some(vec![Role::User]),
                    priority: Some(0.7),
                }),
            ),
            _ => content.push(
                Content::text("Debug: Cache hit ratio 0.95, latency 150ms").with_annotations(
                    Annotations {
                        audience: Some(vec![Role::Assistant]),
                        priority: Some(0.3),
                    },
                ),
            ),
        }

        if args.include_image {
            content.push(
                Content::image(TINY_IMAGE_PNG, "image/png").with_annotations(Annotations {
                    audience: Some(vec![Role::User]),
                    priority: Some(0.5),
                }),
            );
        }

        Ok(CallToolResult {
            content,
            is_error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// getResourceReference
// ---------------------------------------------------------------------------

struct GetResourceReferenceTool;

#[derive(Deserialize)]
struct GetResourceReferenceArgs {
    #[serde(rename = "resourceId")]
    resource_id: usize,
}

#[async_trait]
impl ToolHandler for GetResourceReferenceTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "getResourceReference".to_string(),
            description: Some(
                "Returns a resource reference that can be used by MCP clients".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "resourceId": {
                        "type": "integer",
                        "description": "ID of the resource to reference (1-100)",
                        "minimum": 1,
                        "maximum": 100,
                    },
                },
                "required": ["resourceId"],
            }),
        }
    }

    async fn call(&self, args: Value, _ctx: &HandlerContext) -> Result<CallToolResult> {
        let args: GetResourceReferenceArgs = decode_args(args)?;

        let (_, contents) = resources::static_resource(args.resource_id).ok_or_else(|| {
            CoreError::HandlerFailed(format!(
                "Resource with ID {} does not exist",
                args.resource_id
            ))
        })?;
        let uri = contents.uri.clone();

        Ok(CallToolResult {
            content: vec![
                Content::text(format!(
                    "Returning resource reference for Resource {}:",
                    args.resource_id
                )),
                Content::Resource { resource: contents },
                Content::text(format!(
                    "You can access this resource using the URI: {}",
                    uri
                )),
            ],
            is_error: None,
        })
    }
}

// ---------------------------------------------------------------------------
// greeting
// ---------------------------------------------------------------------------

struct GreetingTool;

#[async_trait]
impl ToolHandler for GreetingTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "greeting".to_string(),
            description: Some("Greet the user".to_string()),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: Value, ctx: &HandlerContext) -> Result<CallToolResult> {
        let result = ctx
            .elicit(
                "Please input your name",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "The name of the user",
                        },
                    },
                    "required": ["name"],
                }),
            )
            .await?;

        let name = result.str_field("name").unwrap_or("Stranger");
        Ok(CallToolResult::text(format!("Hello {}", name)))
    }
}

// ---------------------------------------------------------------------------
// contact-info
// ---------------------------------------------------------------------------

struct ContactInfoTool;

#[async_trait]
impl ToolHandler for ContactInfoTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "contact-info".to_string(),
            description: Some("Collect user contact information".to_string()),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: Value, ctx: &HandlerContext) -> Result<CallToolResult> {
        let result = ctx
            .elicit(
                "Please provide your contact information",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Your full name",
                        },
                        "email": {
                            "type": "string",
                            "format": "email",
                            "description": "Your email address",
                        },
                        "age": {
                            "type": "number",
                            "minimum": 18,
                            "description": "Your age",
                        },
                    },
                    "required": ["name", "email"],
                }),
            )
            .await?;

        let name = result.str_field("name").unwrap_or("Unknown");
        let email = result.str_field("email").unwrap_or("No email provided");
        let age = result
            .field("age")
            .and_then(Value::as_f64)
            .map(|age| format!(", age {}", age))
            .unwrap_or_default();

        Ok(CallToolResult::text(format!(
            "Contact information received: {} ({}{})",
            name, email, age
        )))
    }
}

// ---------------------------------------------------------------------------
// startElicitation
// ---------------------------------------------------------------------------

struct StartElicitationTool;

#[async_trait]
impl ToolHandler for StartElicitationTool {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "startElicitation".to_string(),
            description: Some(
                "Demonstrates the Elicitation feature by asking the user about their favorite color, number, and pets"
                    .to_string(),
            ),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _args: Value, ctx: &HandlerContext) -> Result<CallToolResult> {
        let result = ctx
            .elicit(
                "What are your favorite things?",
                json!({
                    "type": "object",
                    "properties": {
                        "color": { "type": "string", "description": "Favorite color" },
                        "number": {
                            "type": "integer",
                            "description": "Favorite number",
                            "minimum": 1,
                            "maximum": 100,
                        },
                        "pets": {
                            "type": "string",
                            "enum": ["cats", "dogs", "birds", "fish", "reptiles"],
                            "description": "Favorite pets",
                        },
                    },
                }),
            )
            .await?;

        let mut content = Vec::new();
        match result.action {
            ElicitAction::Accept => {
                content.push(Content::text("User provided their favorite things!"));
                let pick = |name: &str| {
                    result
                        .field(name)
                        .map(render_value)
                        .unwrap_or_else(|| "not specified".to_string())
                };
                content.push(Content::text(format!(
                    "Their favorites are:\n- Color: {}\n- Number: {}\n- Pets: {}",
                    pick("color"),
                    pick("number"),
                    pick("pets")
                )));
            }
            ElicitAction::Decline => {
                content.push(Content::text(
                    "User declined to provide their favorite things.",
                ));
            }
            ElicitAction::Cancel => {
                content.push(Content::text("User cancelled the elicitation dialog."));
            }
        }

        Ok(CallToolResult {
            content,
            is_error: None,
        })
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showcase_core::{RequestBroker, SessionRegistry};
    use tokio::sync::mpsc;

    fn context() -> HandlerContext {
        let broker = Arc::new(RequestBroker::new());
        let registry = SessionRegistry::new(broker.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        HandlerContext::new(registry.create(tx), broker)
    }

    fn text_of(result: &CallToolResult, index: usize) -> &str {
        match &result.content[index] {
            Content::Text { text, .. } => text,
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_echo() {
        let registry = build_registry();
        let result = registry
            .invoke("echo", json!({"message": "hello"}), &context())
            .await
            .unwrap();
        assert_eq!(text_of(&result, 0), "Echo: hello");
    }

    #[tokio::test]
    async fn test_add() {
        let registry = build_registry();
        let result = registry
            .invoke("add", json!({"a": 2, "b": 3}), &context())
            .await
            .unwrap();
        assert_eq!(text_of(&result, 0), "The sum of 2 and 3 is 5.");
    }

    #[tokio::test]
    async fn test_add_rejects_non_numeric_input() {
        let registry = build_registry();
        let err = registry
            .invoke("add", json!({"a": 2, "b": "three"}), &context())
            .await
            .unwrap_err();
        match err {
            CoreError::InvalidInput { path, .. } => assert_eq!(path, "b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_get_resource_reference_embeds_contents() {
        let registry = build_registry();
        let result = registry
            .invoke("getResourceReference", json!({"resourceId": 3}), &context())
            .await
            .unwrap();

        assert_eq!(result.content.len(), 3);
        match &result.content[1] {
            Content::Resource { resource } => {
                assert_eq!(resource.uri, "demo://static/resource/3");
                assert!(resource.text.as_ref().unwrap().contains("plaintext"));
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resource_reference_range_is_validated() {
        let registry = build_registry();
        let err = registry
            .invoke(
                "getResourceReference",
                json!({"resourceId": 101}),
                &context(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_annotated_message_shapes() {
        let registry = build_registry();
        let result = registry
            .invoke(
                "annotatedMessage",
                json!({"messageType": "error", "includeImage": true}),
                &context(),
            )
            .await
            .unwrap();

        assert_eq!(result.content.len(), 2);
        match &result.content[0] {
            Content::Text { annotations, .. } => {
                assert_eq!(annotations.as_ref().unwrap().priority, Some(1.0));
            }
            other => panic!("unexpected content: {other:?}"),
        }

        let err = registry
            .invoke("annotatedMessage", json!({"messageType": "panic"}), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_greeting_resolves_through_broker() {
        let broker = Arc::new(RequestBroker::new());
        let sessions = SessionRegistry::new(broker.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = sessions.create(tx);
        let ctx = HandlerContext::new(session, broker.clone());

        let registry = build_registry();
        let task = tokio::spawn(async move { registry.invoke("greeting", json!({}), &ctx).await });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope["method"], "elicitation/create");
        let id = envelope["id"].as_str().unwrap().to_string();
        broker.resolve(
            &id,
            showcase_core::BrokerReply::Result(json!({
                "action": "accept",
                "content": { "name": "Ada" },
            })),
        );

        let result = task.await.unwrap().unwrap();
        assert_eq!(text_of(&result, 0), "Hello Ada");
    }

    #[tokio::test]
    async fn test_greeting_decline_falls_back_to_stranger() {
        let broker = Arc::new(RequestBroker::new());
        let sessions = SessionRegistry::new(broker.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = sessions.create(tx);
        let ctx = HandlerContext::new(session, broker.clone());

        let registry = build_registry();
        let task = tokio::spawn(async move { registry.invoke("greeting", json!({}), &ctx).await });

        let envelope = rx.recv().await.unwrap();
        let id = envelope["id"].as_str().unwrap().to_string();
        broker.resolve(
            &id,
            showcase_core::BrokerReply::Result(json!({ "action": "decline" })),
        );

        let result = task.await.unwrap().unwrap();
        assert_eq!(text_of(&result, 0), "Hello Stranger");
    }

    #[tokio::test]
    async fn test_sample_llm_round_trip() {
        let broker = Arc::new(RequestBroker::new());
        let sessions = SessionRegistry::new(broker.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = sessions.create(tx);
        let ctx = HandlerContext::new(session, broker.clone());

        let registry = build_registry();
        let task = tokio::spawn(async move {
            registry
                .invoke("sampleLLM", json!({"prompt": "say hi"}), &ctx)
                .await
        });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope["method"], "sampling/createMessage");
        assert_eq!(envelope["params"]["maxTokens"], 100);
        let id = envelope["id"].as_str().unwrap().to_string();
        broker.resolve(
            &id,
            showcase_core::BrokerReply::Result(json!({
                "role": "assistant",
                "content": { "type": "text", "text": "hi there" },
                "model": "demo-model",
            })),
        );

        let result = task.await.unwrap().unwrap();
        assert_eq!(text_of(&result, 0), "LLM sampling result: hi there");
    }
}
