//! Demo prompts

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use showcase_core::{CoreError, Result};

use super::{resources, TINY_IMAGE_PNG};
use crate::protocol::{
    Content, GetPromptResult, Prompt, PromptArgument, PromptMessage, Role,
};
use crate::registry::{HandlerContext, PromptHandler, PromptRegistry};

/// Build the prompt registry with every demo prompt
pub fn build_registry() -> PromptRegistry {
    let mut registry = PromptRegistry::new();
    registry.register(Arc::new(SimplePrompt));
    registry.register(Arc::new(ComplexPrompt));
    registry.register(Arc::new(ResourcePrompt));
    registry.register(Arc::new(GreetingPrompt));
    registry
}

fn arg_text(args: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    args.get(name).map(|value| match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// simple_prompt
// ---------------------------------------------------------------------------

struct SimplePrompt;

#[async_trait]
impl PromptHandler for SimplePrompt {
    fn descriptor(&self) -> Prompt {
        Prompt {
            name: "simple_prompt".to_string(),
            description: Some("A prompt without arguments".to_string()),
            arguments: None,
        }
    }

    async fn get(
        &self,
        _args: serde_json::Map<String, Value>,
        _ctx: &HandlerContext,
    ) -> Result<GetPromptResult> {
        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage {
                role: Role::User,
                content: Content::text("This is a simple prompt without arguments."),
            }],
        })
    }
}

// ---------------------------------------------------------------------------
// complex_prompt
// ---------------------------------------------------------------------------

struct ComplexPrompt;

#[async_trait]
impl PromptHandler for ComplexPrompt {
    fn descriptor(&self) -> Prompt {
        Prompt {
            name: "complex_prompt".to_string(),
            description: Some("A prompt with arguments".to_string()),
            arguments: Some(vec![
                PromptArgument {
                    name: "temperature".to_string(),
                    description: Some("Temperature setting".to_string()),
                    required: Some(true),
                },
                PromptArgument {
                    name: "style".to_string(),
                    description: Some("Output style".to_string()),
                    required: Some(false),
                },
            ]),
        }
    }

    async fn get(
        &self,
        args: serde_json::Map<String, Value>,
        _ctx: &HandlerContext,
    ) -> Result<GetPromptResult> {
        let temperature = arg_text(&args, "temperature").unwrap_or_default();
        let style = arg_text(&args, "style").unwrap_or_default();

        Ok(GetPromptResult {
            description: None,
            messages: vec![
                PromptMessage {
                    role: Role::User,
                    content: Content::text(format!(
                        "This is a complex prompt with arguments: temperature={}, style={}",
                        temperature, style
                    )),
                },
                PromptMessage {
                    role: Role::Assistant,
                    content: Content::text(
                        "I understand. You've provided a complex prompt with temperature and \
                         style arguments. How would you like me to proceed?",
                    ),
                },
                PromptMessage {
                    role: Role::User,
                    content: Content::image(TINY_IMAGE_PNG, "image/png"),
                },
            ],
        })
    }
}

// ---------------------------------------------------------------------------
// resource_prompt
// ---------------------------------------------------------------------------

struct ResourcePrompt;

#[async_trait]
impl PromptHandler for ResourcePrompt {
    fn descriptor(&self) -> Prompt {
        Prompt {
            name: "resource_prompt".to_string(),
            description: Some("A prompt that includes an embedded resource reference".to_string()),
            arguments: Some(vec![PromptArgument {
                name: "resourceId".to_string(),
                description: Some("Resource ID to include (1-100)".to_string()),
                required: Some(true),
            }]),
        }
    }

    async fn get(
        &self,
        args: serde_json::Map<String, Value>,
        _ctx: &HandlerContext,
    ) -> Result<GetPromptResult> {
        let raw = arg_text(&args, "resourceId").unwrap_or_default();
        let resource_id: usize = raw.parse().map_err(|_| {
            CoreError::invalid_input(
                "resourceId",
                format!("Invalid resourceId: {}. Must be a number between 1 and 100.", raw),
            )
        })?;

        let (_, contents) = resources::static_resource(resource_id).ok_or_else(|| {
            CoreError::invalid_input(
                "resourceId",
                format!(
                    "Invalid resourceId: {}. Must be a number between 1 and 100.",
                    resource_id
                ),
            )
        })?;

        Ok(GetPromptResult {
            description: None,
            messages: vec![
                PromptMessage {
                    role: Role::User,
                    content: Content::text(format!(
                        "This prompt includes Resource {}. Please analyze the following resource:",
                        resource_id
                    )),
                },
                PromptMessage {
                    role: Role::User,
                    content: Content::Resource { resource: contents },
                },
            ],
        })
    }
}

// ---------------------------------------------------------------------------
// greeting_prompt
// ---------------------------------------------------------------------------

struct GreetingPrompt;

#[async_trait]
impl PromptHandler for GreetingPrompt {
    fn descriptor(&self) -> Prompt {
        Prompt {
            name: "greeting_prompt".to_string(),
            description: Some("Greet the user by their name".to_string()),
            arguments: None,
        }
    }

    async fn get(
        &self,
        _args: serde_json::Map<String, Value>,
        ctx: &HandlerContext,
    ) -> Result<GetPromptResult> {
        let result = ctx
            .elicit(
                "Please input your name",
                json!({
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                }),
            )
            .await?;

        let text = match result.str_field("name") {
            Some(name) => format!("Please greet me by my name:\n\n{}", name),
            None => "I am unnamed :p".to_string(),
        };

        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage {
                role: Role::User,
                content: Content::text(text),
            }],
        })
    }
}
