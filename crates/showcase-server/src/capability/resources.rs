//! Demo resources
//!
//! One hundred generated resources live under `demo://static/resource/{id}`:
//! odd ids are plaintext, even ids are base64 blobs. `config://user` is a
//! greeting resource that elicits the reader's name through the broker.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;

use showcase_core::Result;

use crate::protocol::{ResourceContents, ResourceDescriptor, ResourceTemplate};
use crate::registry::{HandlerContext, ResourceReader, ResourceRegistry};

/// Number of generated static resources
pub const STATIC_RESOURCE_COUNT: usize = 100;

/// URI prefix of the static resource namespace
pub const STATIC_URI_PREFIX: &str = "demo://static/resource/";

/// URI of the generated resource with the given id
pub fn static_uri(id: usize) -> String {
    format!("{}{}", STATIC_URI_PREFIX, id)
}

fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Descriptor and contents of one generated resource, or None when the id is
/// outside 1..=100.
pub fn static_resource(id: usize) -> Option<(ResourceDescriptor, ResourceContents)> {
    if id == 0 || id > STATIC_RESOURCE_COUNT {
        return None;
    }

    let uri = static_uri(id);
    let name = format!("Resource {}", id);

    if id % 2 == 1 {
        let descriptor = ResourceDescriptor {
            uri: uri.clone(),
            name,
            description: None,
            mime_type: Some("text/plain".to_string()),
        };
        let contents = ResourceContents {
            uri,
            mime_type: Some("text/plain".to_string()),
            text: Some(format!("Resource {}: This is a plaintext resource", id)),
            blob: None,
        };
        Some((descriptor, contents))
    } else {
        let descriptor = ResourceDescriptor {
            uri: uri.clone(),
            name,
            description: None,
            mime_type: Some("application/octet-stream".to_string()),
        };
        let contents = ResourceContents {
            uri,
            mime_type: Some("application/octet-stream".to_string()),
            text: None,
            blob: Some(base64_encode(
                format!("Resource {}: This is a base64 blob", id).as_bytes(),
            )),
        };
        Some((descriptor, contents))
    }
}

/// Reader for the static resource namespace
struct StaticResourceReader;

#[async_trait]
impl ResourceReader for StaticResourceReader {
    async fn read(&self, uri: &str, _ctx: &HandlerContext) -> Result<Vec<ResourceContents>> {
        let id = uri
            .strip_prefix(STATIC_URI_PREFIX)
            .and_then(|rest| rest.parse::<usize>().ok())
            .unwrap_or(0);

        // registration guarantees the id is in range
        let (_, contents) = static_resource(id)
            .ok_or_else(|| showcase_core::CoreError::ResourceNotFound(uri.to_string()))?;
        Ok(vec![contents])
    }
}

/// Greeting resource: elicits the reader's name before answering
struct GreetingResource;

#[async_trait]
impl ResourceReader for GreetingResource {
    async fn read(&self, uri: &str, ctx: &HandlerContext) -> Result<Vec<ResourceContents>> {
        let result = ctx
            .elicit(
                "Please input your name",
                json!({
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                }),
            )
            .await?;

        let name = result.str_field("name").unwrap_or("Stranger").to_string();

        Ok(vec![ResourceContents {
            uri: uri.to_string(),
            mime_type: Some("text/plain".to_string()),
            text: Some(format!("Hello there, {}", name)),
            blob: None,
        }])
    }
}

/// Build the resource registry: greeting resource, the hundred static
/// resources, and the template over their namespace.
pub fn build_registry() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();

    registry.register(
        ResourceDescriptor {
            uri: "config://user".to_string(),
            name: "User Greeting".to_string(),
            description: Some("Greet the user".to_string()),
            mime_type: Some("text/plain".to_string()),
        },
        Arc::new(GreetingResource),
    );

    let reader: Arc<dyn ResourceReader> = Arc::new(StaticResourceReader);
    for id in 1..=STATIC_RESOURCE_COUNT {
        let (descriptor, _) = static_resource(id).unwrap();
        registry.register(descriptor, reader.clone());
    }

    registry.register_template(ResourceTemplate {
        uri_template: format!("{}{{id}}", STATIC_URI_PREFIX),
        name: "Static Resource".to_string(),
        description: Some("A static resource with a numeric ID".to_string()),
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_ids_are_plaintext_even_ids_are_blobs() {
        let (descriptor, contents) = static_resource(1).unwrap();
        assert_eq!(descriptor.mime_type.as_deref(), Some("text/plain"));
        assert!(contents.text.unwrap().contains("plaintext"));
        assert!(contents.blob.is_none());

        let (descriptor, contents) = static_resource(2).unwrap();
        assert_eq!(
            descriptor.mime_type.as_deref(),
            Some("application/octet-stream")
        );
        assert!(contents.text.is_none());
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(contents.blob.unwrap())
            .unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            "Resource 2: This is a base64 blob"
        );
    }

    #[test]
    fn test_ids_outside_range_do_not_exist() {
        assert!(static_resource(0).is_none());
        assert!(static_resource(101).is_none());
    }

    #[test]
    fn test_registry_lists_greeting_then_statics() {
        let registry = build_registry();
        let listed = registry.list();

        assert_eq!(listed.len(), STATIC_RESOURCE_COUNT + 1);
        assert_eq!(listed[0].uri, "config://user");
        assert_eq!(listed[1].uri, static_uri(1));
        assert_eq!(listed[100].uri, static_uri(100));

        let templates = registry.templates();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].uri_template, "demo://static/resource/{id}");
    }
}
