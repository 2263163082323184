//! Demo capability bodies: tools, resources, and prompts

pub mod prompts;
pub mod resources;
pub mod tools;

use indexmap::IndexMap;

use showcase_core::CompletionEngine;

/// A 1x1 transparent PNG, used by the image-bearing demo tools and prompts
pub const TINY_IMAGE_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

/// Completion vocabularies: static resource ids plus the fixed per-argument
/// candidate lists for prompt arguments.
pub fn completions() -> CompletionEngine {
    let mut prompt_arguments = IndexMap::new();
    prompt_arguments.insert(
        "style".to_string(),
        ["casual", "formal", "technical", "friendly"]
            .map(String::from)
            .to_vec(),
    );
    prompt_arguments.insert(
        "temperature".to_string(),
        ["0", "0.5", "0.7", "1.0"].map(String::from).to_vec(),
    );
    prompt_arguments.insert(
        "resourceId".to_string(),
        (1..=resources::STATIC_RESOURCE_COUNT)
            .map(|id| id.to_string())
            .collect(),
    );

    CompletionEngine::new(
        (1..=resources::STATIC_RESOURCE_COUNT)
            .map(|id| id.to_string())
            .collect(),
        prompt_arguments,
    )
}
