//! Argument completion for `completion/complete`
//!
//! Candidate sets are fixed at server start: resource-template references
//! complete over the known resource ids, prompt references over a
//! per-argument vocabulary. Filtering is a case-sensitive prefix match and
//! the result set is bounded, so `has_more` is always false.

use indexmap::IndexMap;

/// What a completion request refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReference {
    /// A resource template; candidates come from the known resource ids
    ResourceTemplate { uri: String },
    /// A prompt; candidates come from that argument's vocabulary
    Prompt { name: String },
}

/// Filtered, ordered candidate list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub values: Vec<String>,
    pub has_more: bool,
    pub total: usize,
}

impl Completion {
    fn from_values(values: Vec<String>) -> Self {
        Self {
            total: values.len(),
            has_more: false,
            values,
        }
    }
}

/// Completion engine over fixed candidate vocabularies
pub struct CompletionEngine {
    resource_ids: Vec<String>,
    prompt_arguments: IndexMap<String, Vec<String>>,
}

impl CompletionEngine {
    pub fn new(
        resource_ids: Vec<String>,
        prompt_arguments: IndexMap<String, Vec<String>>,
    ) -> Self {
        Self {
            resource_ids,
            prompt_arguments,
        }
    }

    /// Complete a partial argument value. An unknown argument name yields an
    /// empty result, never an error.
    pub fn complete(
        &self,
        reference: &CompletionReference,
        argument_name: &str,
        partial: &str,
    ) -> Completion {
        let candidates: &[String] = match reference {
            CompletionReference::ResourceTemplate { .. } => &self.resource_ids,
            CompletionReference::Prompt { .. } => match self.prompt_arguments.get(argument_name) {
                Some(values) => values,
                None => return Completion::default(),
            },
        };

        let values: Vec<String> = candidates
            .iter()
            .filter(|value| value.starts_with(partial))
            .cloned()
            .collect();

        Completion::from_values(values)
    }
}
