//! Completion client trait and request options

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Options for a single completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Model identifier (provider-specific)
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// Sampling temperature (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    /// Create a builder for completion options
    pub fn builder(model: impl Into<String>) -> CompletionOptionsBuilder {
        CompletionOptionsBuilder::new(model)
    }
}

/// Builder for CompletionOptions
pub struct CompletionOptionsBuilder {
    model: String,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl CompletionOptionsBuilder {
    /// Create a new builder
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    /// Set the maximum tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the completion options
    pub fn build(self) -> CompletionOptions {
        CompletionOptions {
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Trait for completion clients
///
/// Implementations of this trait provide access to an LLM completion service.
/// The engine consumes the full response text; it never inspects partial or
/// streamed output.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion and return the full response text
    ///
    /// # Arguments
    ///
    /// * `system_prompt` - System-origin instructions for the model
    /// * `user_prompt` - The per-call analysis request
    /// * `options` - Model id and sampling parameters
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String>;

    /// Get the client name (e.g., "vectorengine", "anthropic")
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = CompletionOptions::builder("analysis-standard-v1")
            .max_tokens(2048)
            .temperature(0.7)
            .build();

        assert_eq!(options.model, "analysis-standard-v1");
        assert_eq!(options.max_tokens, 2048);
        assert_eq!(options.temperature, Some(0.7));
    }

    #[test]
    fn test_builder_defaults() {
        let options = CompletionOptions::builder("m").build();
        assert_eq!(options.max_tokens, 4096);
        assert!(options.temperature.is_none());
    }

    struct EchoClient;

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn complete(
            &self,
            system_prompt: &str,
            user_prompt: &str,
            options: &CompletionOptions,
        ) -> Result<String> {
            Ok(format!("{system_prompt}|{user_prompt}|{}", options.model))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let client: Box<dyn CompletionClient> = Box::new(EchoClient);
        let options = CompletionOptions::builder("m1").build();
        let reply = client
            .complete("sys", "user", &options)
            .await
            .expect("echo completes");
        assert_eq!(reply, "sys|user|m1");
        assert_eq!(client.name(), "echo");
    }
}
