//! Engine configuration and per-stage model selection

use crate::error::{EngineError, Result};
use crate::stage::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Built-in default model id, used when nothing else is configured
pub const DEFAULT_MODEL: &str = "fin-analysis-standard";

/// Model tier preference for a stage
///
/// Tiers decouple stage configuration from concrete model ids, so swapping the
/// serving models does not touch per-stage settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPreference {
    /// Cheapest tier, for latency-sensitive or low-stakes stages
    Fast,
    /// Balanced default tier
    Standard,
    /// Strongest tier, for synthesis-heavy stages
    Advanced,
}

impl ModelPreference {
    /// Concrete model id served for this tier
    pub fn model_id(self) -> &'static str {
        match self {
            Self::Fast => "fin-analysis-fast",
            Self::Standard => DEFAULT_MODEL,
            Self::Advanced => "fin-analysis-pro",
        }
    }
}

/// Per-stage model tier overrides
pub type StageModelConfig = HashMap<StageId, ModelPreference>;

/// Per-stage user prompt overrides, merged by the composer
pub type StagePromptConfig = HashMap<StageId, String>;

/// Configuration of an orchestrator instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Instance default model id, used when a stage has no tier configured
    pub default_model: String,

    /// Per-stage model tier configuration
    pub stage_models: StageModelConfig,

    /// Per-stage user prompt overrides
    pub stage_prompts: StagePromptConfig,

    /// Cap on user prompt override length, in characters
    pub max_user_prompt_chars: usize,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            stage_models: StageModelConfig::new(),
            stage_prompts: StagePromptConfig::new(),
            max_user_prompt_chars: crate::compose::DEFAULT_MAX_OVERRIDE_CHARS,
            max_tokens: 4096,
            temperature: Some(0.7),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_model.trim().is_empty() {
            return Err(EngineError::Config(
                "default_model must not be empty".to_string(),
            ));
        }
        if self.max_user_prompt_chars == 0 {
            return Err(EngineError::Config(
                "max_user_prompt_chars must be greater than 0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the model id for a stage
    ///
    /// Priority: per-call override > instance stage tier > instance default
    /// model (which itself defaults to the built-in default).
    pub fn model_for_stage(
        &self,
        stage: StageId,
        overrides: Option<&StageModelConfig>,
    ) -> String {
        if let Some(pref) = overrides.and_then(|o| o.get(&stage)) {
            return pref.model_id().to_string();
        }
        if let Some(pref) = self.stage_models.get(&stage) {
            return pref.model_id().to_string();
        }
        self.default_model.clone()
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    default_model: Option<String>,
    stage_models: StageModelConfig,
    stage_prompts: StagePromptConfig,
    max_user_prompt_chars: Option<usize>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl EngineConfigBuilder {
    /// Set the instance default model id
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set the model tier for one stage
    pub fn stage_model(mut self, stage: StageId, preference: ModelPreference) -> Self {
        self.stage_models.insert(stage, preference);
        self
    }

    /// Set the user prompt override for one stage
    pub fn stage_prompt(mut self, stage: StageId, prompt: impl Into<String>) -> Self {
        self.stage_prompts.insert(stage, prompt.into());
        self
    }

    /// Set the user prompt override cap
    pub fn max_user_prompt_chars(mut self, cap: usize) -> Self {
        self.max_user_prompt_chars = Some(cap);
        self
    }

    /// Set max tokens per completion
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            default_model: self.default_model.unwrap_or(defaults.default_model),
            stage_models: self.stage_models,
            stage_prompts: self.stage_prompts,
            max_user_prompt_chars: self
                .max_user_prompt_chars
                .unwrap_or(defaults.max_user_prompt_chars),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.or(defaults.temperature),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::builder()
            .default_model("custom-model")
            .stage_model(StageId::FinalConclusion, ModelPreference::Advanced)
            .max_tokens(8192)
            .build()
            .expect("valid config");

        assert_eq!(config.default_model, "custom-model");
        assert_eq!(config.max_tokens, 8192);
    }

    #[test]
    fn test_validation_rejects_zero_cap() {
        let result = EngineConfig::builder().max_user_prompt_chars(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_model_resolution_priority() {
        let config = EngineConfig::builder()
            .default_model("instance-default")
            .stage_model(StageId::Risk, ModelPreference::Fast)
            .build()
            .expect("valid config");

        // Per-call override wins over everything.
        let mut per_call = StageModelConfig::new();
        per_call.insert(StageId::Risk, ModelPreference::Advanced);
        assert_eq!(
            config.model_for_stage(StageId::Risk, Some(&per_call)),
            "fin-analysis-pro"
        );

        // Instance stage tier wins over the instance default.
        assert_eq!(
            config.model_for_stage(StageId::Risk, None),
            "fin-analysis-fast"
        );

        // Unconfigured stage falls back to the instance default.
        assert_eq!(
            config.model_for_stage(StageId::Planning, None),
            "instance-default"
        );

        // And the instance default itself defaults to the built-in model.
        let plain = EngineConfig::default();
        assert_eq!(plain.model_for_stage(StageId::Planning, None), DEFAULT_MODEL);
    }
}
