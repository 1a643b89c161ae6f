//! Error taxonomy for the analysis engine
//!
//! Mandatory-stage failures and data-fetch failures abort a run and reach the
//! caller unmodified; the engine performs no retries of its own. Parse
//! recovery never surfaces as an error (the extractor degrades to a raw-text
//! payload instead), and cache failures are swallowed at the cache layer.

use crate::stage::StageId;
use finsight_data::DataError;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fetching the financial dataset failed; the run is aborted
    #[error("data fetch failed: {0}")]
    Data(#[from] DataError),

    /// A stage's completion call failed
    #[error("stage {stage} failed: {reason}")]
    Stage { stage: StageId, reason: String },

    /// The orchestrator was misconfigured; raised before any stage executes
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = EngineError::Stage {
            stage: StageId::Valuation,
            reason: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "stage VALUATION failed: timeout");
    }

    #[test]
    fn test_data_error_conversion() {
        let err: EngineError = DataError::InvalidCode("X".to_string()).into();
        assert!(matches!(err, EngineError::Data(_)));
    }
}
