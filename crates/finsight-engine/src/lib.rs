//! Financial report analysis engine
//!
//! This crate orchestrates a fixed pipeline of LLM-backed analysis stages
//! over a company's pre-fetched financial statements and assembles the
//! per-stage results into one multi-section report. It includes:
//!
//! - A closed stage graph with phase-barrier scheduling ([`StageId`],
//!   [`AnalysisOrchestrator`])
//! - Tolerant recovery of structured records from free-form model text
//!   ([`extract`])
//! - Safe composition of stage instructions from fixed templates plus
//!   optional user customization ([`PromptComposer`])
//! - A reporting-period-aligned cache for the trend-interpretation stage
//!   ([`TrendCache`])
//!
//! # Architecture
//!
//! The orchestrator drives eight phases in a strict order: planning, the
//! three statement analyses (concurrent), trend interpretation
//! (best-effort), earnings quality, risk plus business insight (concurrent),
//! the optional flagged stages, valuation, and the final conclusion. A
//! mandatory stage failure aborts the run; the engine never retries — that
//! policy belongs to the caller.
//!
//! The completion client, the financial data provider and the cache store
//! are external collaborators supplied as trait objects.
//!
//! # Example
//!
//! ```rust,ignore
//! use finsight_engine::{AnalysisOptions, AnalysisOrchestrator, ReportType};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = AnalysisOrchestrator::builder()
//!         .completion_client(Arc::new(client))
//!         .data_provider(Arc::new(provider))
//!         .build()?;
//!
//!     let options = AnalysisOptions::new("600519", "Subject One", ReportType::Annual);
//!     let report = orchestrator.analyze(&options).await?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod compose;
pub mod config;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod stage;

// Re-export main types for convenience
pub use cache::{CacheError, CacheStore, MemoryCacheStore, TrendCache, TrendCacheEntry};
pub use compose::PromptComposer;
pub use config::{EngineConfig, ModelPreference, StageModelConfig, StagePromptConfig};
pub use error::{EngineError, Result};
pub use extract::{ExtractedResult, ParseStrategy};
pub use orchestrator::{AnalysisOptions, AnalysisOrchestrator, OrchestratorBuilder};
pub use progress::{ProgressCallback, ProgressUpdate};
pub use report::{AnalysisReport, DataSourceInfo, ReportType, StageResult, StageStatus};
pub use stage::StageId;

// Re-export the collaborator seams
pub use finsight_data::{FinancialDataProvider, FinancialDataset};
pub use finsight_llm::{CompletionClient, CompletionOptions};
