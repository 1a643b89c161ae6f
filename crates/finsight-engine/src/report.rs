//! Report and stage result types

use crate::stage::StageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of filing a run analyzes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Quarterly,
    Annual,
}

/// Outcome quality of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// The model reply parsed into the stage's documented schema
    Success,
    /// Nothing parsed; the payload carries the raw model text
    Degraded,
}

/// Result of one completed stage
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: StageId,
    pub status: StageStatus,
    /// Key-value record matching the stage's documented schema, or the
    /// raw-text fallback when degraded
    pub payload: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl StageResult {
    /// Payload serialized for embedding in downstream stage prompts
    pub fn payload_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.payload).unwrap_or_default()
    }
}

/// Provenance of the analyzed data, for auditability
#[derive(Debug, Clone, Serialize)]
pub struct DataSourceInfo {
    /// Label of the backing data service
    pub provider: String,
    /// Most recent reporting periods observed, formatted, newest first
    pub report_periods: Vec<String>,
    /// Formatted latest reporting period
    pub latest_period: String,
    /// Most recent filing announcement dates, newest first
    pub announcement_dates: Vec<String>,
    pub disclaimer: String,
}

/// Aggregate analysis report for one run
///
/// Optional stages are present only when their flag was set for the run; the
/// trend interpretation is additionally absent when its best-effort execution
/// failed.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub company_code: String,
    pub company_name: String,
    pub report_type: ReportType,
    /// Formatted latest observed period, or the caller's requested period
    /// when the dataset had none
    pub report_period: String,
    pub data_source: DataSourceInfo,

    pub planning: StageResult,
    pub profitability: StageResult,
    pub balance_sheet: StageResult,
    pub cash_flow: StageResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_interpretation: Option<StageResult>,
    pub earnings_quality: StageResult,
    pub risk: StageResult,
    pub business_insight: StageResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_model: Option<StageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<StageResult>,
    pub valuation: StageResult,
    pub final_conclusion: StageResult,

    pub execution_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_result_serializes_wire_names() {
        let mut payload = Map::new();
        payload.insert("summary".to_string(), json!("ok"));
        let result = StageResult {
            stage: StageId::CashFlow,
            status: StageStatus::Success,
            payload,
            timestamp: Utc::now(),
            elapsed_ms: 12,
        };

        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["stage"], json!("CASH_FLOW"));
        assert_eq!(value["status"], json!("success"));
        assert_eq!(value["payload"]["summary"], json!("ok"));
    }

    #[test]
    fn test_payload_pretty_is_valid_json() {
        let mut payload = Map::new();
        payload.insert("n".to_string(), json!(1));
        let result = StageResult {
            stage: StageId::Risk,
            status: StageStatus::Degraded,
            payload,
            timestamp: Utc::now(),
            elapsed_ms: 0,
        };
        let text = result.payload_pretty();
        let back: Value = serde_json::from_str(&text).expect("round trip");
        assert_eq!(back["n"], json!(1));
    }
}
