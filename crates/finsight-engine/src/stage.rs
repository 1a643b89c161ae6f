//! The fixed analysis stage graph
//!
//! Stages form a closed set: every stage is a variant of [`StageId`], carrying
//! its dependency list and its optional/best-effort classification, so an
//! unhandled stage is a compile error rather than a runtime string-lookup
//! fallback. The graph itself is fixed; callers can only toggle the two
//! feature-flagged stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one analysis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageId {
    Planning,
    Profitability,
    BalanceSheet,
    CashFlow,
    TrendInterpretation,
    EarningsQuality,
    Risk,
    BusinessInsight,
    BusinessModel,
    Forecast,
    Valuation,
    FinalConclusion,
}

impl StageId {
    /// All stages in graph order
    pub const ALL: [StageId; 12] = [
        StageId::Planning,
        StageId::Profitability,
        StageId::BalanceSheet,
        StageId::CashFlow,
        StageId::TrendInterpretation,
        StageId::EarningsQuality,
        StageId::Risk,
        StageId::BusinessInsight,
        StageId::BusinessModel,
        StageId::Forecast,
        StageId::Valuation,
        StageId::FinalConclusion,
    ];

    /// Stages this stage must wait for
    ///
    /// Dependencies on the fetched dataset itself are implicit: the dataset is
    /// in place before any stage starts.
    pub fn dependencies(self) -> &'static [StageId] {
        match self {
            StageId::Planning
            | StageId::Profitability
            | StageId::BalanceSheet
            | StageId::CashFlow => &[],
            StageId::TrendInterpretation | StageId::EarningsQuality => &[
                StageId::Profitability,
                StageId::BalanceSheet,
                StageId::CashFlow,
            ],
            StageId::Risk => &[
                StageId::BalanceSheet,
                StageId::CashFlow,
                StageId::EarningsQuality,
            ],
            StageId::BusinessInsight => &[StageId::Profitability],
            StageId::BusinessModel => &[StageId::BusinessInsight],
            StageId::Forecast => &[StageId::Profitability, StageId::BusinessInsight],
            StageId::Valuation => &[StageId::Profitability, StageId::BalanceSheet],
            StageId::FinalConclusion => &[
                StageId::Planning,
                StageId::TrendInterpretation,
                StageId::Profitability,
                StageId::BalanceSheet,
                StageId::CashFlow,
                StageId::EarningsQuality,
                StageId::Risk,
                StageId::BusinessInsight,
                StageId::BusinessModel,
                StageId::Forecast,
                StageId::Valuation,
            ],
        }
    }

    /// Whether the stage only runs when its feature flag is set
    pub fn is_optional(self) -> bool {
        matches!(self, StageId::BusinessModel | StageId::Forecast)
    }

    /// Whether a failure of this stage is caught and downgraded to an absent
    /// result instead of aborting the run
    pub fn is_best_effort(self) -> bool {
        matches!(self, StageId::TrendInterpretation)
    }

    /// Stable wire name, also used in progress reports
    pub fn as_str(self) -> &'static str {
        match self {
            StageId::Planning => "PLANNING",
            StageId::Profitability => "PROFITABILITY",
            StageId::BalanceSheet => "BALANCE_SHEET",
            StageId::CashFlow => "CASH_FLOW",
            StageId::TrendInterpretation => "TREND_INTERPRETATION",
            StageId::EarningsQuality => "EARNINGS_QUALITY",
            StageId::Risk => "RISK",
            StageId::BusinessInsight => "BUSINESS_INSIGHT",
            StageId::BusinessModel => "BUSINESS_MODEL",
            StageId::Forecast => "FORECAST",
            StageId::Valuation => "VALUATION",
            StageId::FinalConclusion => "FINAL_CONCLUSION",
        }
    }

    /// Human-readable label for progress display
    pub fn label(self) -> &'static str {
        match self {
            StageId::Planning => "Analysis planning",
            StageId::Profitability => "Income statement analysis",
            StageId::BalanceSheet => "Balance sheet analysis",
            StageId::CashFlow => "Cash flow analysis",
            StageId::TrendInterpretation => "Trend interpretation",
            StageId::EarningsQuality => "Earnings quality analysis",
            StageId::Risk => "Risk assessment",
            StageId::BusinessInsight => "Business insight",
            StageId::BusinessModel => "Business model analysis",
            StageId::Forecast => "Earnings forecast",
            StageId::Valuation => "Valuation assessment",
            StageId::FinalConclusion => "Investment conclusion",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution phases of the fixed graph, in order
///
/// Stages inside one phase have no dependencies on each other and may run
/// concurrently; a phase only starts after every stage of the previous phase
/// has produced a result (or the run has been aborted).
pub const PHASES: [&[StageId]; 8] = [
    &[StageId::Planning],
    &[StageId::Profitability, StageId::BalanceSheet, StageId::CashFlow],
    &[StageId::TrendInterpretation],
    &[StageId::EarningsQuality],
    &[StageId::Risk, StageId::BusinessInsight],
    &[StageId::BusinessModel, StageId::Forecast],
    &[StageId::Valuation],
    &[StageId::FinalConclusion],
];
