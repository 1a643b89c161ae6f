//! The per-run bundle of fetched financial data

use crate::records::{
    BalanceRecord, CashFlowRecord, DailyValuationRecord, ExpressRecord, FinancialIndicatorRecord,
    ForecastRecord, IncomeRecord, SegmentRevenueRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything fetched for one analysis run
///
/// Assembled once at run start and never mutated afterwards; every stage reads
/// from the same snapshot. The three statement vectors are always populated by
/// a successful fetch; the advanced datasets may be empty for markets that do
/// not publish them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialDataset {
    pub income: Vec<IncomeRecord>,
    pub balance: Vec<BalanceRecord>,
    pub cash_flow: Vec<CashFlowRecord>,
    pub forecast: Vec<ForecastRecord>,
    pub express: Vec<ExpressRecord>,
    pub indicators: Vec<FinancialIndicatorRecord>,
    pub segments: Vec<SegmentRevenueRecord>,
    pub daily: Vec<DailyValuationRecord>,
}

impl FinancialDataset {
    /// Latest fiscal end date observed across income statements and
    /// indicators, in `YYYYMMDD` form
    ///
    /// Derived from the freshly fetched data on every run; callers must never
    /// substitute a user-supplied period here, since this value keys the
    /// trend-interpretation cache.
    pub fn latest_period(&self) -> Option<String> {
        self.income
            .iter()
            .map(|r| r.end_date.as_str())
            .chain(self.indicators.iter().map(|r| r.end_date.as_str()))
            .filter(|p| !p.is_empty())
            .max()
            .map(ToString::to_string)
    }

    /// Distinct fiscal end dates across the three statements, newest first
    pub fn observed_periods(&self) -> Vec<String> {
        let mut periods: BTreeSet<&str> = BTreeSet::new();
        for p in self.income.iter().map(|r| r.end_date.as_str()) {
            if !p.is_empty() {
                periods.insert(p);
            }
        }
        for p in self.balance.iter().map(|r| r.end_date.as_str()) {
            if !p.is_empty() {
                periods.insert(p);
            }
        }
        for p in self.cash_flow.iter().map(|r| r.end_date.as_str()) {
            if !p.is_empty() {
                periods.insert(p);
            }
        }
        periods.into_iter().rev().map(ToString::to_string).collect()
    }

    /// Distinct announcement dates across the three statements, newest first
    pub fn announcement_dates(&self) -> Vec<String> {
        let mut dates: BTreeSet<&str> = BTreeSet::new();
        for d in self.income.iter().filter_map(|r| r.ann_date.as_deref()) {
            dates.insert(d);
        }
        for d in self.balance.iter().filter_map(|r| r.ann_date.as_deref()) {
            dates.insert(d);
        }
        for d in self.cash_flow.iter().filter_map(|r| r.ann_date.as_deref()) {
            dates.insert(d);
        }
        dates.into_iter().rev().map(ToString::to_string).collect()
    }
}

/// Human-readable label for a `YYYYMMDD` fiscal end date
///
/// Quarter-end months map to the filing they close ("2024 FY", "2024 Q3",
/// "2024 H1", "2024 Q1"); anything else is passed through unchanged.
pub fn format_period(period: &str) -> String {
    if period.len() != 8 || !period.bytes().all(|b| b.is_ascii_digit()) {
        return period.to_string();
    }
    let year = &period[0..4];
    let month = &period[4..6];
    match month {
        "12" => format!("{year} FY"),
        "09" => format!("{year} Q3"),
        "06" => format!("{year} H1"),
        "03" => format!("{year} Q1"),
        _ => format!("{year}-{month}"),
    }
}
