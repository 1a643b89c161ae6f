//! Financial data model and provider abstraction for finsight
//!
//! This crate defines the statement record types the analysis engine consumes,
//! the [`FinancialDataProvider`] trait implemented by exchange-specific
//! backends, and the [`FinancialDataset`] bundle fetched once at the start of
//! an analysis run and treated as read-only afterwards.

pub mod dataset;
pub mod error;
pub mod provider;
pub mod records;

pub use dataset::{FinancialDataset, format_period};
pub use error::{DataError, Result};
pub use provider::FinancialDataProvider;
pub use records::{
    BalanceRecord, CashFlowRecord, DailyValuationRecord, ExpressRecord, FinancialIndicatorRecord,
    ForecastRecord, IncomeRecord, Market, SegmentRevenueRecord, StockBasic,
};
