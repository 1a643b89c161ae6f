//! Financial data provider trait

use crate::Result;
use crate::records::{
    BalanceRecord, CashFlowRecord, DailyValuationRecord, ExpressRecord, FinancialIndicatorRecord,
    ForecastRecord, IncomeRecord, SegmentRevenueRecord, StockBasic,
};
use async_trait::async_trait;

/// Trait for exchange-specific financial data backends
///
/// Implementations route to whatever wire service covers the market a company
/// trades on. Fetchers return the most recent records first. The `period`
/// argument, when present, restricts results to filings up to that fiscal end
/// date (`YYYYMMDD`); advanced datasets may legitimately come back empty for
/// markets that do not publish them.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Human-readable label of the backing data service, used in report
    /// provenance blocks
    fn name(&self) -> &str;

    async fn get_income_statement(
        &self,
        code: &str,
        period: Option<&str>,
    ) -> Result<Vec<IncomeRecord>>;

    async fn get_balance_sheet(
        &self,
        code: &str,
        period: Option<&str>,
    ) -> Result<Vec<BalanceRecord>>;

    async fn get_cash_flow(&self, code: &str, period: Option<&str>)
    -> Result<Vec<CashFlowRecord>>;

    /// Management earnings forecasts
    async fn get_forecast(&self, code: &str) -> Result<Vec<ForecastRecord>>;

    /// Earnings flashes published ahead of full filings
    async fn get_express(&self, code: &str) -> Result<Vec<ExpressRecord>>;

    /// Derived financial ratios
    async fn get_financial_indicators(
        &self,
        code: &str,
        period: Option<&str>,
    ) -> Result<Vec<FinancialIndicatorRecord>>;

    /// Per-segment revenue composition
    async fn get_segment_revenue(
        &self,
        code: &str,
        period: Option<&str>,
    ) -> Result<Vec<SegmentRevenueRecord>>;

    /// Daily market valuation metrics, most recent trading day first
    async fn get_daily_valuation(&self, code: &str) -> Result<Vec<DailyValuationRecord>>;

    /// Listing information, including the industry classification
    async fn get_stock_basic(&self, code: &str) -> Result<StockBasic>;
}
