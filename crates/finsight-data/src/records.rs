//! Statement and indicator record types
//!
//! Reporting periods are identified by their fiscal end date in `YYYYMMDD`
//! form (e.g. `"20241231"`); `ann_date` is the date the filing was announced.
//! Monetary amounts are in the provider's reporting currency base unit.

use serde::{Deserialize, Serialize};

/// Market a company trades on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    /// Mainland exchange listing
    Domestic,
    /// Hong Kong exchange listing
    HongKong,
}

impl Default for Market {
    fn default() -> Self {
        Self::Domestic
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domestic => write!(f, "domestic"),
            Self::HongKong => write!(f, "hk"),
        }
    }
}

/// One reporting period of the income statement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub end_date: String,
    pub ann_date: Option<String>,
    pub total_revenue: Option<f64>,
    pub revenue: Option<f64>,
    pub operating_profit: Option<f64>,
    pub net_income: Option<f64>,
    /// Net income attributable to the parent company
    pub net_income_attr_parent: Option<f64>,
    pub basic_eps: Option<f64>,
}

/// One reporting period of the balance sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub end_date: String,
    pub ann_date: Option<String>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub total_current_assets: Option<f64>,
    pub total_current_liabilities: Option<f64>,
    pub total_equity: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub accounts_receivable: Option<f64>,
    pub inventory: Option<f64>,
}

/// One reporting period of the cash flow statement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashFlowRecord {
    pub end_date: String,
    pub ann_date: Option<String>,
    pub net_operating_cash: Option<f64>,
    pub net_investing_cash: Option<f64>,
    pub net_financing_cash: Option<f64>,
    pub capital_expenditure: Option<f64>,
    pub cash_end_of_period: Option<f64>,
}

/// Management earnings forecast (pre-announcement of expected results)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub end_date: String,
    pub ann_date: Option<String>,
    /// Forecast category, e.g. "increase", "turnaround", "decline"
    pub forecast_type: Option<String>,
    pub net_profit_change_min_pct: Option<f64>,
    pub net_profit_change_max_pct: Option<f64>,
    pub net_profit_min: Option<f64>,
    pub net_profit_max: Option<f64>,
    /// Net profit attributable to parent in the prior-year period
    pub prior_net_profit: Option<f64>,
    pub summary: Option<String>,
    pub change_reason: Option<String>,
}

/// Earnings flash (preliminary results ahead of the full filing)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressRecord {
    pub end_date: String,
    pub ann_date: Option<String>,
    pub revenue: Option<f64>,
    pub operating_profit: Option<f64>,
    pub net_income: Option<f64>,
    pub diluted_eps: Option<f64>,
    pub diluted_roe: Option<f64>,
    pub summary: Option<String>,
}

/// Derived financial ratios for one reporting period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialIndicatorRecord {
    pub end_date: String,
    pub ann_date: Option<String>,
    // Profitability
    pub roe: Option<f64>,
    pub roe_weighted: Option<f64>,
    pub roa: Option<f64>,
    pub gross_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub eps: Option<f64>,
    /// Book value per share
    pub bps: Option<f64>,
    // Growth (year over year, percent)
    pub revenue_yoy: Option<f64>,
    pub net_income_yoy: Option<f64>,
    pub operating_profit_yoy: Option<f64>,
    // Expense ratios (share of gross revenue, percent)
    pub sales_expense_ratio: Option<f64>,
    pub admin_expense_ratio: Option<f64>,
    pub finance_expense_ratio: Option<f64>,
    // Solvency
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub cash_ratio: Option<f64>,
    pub debt_to_assets: Option<f64>,
    pub debt_to_equity: Option<f64>,
    // Operating efficiency
    pub receivables_turnover: Option<f64>,
    pub current_asset_turnover: Option<f64>,
    pub fixed_asset_turnover: Option<f64>,
    pub asset_turnover: Option<f64>,
    // Cash generation
    pub operating_cash_per_share: Option<f64>,
    /// Free cash flow to the firm
    pub fcff: Option<f64>,
    /// Free cash flow to equity
    pub fcfe: Option<f64>,
}

/// Revenue, profit and cost of one business segment in one period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentRevenueRecord {
    pub end_date: String,
    /// Segment name as disclosed in the filing
    pub item: String,
    pub sales: Option<f64>,
    pub profit: Option<f64>,
    pub cost: Option<f64>,
}

impl SegmentRevenueRecord {
    /// Segment gross margin in percent, when sales and profit are disclosed
    pub fn margin_pct(&self) -> Option<f64> {
        match (self.sales, self.profit) {
            (Some(sales), Some(profit)) if sales > 0.0 => Some(profit / sales * 100.0),
            _ => None,
        }
    }
}

/// Daily market valuation metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyValuationRecord {
    pub trade_date: String,
    pub close: Option<f64>,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub ps_ttm: Option<f64>,
    pub turnover_rate: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub total_market_value: Option<f64>,
    pub circulating_market_value: Option<f64>,
    pub dividend_yield_ttm: Option<f64>,
}

/// Basic listing information for a company
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockBasic {
    pub code: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub market: Option<Market>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_margin() {
        let seg = SegmentRevenueRecord {
            end_date: "20241231".to_string(),
            item: "Retail".to_string(),
            sales: Some(200.0),
            profit: Some(50.0),
            cost: Some(150.0),
        };
        assert_eq!(seg.margin_pct(), Some(25.0));

        let no_sales = SegmentRevenueRecord {
            end_date: "20241231".to_string(),
            item: "Dormant".to_string(),
            sales: Some(0.0),
            profit: Some(0.0),
            cost: None,
        };
        assert_eq!(no_sales.margin_pct(), None);
    }
}
