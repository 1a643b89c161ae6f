//! Basic report generation example
//!
//! Wires the orchestrator to a stub completion client and a stub data
//! provider, so the full pipeline runs offline and prints the assembled
//! report.
//!
//! To run this example:
//! ```bash
//! cargo run --example basic_report 600519
//! ```

use async_trait::async_trait;
use finsight_data::{
    BalanceRecord, CashFlowRecord, DailyValuationRecord, ExpressRecord, FinancialDataProvider,
    FinancialIndicatorRecord, ForecastRecord, IncomeRecord, SegmentRevenueRecord, StockBasic,
};
use finsight_engine::{
    AnalysisOptions, AnalysisOrchestrator, CompletionClient, CompletionOptions, MemoryCacheStore,
    ReportType,
};
use std::env;
use std::sync::Arc;

/// Stub client that answers every stage with a minimal valid object
struct StubClient;

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        options: &CompletionOptions,
    ) -> finsight_llm::Result<String> {
        Ok(format!(
            "{{\"summary\": \"stub analysis from {}\"}}",
            options.model
        ))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Stub provider serving one fiscal year of made-up statements
struct StubProvider;

#[async_trait]
impl FinancialDataProvider for StubProvider {
    fn name(&self) -> &str {
        "Stub Financial Data"
    }

    async fn get_income_statement(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<IncomeRecord>> {
        Ok(vec![IncomeRecord {
            end_date: "20241231".to_string(),
            ann_date: Some("20250120".to_string()),
            total_revenue: Some(4.2e9),
            revenue: Some(4.2e9),
            operating_profit: Some(1.3e9),
            net_income: Some(1.0e9),
            net_income_attr_parent: Some(0.95e9),
            basic_eps: Some(1.31),
        }])
    }

    async fn get_balance_sheet(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<BalanceRecord>> {
        Ok(vec![BalanceRecord {
            end_date: "20241231".to_string(),
            ann_date: Some("20250120".to_string()),
            total_assets: Some(21.0e9),
            total_liabilities: Some(8.5e9),
            total_equity: Some(12.5e9),
            ..Default::default()
        }])
    }

    async fn get_cash_flow(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<CashFlowRecord>> {
        Ok(vec![CashFlowRecord {
            end_date: "20241231".to_string(),
            ann_date: Some("20250120".to_string()),
            net_operating_cash: Some(1.2e9),
            net_investing_cash: Some(-0.5e9),
            net_financing_cash: Some(-0.2e9),
            ..Default::default()
        }])
    }

    async fn get_forecast(&self, _code: &str) -> finsight_data::Result<Vec<ForecastRecord>> {
        Ok(Vec::new())
    }

    async fn get_express(&self, _code: &str) -> finsight_data::Result<Vec<ExpressRecord>> {
        Ok(Vec::new())
    }

    async fn get_financial_indicators(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<FinancialIndicatorRecord>> {
        Ok(vec![FinancialIndicatorRecord {
            end_date: "20241231".to_string(),
            roe: Some(17.5),
            gross_margin: Some(44.0),
            net_margin: Some(23.8),
            revenue_yoy: Some(11.0),
            net_income_yoy: Some(14.0),
            debt_to_assets: Some(40.5),
            eps: Some(1.31),
            bps: Some(7.1),
            ..Default::default()
        }])
    }

    async fn get_segment_revenue(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<SegmentRevenueRecord>> {
        Ok(vec![SegmentRevenueRecord {
            end_date: "20241231".to_string(),
            item: "Core product".to_string(),
            sales: Some(3.5e9),
            profit: Some(1.6e9),
            cost: Some(1.9e9),
        }])
    }

    async fn get_daily_valuation(
        &self,
        _code: &str,
    ) -> finsight_data::Result<Vec<DailyValuationRecord>> {
        Ok(vec![DailyValuationRecord {
            trade_date: "20250801".to_string(),
            close: Some(52.3),
            pe_ttm: Some(23.5),
            pb: Some(4.2),
            ps_ttm: Some(5.6),
            ..Default::default()
        }])
    }

    async fn get_stock_basic(&self, code: &str) -> finsight_data::Result<StockBasic> {
        Ok(StockBasic {
            code: code.to_string(),
            name: Some("Example Corp".to_string()),
            industry: Some("software".to_string()),
            market: None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Get company code from command line arguments
    let args: Vec<String> = env::args().collect();
    let code = if args.len() > 1 { &args[1] } else { "600519" };

    println!("=== Financial Report Analysis ===\n");
    println!("Analyzing: {code}\n");

    let orchestrator = AnalysisOrchestrator::builder()
        .completion_client(Arc::new(StubClient))
        .data_provider(Arc::new(StubProvider))
        .cache_store(Arc::new(MemoryCacheStore::new()))
        .on_progress(|update| {
            println!(
                "[{:>3}%] {} ({}/{})",
                update.percentage,
                update.current_phase,
                update.completed_stages.len(),
                update.total_stages
            );
        })
        .build()?;

    let options = AnalysisOptions {
        include_business_model: true,
        include_forecast: true,
        ..AnalysisOptions::new(code, "Example Corp", ReportType::Annual)
    };

    let report = orchestrator.analyze(&options).await?;

    println!("\n=== Report ===");
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("\nCompleted in {} ms", report.execution_time_ms);

    Ok(())
}
