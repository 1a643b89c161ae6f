//! End-to-end tests for the analysis orchestrator
//!
//! The completion client is scripted per stage (keyed off distinctive text in
//! each stage's system template) and the data provider serves canned records,
//! so every pipeline path runs without network access.

use async_trait::async_trait;
use finsight_data::{
    BalanceRecord, CashFlowRecord, DailyValuationRecord, DataError, ExpressRecord,
    FinancialDataProvider, FinancialIndicatorRecord, ForecastRecord, IncomeRecord,
    SegmentRevenueRecord, StockBasic,
};
use finsight_engine::{
    AnalysisOptions, AnalysisOrchestrator, CompletionClient, CompletionOptions, EngineConfig,
    EngineError, MemoryCacheStore, ModelPreference, ProgressUpdate, ReportType, StageId,
    StageModelConfig, StageStatus,
};
use finsight_llm::LlmError;
use std::sync::{Arc, Mutex};

/// Distinctive text of the balance sheet stage template
const BALANCE_MARKER: &str = "balance sheet analysis expert";
/// Distinctive text of the trend stage template
const TREND_MARKER: &str = "seven core indicators";
/// Distinctive text of the risk stage template
const RISK_MARKER: &str = "financial risk assessment expert";

/// A reply that satisfies every stage schema the pipeline reads back
const SUPERSET_REPLY: &str = r#"{
  "summary": "ok",
  "revenueAnalysis": {"trend": "up", "growthRate": "10%"},
  "sustainability": {"conclusion": "stable"},
  "financialHealth": {"conclusion": "solid", "liquidity": "ample"},
  "leverageAnalysis": {"debtLevel": "low"},
  "operatingCashFlow": {"quality": "high", "sustainability": "strong"},
  "freeCashFlow": {"trend": "up"},
  "recommendation": "hold"
}"#;

#[derive(Debug, Clone)]
struct RecordedCall {
    system_prompt: String,
    model: String,
}

/// Completion client scripted by system prompt content
struct ScriptedClient {
    calls: Mutex<Vec<RecordedCall>>,
    /// Fail any stage whose system prompt contains this text
    fail_marker: Option<&'static str>,
    /// Reply with unparseable text for any stage whose system prompt
    /// contains this text
    garbage_marker: Option<&'static str>,
}

impl ScriptedClient {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_marker: None,
            garbage_marker: None,
        }
    }

    fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_marker: Some(marker),
            ..Self::new()
        }
    }

    fn garbage_on(marker: &'static str) -> Self {
        Self {
            garbage_marker: Some(marker),
            ..Self::new()
        }
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn calls_matching(&self, marker: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.system_prompt.contains(marker))
            .count()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        system_prompt: &str,
        _user_prompt: &str,
        options: &CompletionOptions,
    ) -> finsight_llm::Result<String> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            model: options.model.clone(),
        });

        if let Some(marker) = self.fail_marker {
            if system_prompt.contains(marker) {
                return Err(LlmError::RequestFailed("scripted failure".to_string()));
            }
        }
        if let Some(marker) = self.garbage_marker {
            if system_prompt.contains(marker) {
                return Ok("the model rambles instead of emitting an object".to_string());
            }
        }
        Ok(SUPERSET_REPLY.to_string())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Data provider serving canned statements
struct CannedProvider {
    latest_period: String,
    fail_income: bool,
}

impl CannedProvider {
    fn new() -> Self {
        Self {
            latest_period: "20241231".to_string(),
            fail_income: false,
        }
    }

    fn with_latest_period(period: &str) -> Self {
        Self {
            latest_period: period.to_string(),
            ..Self::new()
        }
    }

    fn failing_income() -> Self {
        Self {
            fail_income: true,
            ..Self::new()
        }
    }

    fn periods(&self) -> Vec<String> {
        vec![
            self.latest_period.clone(),
            "20240930".to_string(),
            "20240630".to_string(),
            "20240331".to_string(),
        ]
    }
}

#[async_trait]
impl FinancialDataProvider for CannedProvider {
    fn name(&self) -> &str {
        "Canned Financial Data"
    }

    async fn get_income_statement(
        &self,
        code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<IncomeRecord>> {
        if self.fail_income {
            return Err(DataError::DataUnavailable {
                code: code.to_string(),
                reason: "scripted outage".to_string(),
            });
        }
        Ok(self
            .periods()
            .into_iter()
            .enumerate()
            .map(|(i, end_date)| IncomeRecord {
                end_date,
                ann_date: Some(format!("2025010{}", i + 1)),
                total_revenue: Some(4.0e9 - i as f64 * 0.5e9),
                revenue: Some(4.0e9 - i as f64 * 0.5e9),
                operating_profit: Some(1.2e9),
                net_income: Some(1.0e9),
                net_income_attr_parent: Some(0.9e9),
                basic_eps: Some(1.2),
            })
            .collect())
    }

    async fn get_balance_sheet(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<BalanceRecord>> {
        Ok(self
            .periods()
            .into_iter()
            .map(|end_date| BalanceRecord {
                end_date,
                ann_date: Some("20250101".to_string()),
                total_assets: Some(20.0e9),
                total_liabilities: Some(8.0e9),
                total_equity: Some(12.0e9),
                ..Default::default()
            })
            .collect())
    }

    async fn get_cash_flow(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<CashFlowRecord>> {
        Ok(self
            .periods()
            .into_iter()
            .map(|end_date| CashFlowRecord {
                end_date,
                ann_date: Some("20250101".to_string()),
                net_operating_cash: Some(1.1e9),
                net_investing_cash: Some(-0.4e9),
                net_financing_cash: Some(-0.3e9),
                ..Default::default()
            })
            .collect())
    }

    async fn get_forecast(&self, _code: &str) -> finsight_data::Result<Vec<ForecastRecord>> {
        Ok(vec![ForecastRecord {
            end_date: self.latest_period.clone(),
            ann_date: Some("20250115".to_string()),
            forecast_type: Some("increase".to_string()),
            net_profit_change_min_pct: Some(10.0),
            net_profit_change_max_pct: Some(20.0),
            summary: Some("demand recovery".to_string()),
            ..Default::default()
        }])
    }

    async fn get_express(&self, _code: &str) -> finsight_data::Result<Vec<ExpressRecord>> {
        Ok(vec![ExpressRecord {
            end_date: self.latest_period.clone(),
            ann_date: Some("20250110".to_string()),
            revenue: Some(4.1e9),
            net_income: Some(1.05e9),
            ..Default::default()
        }])
    }

    async fn get_financial_indicators(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<FinancialIndicatorRecord>> {
        Ok(self
            .periods()
            .into_iter()
            .map(|end_date| FinancialIndicatorRecord {
                end_date,
                roe: Some(18.0),
                gross_margin: Some(45.0),
                net_margin: Some(25.0),
                revenue_yoy: Some(12.0),
                net_income_yoy: Some(15.0),
                debt_to_assets: Some(40.0),
                eps: Some(1.2),
                bps: Some(6.8),
                ..Default::default()
            })
            .collect())
    }

    async fn get_segment_revenue(
        &self,
        _code: &str,
        _period: Option<&str>,
    ) -> finsight_data::Result<Vec<SegmentRevenueRecord>> {
        Ok(vec![
            SegmentRevenueRecord {
                end_date: self.latest_period.clone(),
                item: "Flagship product".to_string(),
                sales: Some(3.0e9),
                profit: Some(1.5e9),
                cost: Some(1.5e9),
            },
            SegmentRevenueRecord {
                end_date: self.latest_period.clone(),
                item: "Services".to_string(),
                sales: Some(1.0e9),
                profit: Some(0.2e9),
                cost: Some(0.8e9),
            },
        ])
    }

    async fn get_daily_valuation(
        &self,
        _code: &str,
    ) -> finsight_data::Result<Vec<DailyValuationRecord>> {
        Ok(vec![
            DailyValuationRecord {
                trade_date: "20250630".to_string(),
                close: Some(48.5),
                pe_ttm: Some(22.0),
                pb: Some(4.1),
                ps_ttm: Some(5.5),
                turnover_rate: Some(1.2),
                total_market_value: Some(96.0e9),
                ..Default::default()
            },
            DailyValuationRecord {
                trade_date: "20250629".to_string(),
                close: Some(47.9),
                pe_ttm: Some(21.7),
                pb: Some(4.0),
                ps_ttm: Some(5.4),
                ..Default::default()
            },
        ])
    }

    async fn get_stock_basic(&self, code: &str) -> finsight_data::Result<StockBasic> {
        Ok(StockBasic {
            code: code.to_string(),
            name: Some("Subject One".to_string()),
            industry: Some("software".to_string()),
            market: None,
        })
    }
}

fn orchestrator_with(
    client: Arc<ScriptedClient>,
    provider: Arc<CannedProvider>,
) -> AnalysisOrchestrator {
    AnalysisOrchestrator::builder()
        .completion_client(client)
        .data_provider(provider)
        .build()
        .expect("orchestrator builds")
}

fn options() -> AnalysisOptions {
    AnalysisOptions::new("600519", "Subject One", ReportType::Annual)
}

#[tokio::test]
async fn happy_path_populates_all_mandatory_stages() {
    let client = Arc::new(ScriptedClient::new());
    let orchestrator = orchestrator_with(Arc::clone(&client), Arc::new(CannedProvider::new()));

    let report = orchestrator.analyze(&options()).await.expect("run succeeds");

    for result in [
        &report.planning,
        &report.profitability,
        &report.balance_sheet,
        &report.cash_flow,
        &report.earnings_quality,
        &report.risk,
        &report.business_insight,
        &report.valuation,
        &report.final_conclusion,
    ] {
        assert_eq!(result.status, StageStatus::Success);
        assert!(!result.payload.is_empty());
    }

    // Valuation is present even though both optional flags are off.
    assert!(report.business_model.is_none());
    assert!(report.forecast.is_none());
    assert!(report.trend_interpretation.is_some());

    assert_eq!(report.report_period, "2024 FY");
    assert_eq!(report.data_source.provider, "Canned Financial Data");
    assert_eq!(report.data_source.latest_period, "2024 FY");
    assert_eq!(report.data_source.report_periods.len(), 4);
    assert!(report.data_source.disclaimer.contains("Canned Financial Data"));

    // 8 mandatory + valuation + final conclusion completions.
    assert_eq!(client.calls().len(), 10);
}

#[tokio::test]
async fn optional_flags_add_their_stages() {
    let client = Arc::new(ScriptedClient::new());
    let orchestrator = orchestrator_with(Arc::clone(&client), Arc::new(CannedProvider::new()));

    let run_options = AnalysisOptions {
        include_business_model: true,
        include_forecast: true,
        ..options()
    };
    let report = orchestrator
        .analyze(&run_options)
        .await
        .expect("run succeeds");

    assert!(report.business_model.is_some());
    assert!(report.forecast.is_some());
    assert_eq!(client.calls().len(), 12);
}

#[tokio::test]
async fn progress_is_fixed_total_and_monotonic() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);

    let orchestrator = AnalysisOrchestrator::builder()
        .completion_client(Arc::new(ScriptedClient::new()))
        .data_provider(Arc::new(CannedProvider::new()))
        .on_progress(move |update| {
            sink.lock().expect("updates lock").push(update.clone());
        })
        .build()
        .expect("orchestrator builds");

    let run_options = AnalysisOptions {
        include_forecast: true,
        ..options()
    };
    orchestrator
        .analyze(&run_options)
        .await
        .expect("run succeeds");

    let updates = updates.lock().expect("updates lock");
    assert!(!updates.is_empty());

    // totalAgents is fixed before the first stage and never changes mid-run.
    assert!(updates.iter().all(|u| u.total_stages == 11));

    // After the planning stage completes: round(1/11 * 100) = 9.
    let after_planning = updates
        .iter()
        .find(|u| u.completed_stages == ["PLANNING"] && u.current_phase == "Analysis planning")
        .expect("planning completion update");
    assert_eq!(after_planning.percentage, 9);

    // Percentages never go backwards and the run ends at 100.
    let percentages: Vec<u32> = updates.iter().map(|u| u.percentage).collect();
    assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*percentages.last().expect("final update"), 100);
}

#[tokio::test]
async fn mandatory_stage_failure_aborts_the_run() {
    let client = Arc::new(ScriptedClient::failing_on(BALANCE_MARKER));
    let orchestrator = orchestrator_with(client, Arc::new(CannedProvider::new()));

    let err = orchestrator
        .analyze(&options())
        .await
        .expect_err("run aborts");
    match err {
        EngineError::Stage { stage, reason } => {
            assert_eq!(stage, StageId::BalanceSheet);
            assert!(reason.contains("scripted failure"));
        }
        other => panic!("expected stage error, got {other}"),
    }
}

#[tokio::test]
async fn trend_failure_is_downgraded_to_absent() {
    let client = Arc::new(ScriptedClient::failing_on(TREND_MARKER));
    let orchestrator = orchestrator_with(Arc::clone(&client), Arc::new(CannedProvider::new()));

    let report = orchestrator.analyze(&options()).await.expect("run succeeds");

    assert!(report.trend_interpretation.is_none());
    assert_eq!(report.final_conclusion.status, StageStatus::Success);
    assert_eq!(client.calls_matching(TREND_MARKER), 1);
}

#[tokio::test]
async fn unparseable_reply_degrades_the_stage_not_the_run() {
    let client = Arc::new(ScriptedClient::garbage_on(RISK_MARKER));
    let orchestrator = orchestrator_with(client, Arc::new(CannedProvider::new()));

    let report = orchestrator.analyze(&options()).await.expect("run succeeds");

    assert_eq!(report.risk.status, StageStatus::Degraded);
    assert_eq!(
        report.risk.payload.get("rawResult").and_then(|v| v.as_str()),
        Some("the model rambles instead of emitting an object")
    );
    // Downstream consumers still get a complete report.
    assert_eq!(report.final_conclusion.status, StageStatus::Success);
}

#[tokio::test]
async fn panicking_progress_callback_does_not_abort_the_run() {
    let orchestrator = AnalysisOrchestrator::builder()
        .completion_client(Arc::new(ScriptedClient::new()))
        .data_provider(Arc::new(CannedProvider::new()))
        .on_progress(|_| panic!("sink exploded"))
        .build()
        .expect("orchestrator builds");

    let report = orchestrator.analyze(&options()).await.expect("run succeeds");
    assert_eq!(report.final_conclusion.status, StageStatus::Success);
}

#[tokio::test]
async fn data_fetch_failure_propagates() {
    let orchestrator = AnalysisOrchestrator::builder()
        .completion_client(Arc::new(ScriptedClient::new()))
        .data_provider(Arc::new(CannedProvider::failing_income()))
        .build()
        .expect("orchestrator builds");

    let err = orchestrator
        .analyze(&options())
        .await
        .expect_err("run aborts");
    assert!(matches!(err, EngineError::Data(_)));
}

#[tokio::test]
async fn trend_cache_is_reused_within_one_period() {
    let client = Arc::new(ScriptedClient::new());
    let store = Arc::new(MemoryCacheStore::new());

    let orchestrator = AnalysisOrchestrator::builder()
        .completion_client(Arc::clone(&client) as Arc<dyn CompletionClient>)
        .data_provider(Arc::new(CannedProvider::new()))
        .cache_store(store)
        .build()
        .expect("orchestrator builds");

    let first = orchestrator.analyze(&options()).await.expect("first run");
    let second = orchestrator.analyze(&options()).await.expect("second run");

    // The second run served the trend stage from cache: one completion only.
    assert_eq!(client.calls_matching(TREND_MARKER), 1);
    let first_trend = first.trend_interpretation.expect("first trend");
    let second_trend = second.trend_interpretation.expect("second trend");
    assert_eq!(first_trend.payload, second_trend.payload);
}

#[tokio::test]
async fn trend_cache_misses_when_a_new_period_lands() {
    let client = Arc::new(ScriptedClient::new());
    let store = Arc::new(MemoryCacheStore::new());

    let first = AnalysisOrchestrator::builder()
        .completion_client(Arc::clone(&client) as Arc<dyn CompletionClient>)
        .data_provider(Arc::new(CannedProvider::new()))
        .cache_store(Arc::clone(&store) as Arc<dyn finsight_engine::CacheStore>)
        .build()
        .expect("orchestrator builds");
    first.analyze(&options()).await.expect("first run");

    // A new filing arrives: the freshly computed latest period changes, so
    // the cached entry must not be served even though its TTL is far away.
    let second = AnalysisOrchestrator::builder()
        .completion_client(Arc::clone(&client) as Arc<dyn CompletionClient>)
        .data_provider(Arc::new(CannedProvider::with_latest_period("20250331")))
        .cache_store(store)
        .build()
        .expect("orchestrator builds");
    second.analyze(&options()).await.expect("second run");

    assert_eq!(client.calls_matching(TREND_MARKER), 2);
}

#[tokio::test]
async fn model_resolution_prefers_per_call_overrides() {
    let client = Arc::new(ScriptedClient::new());
    let config = EngineConfig::builder()
        .default_model("instance-default-model")
        .build()
        .expect("valid config");

    let orchestrator = AnalysisOrchestrator::builder()
        .completion_client(Arc::clone(&client) as Arc<dyn CompletionClient>)
        .data_provider(Arc::new(CannedProvider::new()))
        .config(config)
        .build()
        .expect("orchestrator builds");

    let mut stage_models = StageModelConfig::new();
    stage_models.insert(StageId::FinalConclusion, ModelPreference::Advanced);
    let run_options = AnalysisOptions {
        stage_models: Some(stage_models),
        ..options()
    };
    orchestrator
        .analyze(&run_options)
        .await
        .expect("run succeeds");

    let calls = client.calls();
    let last = calls.last().expect("at least one call");
    assert_eq!(last.model, "fin-analysis-pro");
    assert!(
        calls[..calls.len() - 1]
            .iter()
            .all(|call| call.model == "instance-default-model")
    );
}
