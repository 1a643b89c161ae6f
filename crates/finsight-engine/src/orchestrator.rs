//! The stage graph executor
//!
//! Runs the fixed analysis pipeline for one company: fetch the dataset once,
//! then walk the stage graph phase by phase, fanning out within a phase and
//! synchronizing before the next one starts. Any mandatory stage error
//! aborts the run and reaches the caller unmodified — the orchestrator never
//! retries; retry and backoff policy belong to the caller. The trend
//! interpretation stage alone is best-effort.
//!
//! Run-scoped progress state lives in a per-run [`RunState`], so concurrent
//! runs on one orchestrator instance cannot corrupt each other's counters.
//!
//! Cancellation and per-stage timeouts are not supported mid-run: once
//! started, a run completes or fails with whatever deadline the completion
//! client itself enforces.

use crate::cache::{CacheStore, TrendCache, TrendCacheEntry, next_quarter_start};
use crate::compose::PromptComposer;
use crate::config::{EngineConfig, StageModelConfig};
use crate::error::{EngineError, Result};
use crate::extract;
use crate::progress::{ProgressCallback, ProgressUpdate, emit};
use crate::prompts::{self, IndustryProfile};
use crate::report::{AnalysisReport, DataSourceInfo, ReportType, StageResult, StageStatus};
use crate::stage::StageId;
use chrono::Utc;
use finsight_data::{
    FinancialDataProvider, FinancialDataset, IncomeRecord, Market, format_period,
};
use finsight_llm::{CompletionClient, CompletionOptions};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-run inputs
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub company_code: String,
    pub company_name: String,
    pub market: Market,
    pub report_type: ReportType,
    /// Fiscal end date to anchor statement fetches on; latest when absent
    pub report_period: Option<String>,
    pub include_business_model: bool,
    pub include_forecast: bool,
    /// Per-call model tier overrides, strongest in the resolution order
    pub stage_models: Option<StageModelConfig>,
}

impl AnalysisOptions {
    pub fn new(
        company_code: impl Into<String>,
        company_name: impl Into<String>,
        report_type: ReportType,
    ) -> Self {
        Self {
            company_code: company_code.into(),
            company_name: company_name.into(),
            market: Market::default(),
            report_type,
            report_period: None,
            include_business_model: false,
            include_forecast: false,
            stage_models: None,
        }
    }

    /// Number of stages this run will execute, fixed before the first stage
    /// starts
    pub fn total_stages(&self) -> usize {
        // 8 always-run analysis stages, the flagged extras, then valuation
        // and the final conclusion.
        let mut total = 8;
        if self.include_business_model {
            total += 1;
        }
        if self.include_forecast {
            total += 1;
        }
        total + 2
    }
}

/// Progress state scoped to a single run
struct RunState {
    completed: Vec<StageId>,
    total: usize,
    callback: Option<ProgressCallback>,
}

impl RunState {
    fn new(total: usize, callback: Option<ProgressCallback>) -> Self {
        Self {
            completed: Vec::new(),
            total,
            callback,
        }
    }

    fn percentage(&self) -> u32 {
        (self.completed.len() as f64 / self.total as f64 * 100.0).round() as u32
    }

    fn report_phase(&self, label: &str) {
        let update = ProgressUpdate {
            current_phase: label.to_string(),
            completed_stages: self.completed.iter().map(|s| s.as_str().to_string()).collect(),
            total_stages: self.total,
            percentage: self.percentage(),
        };
        emit(self.callback.as_ref(), &update);
    }

    fn mark_completed(&mut self, stage: StageId) {
        self.completed.push(stage);
        self.report_phase(stage.label());
    }
}

/// Executes the fixed analysis stage graph
pub struct AnalysisOrchestrator {
    client: Arc<dyn CompletionClient>,
    provider: Arc<dyn FinancialDataProvider>,
    trend_cache: Option<TrendCache>,
    composer: PromptComposer,
    config: EngineConfig,
    on_progress: Option<ProgressCallback>,
}

impl AnalysisOrchestrator {
    /// Create a new orchestrator builder
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Execute the full analysis pipeline for one company
    pub async fn analyze(&self, options: &AnalysisOptions) -> Result<AnalysisReport> {
        let run_started = Instant::now();
        let mut run = RunState::new(options.total_stages(), self.on_progress.clone());
        info!(
            company = %options.company_code,
            total_stages = run.total,
            "starting analysis run"
        );

        run.report_phase("data retrieval");
        let dataset = self
            .fetch_dataset(&options.company_code, options.report_period.as_deref())
            .await?;
        let data_source = self.build_data_source(&dataset);

        run.report_phase("analysis planning");
        let planning = self
            .run_stage(StageId::Planning, build_planning_prompt(&dataset, options), options)
            .await?;
        run.mark_completed(StageId::Planning);

        run.report_phase("statement analysis");
        let (profitability, balance_sheet, cash_flow) = tokio::try_join!(
            self.run_stage(
                StageId::Profitability,
                build_profitability_prompt(&dataset),
                options
            ),
            self.run_stage(
                StageId::BalanceSheet,
                build_balance_sheet_prompt(&dataset),
                options
            ),
            self.run_stage(StageId::CashFlow, build_cash_flow_prompt(&dataset), options),
        )?;
        run.mark_completed(StageId::Profitability);
        run.mark_completed(StageId::BalanceSheet);
        run.mark_completed(StageId::CashFlow);

        run.report_phase("trend interpretation");
        let trend_interpretation = self
            .run_trend(&dataset, options, &profitability, &balance_sheet, &cash_flow)
            .await;
        run.mark_completed(StageId::TrendInterpretation);

        run.report_phase("deep analysis");
        let earnings_quality = self
            .run_stage(
                StageId::EarningsQuality,
                build_earnings_quality_prompt(&profitability, &balance_sheet, &cash_flow),
                options,
            )
            .await?;
        run.mark_completed(StageId::EarningsQuality);

        let (risk, business_insight) = tokio::try_join!(
            self.run_stage(
                StageId::Risk,
                build_risk_prompt(&balance_sheet, &cash_flow, &earnings_quality),
                options
            ),
            self.run_stage(
                StageId::BusinessInsight,
                build_business_insight_prompt(&dataset, &profitability),
                options
            ),
        )?;
        run.mark_completed(StageId::Risk);
        run.mark_completed(StageId::BusinessInsight);

        let business_model = if options.include_business_model {
            run.report_phase("business model analysis");
            let result = self
                .run_stage(
                    StageId::BusinessModel,
                    build_business_model_prompt(&business_insight, &dataset),
                    options,
                )
                .await?;
            run.mark_completed(StageId::BusinessModel);
            Some(result)
        } else {
            None
        };

        let forecast = if options.include_forecast {
            run.report_phase("earnings forecast");
            let result = self
                .run_stage(
                    StageId::Forecast,
                    build_forecast_prompt(&profitability, &business_insight, &dataset),
                    options,
                )
                .await?;
            run.mark_completed(StageId::Forecast);
            Some(result)
        } else {
            None
        };

        // Valuation always runs, independent of the optional flags above.
        run.report_phase("valuation assessment");
        let valuation = self
            .run_stage(
                StageId::Valuation,
                build_valuation_prompt(&dataset, &profitability, &balance_sheet),
                options,
            )
            .await?;
        run.mark_completed(StageId::Valuation);

        run.report_phase("final conclusion");
        let final_conclusion = self
            .run_stage(
                StageId::FinalConclusion,
                build_final_conclusion_prompt(
                    &planning,
                    &profitability,
                    &balance_sheet,
                    &cash_flow,
                    trend_interpretation.as_ref(),
                    &earnings_quality,
                    &risk,
                    &business_insight,
                    business_model.as_ref(),
                    forecast.as_ref(),
                    &valuation,
                ),
                options,
            )
            .await?;
        run.mark_completed(StageId::FinalConclusion);

        let execution_time_ms = run_started.elapsed().as_millis() as u64;
        info!(
            company = %options.company_code,
            elapsed_ms = execution_time_ms,
            "analysis run completed"
        );

        let report_period = if data_source.latest_period.is_empty() {
            options
                .report_period
                .clone()
                .unwrap_or_else(|| "latest".to_string())
        } else {
            data_source.latest_period.clone()
        };

        Ok(AnalysisReport {
            company_code: options.company_code.clone(),
            company_name: options.company_name.clone(),
            report_type: options.report_type,
            report_period,
            data_source,
            planning,
            profitability,
            balance_sheet,
            cash_flow,
            trend_interpretation,
            earnings_quality,
            risk,
            business_insight,
            business_model,
            forecast,
            valuation,
            final_conclusion,
            execution_time_ms,
        })
    }

    /// Fetch every dataset the pipeline reads, concurrently
    async fn fetch_dataset(
        &self,
        code: &str,
        period: Option<&str>,
    ) -> Result<FinancialDataset> {
        debug!(company = %code, "fetching financial dataset");
        let (income, balance, cash_flow, forecast, express, indicators, segments, daily) =
            tokio::try_join!(
                self.provider.get_income_statement(code, period),
                self.provider.get_balance_sheet(code, period),
                self.provider.get_cash_flow(code, period),
                self.provider.get_forecast(code),
                self.provider.get_express(code),
                self.provider.get_financial_indicators(code, period),
                self.provider.get_segment_revenue(code, period),
                self.provider.get_daily_valuation(code),
            )?;

        info!(
            company = %code,
            income = income.len(),
            balance = balance.len(),
            cash_flow = cash_flow.len(),
            forecast = forecast.len(),
            express = express.len(),
            indicators = indicators.len(),
            segments = segments.len(),
            daily = daily.len(),
            "financial dataset fetched"
        );

        Ok(FinancialDataset {
            income,
            balance,
            cash_flow,
            forecast,
            express,
            indicators,
            segments,
            daily,
        })
    }

    fn build_data_source(&self, dataset: &FinancialDataset) -> DataSourceInfo {
        let periods = dataset.observed_periods();
        let latest = periods.first().cloned().unwrap_or_default();
        let provider = self.provider.name().to_string();
        let disclaimer = format!(
            "Data sourced from {provider}; for reference only, not investment advice."
        );

        DataSourceInfo {
            provider,
            report_periods: periods.iter().take(4).map(|p| format_period(p)).collect(),
            latest_period: format_period(&latest),
            announcement_dates: dataset
                .announcement_dates()
                .into_iter()
                .take(4)
                .collect(),
            disclaimer,
        }
    }

    /// Run one stage: compose the instruction text, call the model, recover a
    /// structured payload
    async fn run_stage(
        &self,
        stage: StageId,
        user_prompt: String,
        options: &AnalysisOptions,
    ) -> Result<StageResult> {
        let started = Instant::now();
        debug!(stage = %stage, "running stage");

        let system_prompt = self.composer.compose(
            stage,
            prompts::system_template(stage),
            self.config.stage_prompts.get(&stage).map(String::as_str),
        );
        let model = self
            .config
            .model_for_stage(stage, options.stage_models.as_ref());
        let mut builder = CompletionOptions::builder(model).max_tokens(self.config.max_tokens);
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        let completion_options = builder.build();

        let reply = self
            .client
            .complete(&system_prompt, &user_prompt, &completion_options)
            .await
            .map_err(|err| EngineError::Stage {
                stage,
                reason: err.to_string(),
            })?;

        let extracted = extract::extract(&reply);
        let status = if extracted.is_degraded() {
            warn!(stage = %stage, "model reply did not parse; keeping raw text");
            StageStatus::Degraded
        } else {
            StageStatus::Success
        };

        Ok(StageResult {
            stage,
            status,
            payload: extracted.payload,
            timestamp: Utc::now(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Best-effort wrapper around the trend interpretation stage
    async fn run_trend(
        &self,
        dataset: &FinancialDataset,
        options: &AnalysisOptions,
        profitability: &StageResult,
        balance_sheet: &StageResult,
        cash_flow: &StageResult,
    ) -> Option<StageResult> {
        match self
            .try_run_trend(dataset, options, profitability, balance_sheet, cash_flow)
            .await
        {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(error = %err, "trend interpretation failed; report will omit it");
                None
            }
        }
    }

    async fn try_run_trend(
        &self,
        dataset: &FinancialDataset,
        options: &AnalysisOptions,
        profitability: &StageResult,
        balance_sheet: &StageResult,
        cash_flow: &StageResult,
    ) -> Result<StageResult> {
        // The cache key period comes from the freshly fetched data, never
        // from the caller's requested period.
        let latest_period = dataset.latest_period().unwrap_or_default();

        if let Some(cache) = &self.trend_cache {
            if let Some(interpretations) =
                cache.load(&options.company_code, &latest_period).await
            {
                return Ok(StageResult {
                    stage: StageId::TrendInterpretation,
                    status: StageStatus::Success,
                    payload: interpretations,
                    timestamp: Utc::now(),
                    elapsed_ms: 0,
                });
            }
        }

        let industry = match self.provider.get_stock_basic(&options.company_code).await {
            Ok(basic) => basic.industry.unwrap_or_else(|| "default".to_string()),
            Err(err) => {
                debug!(error = %err, "industry lookup failed, using default profile");
                "default".to_string()
            }
        };
        let profile = prompts::profile_for(&industry);

        let user_prompt = build_trend_prompt(
            options,
            &industry,
            profile,
            &merged_trend_rows(dataset),
            &analysis_context(profitability, balance_sheet, cash_flow),
        );
        let result = self
            .run_stage(StageId::TrendInterpretation, user_prompt, options)
            .await?;

        if let Some(cache) = &self.trend_cache {
            if result.status == StageStatus::Success {
                let now = Utc::now();
                let entry = TrendCacheEntry {
                    company_code: options.company_code.clone(),
                    company_name: options.company_name.clone(),
                    industry,
                    latest_period,
                    interpretations: result.payload.clone(),
                    generated_at: now,
                    expires_at: next_quarter_start(now),
                };
                cache.store(&entry).await;
            }
        }

        Ok(result)
    }
}

/// Builder for [`AnalysisOrchestrator`]
///
/// Construction fails eagerly when a required collaborator is missing, so a
/// misconfigured orchestrator is rejected before any stage executes.
pub struct OrchestratorBuilder {
    client: Option<Arc<dyn CompletionClient>>,
    provider: Option<Arc<dyn FinancialDataProvider>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    config: Option<EngineConfig>,
    on_progress: Option<ProgressCallback>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            provider: None,
            cache_store: None,
            config: None,
            on_progress: None,
        }
    }

    /// Set the completion client (required)
    pub fn completion_client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the financial data provider (required)
    pub fn data_provider(mut self, provider: Arc<dyn FinancialDataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the cache store backing the trend cache (optional)
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Set the engine configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the progress callback
    pub fn on_progress(
        mut self,
        callback: impl Fn(&ProgressUpdate) + Send + Sync + 'static,
    ) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<AnalysisOrchestrator> {
        let client = self.client.ok_or_else(|| {
            EngineError::Config("completion client not configured".to_string())
        })?;
        let provider = self
            .provider
            .ok_or_else(|| EngineError::Config("data provider not configured".to_string()))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let composer = PromptComposer::with_limit(config.max_user_prompt_chars);
        let trend_cache = self.cache_store.map(TrendCache::new);

        Ok(AnalysisOrchestrator {
            client,
            provider,
            trend_cache,
            composer,
            config,
            on_progress: self.on_progress,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Per-stage user prompt construction
// ---------------------------------------------------------------------------

fn head<T>(records: &[T], n: usize) -> &[T] {
    &records[..records.len().min(n)]
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

/// A stage payload's `summary` field when present, the whole payload
/// otherwise
fn summary_or_payload(result: &StageResult) -> String {
    result
        .payload
        .get("summary")
        .map_or_else(|| result.payload_pretty(), |summary| pretty(summary))
}

/// Walk a nested payload path, rendering a missing value as "unknown"
fn path_text(payload: &Map<String, Value>, path: &[&str]) -> String {
    let mut current: &Value = match path.first().and_then(|key| payload.get(*key)) {
        Some(value) => value,
        None => return "unknown".to_string(),
    };
    for key in &path[1..] {
        match current.get(key) {
            Some(value) => current = value,
            None => return "unknown".to_string(),
        }
    }
    match current {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn build_planning_prompt(dataset: &FinancialDataset, options: &AnalysisOptions) -> String {
    format!(
        "Plan the analysis of the following financial report:\n\n\
         Company: {name} ({code})\n\
         Market: {market}\n\
         Report type: {report_type:?}\n\
         Requested period: {period}\n\n\
         ## Income statements\n{income}\n\n\
         ## Balance sheets\n{balance}\n\n\
         ## Cash flow statements\n{cash_flow}\n",
        name = options.company_name,
        code = options.company_code,
        market = options.market,
        report_type = options.report_type,
        period = options.report_period.as_deref().unwrap_or("latest"),
        income = pretty(&head(&dataset.income, 4)),
        balance = pretty(&head(&dataset.balance, 4)),
        cash_flow = pretty(&head(&dataset.cash_flow, 4)),
    )
}

fn build_profitability_prompt(dataset: &FinancialDataset) -> String {
    let indicator_summary: Vec<Value> = head(&dataset.indicators, 8)
        .iter()
        .map(|r| {
            json!({
                "period": r.end_date,
                "roe": r.roe,
                "roeWeighted": r.roe_weighted,
                "roa": r.roa,
                "grossMargin": r.gross_margin,
                "netMargin": r.net_margin,
                "revenueYoy": r.revenue_yoy,
                "netIncomeYoy": r.net_income_yoy,
                "salesExpenseRatio": r.sales_expense_ratio,
                "adminExpenseRatio": r.admin_expense_ratio,
                "financeExpenseRatio": r.finance_expense_ratio,
                "eps": r.eps,
                "bps": r.bps,
            })
        })
        .collect();

    format!(
        "Analyze the following income statement data and financial ratios:\n\n\
         ## Income statements\n{income}\n\n\
         ## Core profitability ratios\n{ratios}\n\n\
         Focus on the drivers behind ROE, gross margin and net margin trends, \
         and on expense control.\n",
        income = pretty(&head(&dataset.income, 8)),
        ratios = pretty(&indicator_summary),
    )
}

fn build_balance_sheet_prompt(dataset: &FinancialDataset) -> String {
    let solvency_summary: Vec<Value> = head(&dataset.indicators, 8)
        .iter()
        .map(|r| {
            json!({
                "period": r.end_date,
                "currentRatio": r.current_ratio,
                "quickRatio": r.quick_ratio,
                "cashRatio": r.cash_ratio,
                "debtToAssets": r.debt_to_assets,
                "debtToEquity": r.debt_to_equity,
                "receivablesTurnover": r.receivables_turnover,
                "currentAssetTurnover": r.current_asset_turnover,
                "fixedAssetTurnover": r.fixed_asset_turnover,
                "assetTurnover": r.asset_turnover,
            })
        })
        .collect();

    format!(
        "Analyze the following balance sheet data and financial ratios:\n\n\
         ## Balance sheets\n{balance}\n\n\
         ## Solvency and efficiency ratios\n{ratios}\n\n\
         Focus on liquidity risk, solvency and asset efficiency.\n",
        balance = pretty(&head(&dataset.balance, 8)),
        ratios = pretty(&solvency_summary),
    )
}

fn build_cash_flow_prompt(dataset: &FinancialDataset) -> String {
    let cash_summary: Vec<Value> = head(&dataset.indicators, 8)
        .iter()
        .map(|r| {
            json!({
                "period": r.end_date,
                "operatingCashPerShare": r.operating_cash_per_share,
                "fcff": r.fcff,
                "fcfe": r.fcfe,
            })
        })
        .collect();

    format!(
        "Analyze the following cash flow data and ratios:\n\n\
         ## Cash flow statements\n{cash_flow}\n\n\
         ## Cash generation ratios\n{ratios}\n\n\
         Focus on how operating cash flow matches reported profit, and on \
         free cash flow quality.\n",
        cash_flow = pretty(&head(&dataset.cash_flow, 8)),
        ratios = pretty(&cash_summary),
    )
}

fn build_earnings_quality_prompt(
    profitability: &StageResult,
    balance_sheet: &StageResult,
    cash_flow: &StageResult,
) -> String {
    format!(
        "Cross-validate the three statement analyses below for earnings quality:\n\n\
         ## Income statement analysis\n{profitability}\n\n\
         ## Balance sheet analysis\n{balance_sheet}\n\n\
         ## Cash flow analysis\n{cash_flow}\n",
        profitability = profitability.payload_pretty(),
        balance_sheet = balance_sheet.payload_pretty(),
        cash_flow = cash_flow.payload_pretty(),
    )
}

fn build_risk_prompt(
    balance_sheet: &StageResult,
    cash_flow: &StageResult,
    earnings_quality: &StageResult,
) -> String {
    format!(
        "Assess financial risk from the analyses below:\n\n\
         ## Balance sheet analysis\n{balance_sheet}\n\n\
         ## Cash flow analysis\n{cash_flow}\n\n\
         ## Earnings quality analysis\n{earnings_quality}\n",
        balance_sheet = balance_sheet.payload_pretty(),
        cash_flow = cash_flow.payload_pretty(),
        earnings_quality = earnings_quality.payload_pretty(),
    )
}

fn income_trend_line<F>(records: &[IncomeRecord], field: F) -> String
where
    F: Fn(&IncomeRecord) -> Option<f64>,
{
    let points: Vec<String> = head(records, 4)
        .iter()
        .filter_map(|r| field(r).map(|v| format!("{}: {:.2}B", r.end_date, v / 1e9)))
        .collect();
    if points.is_empty() {
        "n/a".to_string()
    } else {
        points.join(" -> ")
    }
}

fn build_business_insight_prompt(
    dataset: &FinancialDataset,
    profitability: &StageResult,
) -> String {
    // Segment rows grouped per reporting period, most recent three periods.
    let mut by_period: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for segment in &dataset.segments {
        by_period.entry(segment.end_date.as_str()).or_default().push(json!({
            "item": segment.item,
            "sales": segment.sales,
            "profit": segment.profit,
            "cost": segment.cost,
            "marginPct": segment.margin_pct(),
        }));
    }
    let segment_summary: Vec<Value> = by_period
        .into_iter()
        .rev()
        .take(3)
        .map(|(period, segments)| json!({"period": period, "segments": segments}))
        .collect();

    format!(
        "Analyze business composition from the data below:\n\n\
         ## Income statement analysis\n{profitability}\n\n\
         ## Segment revenue composition (recent periods)\n{segments}\n\n\
         ## Historical trends\n\
         Revenue: {revenue_trend}\n\
         Net income: {income_trend}\n\n\
         Focus on segment revenue shares and their shifts, segment margin \
         differences, and the momentum of core versus emerging businesses.\n",
        profitability = summary_or_payload(profitability),
        segments = pretty(&segment_summary),
        revenue_trend = income_trend_line(&dataset.income, |r| r.revenue),
        income_trend = income_trend_line(&dataset.income, |r| r.net_income),
    )
}

fn build_business_model_prompt(
    business_insight: &StageResult,
    dataset: &FinancialDataset,
) -> String {
    let segment_rows: Vec<Value> = head(&dataset.segments, 20)
        .iter()
        .map(|segment| {
            json!({
                "period": segment.end_date,
                "item": segment.item,
                "salesB": segment.sales.map(|v| v / 1e9),
                "profitB": segment.profit.map(|v| v / 1e9),
                "marginPct": segment.margin_pct(),
            })
        })
        .collect();

    format!(
        "Analyze the business model from the findings and segment detail below:\n\n\
         ## Business insight findings\n{insight}\n\n\
         ## Segment revenue detail\n{segments}\n\n\
         Focus on revenue sources, the shape of the model, moats, pricing \
         power read from segment margins, and cross-segment synergies.\n",
        insight = summary_or_payload(business_insight),
        segments = pretty(&segment_rows),
    )
}

fn build_forecast_prompt(
    profitability: &StageResult,
    business_insight: &StageResult,
    dataset: &FinancialDataset,
) -> String {
    let guidance: Vec<Value> = head(&dataset.forecast, 5)
        .iter()
        .map(|r| {
            json!({
                "annDate": r.ann_date,
                "period": r.end_date,
                "type": r.forecast_type,
                "netProfitChangeMinPct": r.net_profit_change_min_pct,
                "netProfitChangeMaxPct": r.net_profit_change_max_pct,
                "netProfitMin": r.net_profit_min,
                "netProfitMax": r.net_profit_max,
                "priorNetProfit": r.prior_net_profit,
                "summary": r.summary,
                "changeReason": r.change_reason,
            })
        })
        .collect();

    let flashes: Vec<Value> = head(&dataset.express, 3)
        .iter()
        .map(|r| {
            json!({
                "annDate": r.ann_date,
                "period": r.end_date,
                "revenueB": r.revenue.map(|v| v / 1e9),
                "operatingProfitB": r.operating_profit.map(|v| v / 1e9),
                "netIncomeB": r.net_income.map(|v| v / 1e9),
                "dilutedEps": r.diluted_eps,
                "dilutedRoe": r.diluted_roe,
                "summary": r.summary,
            })
        })
        .collect();

    let growth: Vec<Value> = head(&dataset.indicators, 4)
        .iter()
        .map(|r| {
            json!({
                "period": r.end_date,
                "revenueYoy": r.revenue_yoy,
                "netIncomeYoy": r.net_income_yoy,
                "operatingProfitYoy": r.operating_profit_yoy,
            })
        })
        .collect();

    let guidance_block = if guidance.is_empty() {
        "No management guidance available".to_string()
    } else {
        pretty(&guidance)
    };
    let flash_block = if flashes.is_empty() {
        "No earnings flash available".to_string()
    } else {
        pretty(&flashes)
    };

    format!(
        "Forecast earnings from the data below:\n\n\
         ## Profitability findings\n{profitability}\n\n\
         ## Business insight findings\n{insight}\n\n\
         ## Management guidance (most authoritative reference)\n{guidance}\n\n\
         ## Earnings flashes\n{flashes}\n\n\
         ## Historical growth rates\n{growth}\n",
        profitability = summary_or_payload(profitability),
        insight = summary_or_payload(business_insight),
        guidance = guidance_block,
        flashes = flash_block,
        growth = pretty(&growth),
    )
}

fn build_valuation_prompt(
    dataset: &FinancialDataset,
    profitability: &StageResult,
    balance_sheet: &StageResult,
) -> String {
    let latest_daily = dataset.daily.first().cloned().unwrap_or_default();
    let latest_indicator = dataset.indicators.first().cloned().unwrap_or_default();

    let mean_of = |field: fn(&finsight_data::DailyValuationRecord) -> Option<f64>| {
        let values: Vec<f64> = head(&dataset.daily, 30)
            .iter()
            .filter_map(field)
            .filter(|v| *v > 0.0)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };

    format!(
        "Assess the valuation of this company:\n\n\
         ## Current market metrics (latest trading day {trade_date})\n\
         - Close: {close}\n\
         - PE (TTM): {pe}\n\
         - PB: {pb}\n\
         - PS (TTM): {ps}\n\
         - Turnover rate: {turnover}%\n\
         - Volume ratio: {volume_ratio}\n\
         - Total market value (B): {total_mv}\n\
         - Circulating market value (B): {circ_mv}\n\
         - Dividend yield (TTM): {dividend}%\n\n\
         ## 30-day averages\n\
         - Mean PE: {mean_pe}\n\
         - Mean PB: {mean_pb}\n\
         - Mean PS: {mean_ps}\n\n\
         ## Latest financial ratios\n\
         - ROE: {roe}%\n\
         - ROA: {roa}%\n\
         - EPS: {eps}\n\
         - BPS: {bps}\n\
         - Gross margin: {gross_margin}%\n\
         - Net margin: {net_margin}%\n\n\
         ## Profitability findings\n{profitability}\n\n\
         ## Balance sheet findings\n{balance_sheet}\n",
        trade_date = if latest_daily.trade_date.is_empty() {
            "n/a"
        } else {
            latest_daily.trade_date.as_str()
        },
        close = fmt_opt(latest_daily.close),
        pe = fmt_opt(latest_daily.pe_ttm),
        pb = fmt_opt(latest_daily.pb),
        ps = fmt_opt(latest_daily.ps_ttm),
        turnover = fmt_opt(latest_daily.turnover_rate),
        volume_ratio = fmt_opt(latest_daily.volume_ratio),
        total_mv = fmt_opt(latest_daily.total_market_value.map(|v| v / 1e9)),
        circ_mv = fmt_opt(latest_daily.circulating_market_value.map(|v| v / 1e9)),
        dividend = fmt_opt(latest_daily.dividend_yield_ttm),
        mean_pe = fmt_opt(mean_of(|d| d.pe_ttm)),
        mean_pb = fmt_opt(mean_of(|d| d.pb)),
        mean_ps = fmt_opt(mean_of(|d| d.ps_ttm)),
        roe = fmt_opt(latest_indicator.roe),
        roa = fmt_opt(latest_indicator.roa),
        eps = fmt_opt(latest_indicator.eps),
        bps = fmt_opt(latest_indicator.bps),
        gross_margin = fmt_opt(latest_indicator.gross_margin),
        net_margin = fmt_opt(latest_indicator.net_margin),
        profitability = summary_or_payload(profitability),
        balance_sheet = summary_or_payload(balance_sheet),
    )
}

#[allow(clippy::too_many_arguments)]
fn build_final_conclusion_prompt(
    planning: &StageResult,
    profitability: &StageResult,
    balance_sheet: &StageResult,
    cash_flow: &StageResult,
    trend_interpretation: Option<&StageResult>,
    earnings_quality: &StageResult,
    risk: &StageResult,
    business_insight: &StageResult,
    business_model: Option<&StageResult>,
    forecast: Option<&StageResult>,
    valuation: &StageResult,
) -> String {
    let optional_payload = |result: Option<&StageResult>| {
        result.map_or(Value::Null, |r| Value::Object(r.payload.clone()))
    };

    let all_results = json!({
        "planning": planning.payload,
        "profitability": profitability.payload,
        "balanceSheet": balance_sheet.payload,
        "cashFlow": cash_flow.payload,
        "trendInterpretation": optional_payload(trend_interpretation),
        "earningsQuality": earnings_quality.payload,
        "risk": risk.payload,
        "businessInsight": business_insight.payload,
        "businessModel": optional_payload(business_model),
        "forecast": optional_payload(forecast),
        "valuation": valuation.payload,
    });

    format!(
        "Synthesize all analysis results below into a final investment \
         conclusion. Ground the valuation judgement in the valuation \
         assessment included here.\n\n{results}\n",
        results = pretty(&all_results),
    )
}

/// Income rows merged with indicator rows per period, oldest first, last 12
/// periods
fn merged_trend_rows(dataset: &FinancialDataset) -> Vec<Value> {
    let mut rows: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

    for record in &dataset.income {
        if record.end_date.is_empty() {
            continue;
        }
        let row = rows.entry(record.end_date.clone()).or_default();
        row.insert("endDate".to_string(), json!(record.end_date));
        row.insert("annDate".to_string(), json!(record.ann_date));
        row.insert(
            "netIncomeAttrParent".to_string(),
            json!(record.net_income_attr_parent),
        );
        row.insert("totalRevenue".to_string(), json!(record.total_revenue));
        row.insert(
            "operatingProfit".to_string(),
            json!(record.operating_profit),
        );
        row.insert("basicEps".to_string(), json!(record.basic_eps));
    }

    for record in &dataset.indicators {
        if record.end_date.is_empty() {
            continue;
        }
        let row = rows.entry(record.end_date.clone()).or_default();
        row.insert("endDate".to_string(), json!(record.end_date));
        row.insert("grossMargin".to_string(), json!(record.gross_margin));
        row.insert("netMargin".to_string(), json!(record.net_margin));
        row.insert("roe".to_string(), json!(record.roe));
        row.insert("debtToAssets".to_string(), json!(record.debt_to_assets));
        row.insert("netIncomeYoy".to_string(), json!(record.net_income_yoy));
        row.insert("revenueYoy".to_string(), json!(record.revenue_yoy));
        row.insert(
            "operatingProfitYoy".to_string(),
            json!(record.operating_profit_yoy),
        );
        if let Some(eps) = record.eps {
            row.insert("eps".to_string(), json!(eps));
        }
    }

    let total = rows.len();
    rows.into_values()
        .skip(total.saturating_sub(12))
        .map(Value::Object)
        .collect()
}

/// Key findings from the three statement analyses, as trend context
fn analysis_context(
    profitability: &StageResult,
    balance_sheet: &StageResult,
    cash_flow: &StageResult,
) -> String {
    format!(
        "## Income statement summary\n\
         - Revenue trend: {rev_trend}\n\
         - Revenue growth: {rev_growth}\n\
         - Profit sustainability: {sustainability}\n\n\
         ## Balance sheet summary\n\
         - Financial health: {health}\n\
         - Leverage level: {leverage}\n\
         - Liquidity: {liquidity}\n\n\
         ## Cash flow summary\n\
         - Operating cash quality: {ocf_quality}\n\
         - Free cash flow trend: {fcf_trend}\n\
         - Cash generation: {generation}\n",
        rev_trend = path_text(&profitability.payload, &["revenueAnalysis", "trend"]),
        rev_growth = path_text(&profitability.payload, &["revenueAnalysis", "growthRate"]),
        sustainability = path_text(&profitability.payload, &["sustainability", "conclusion"]),
        health = path_text(&balance_sheet.payload, &["financialHealth", "conclusion"]),
        leverage = path_text(&balance_sheet.payload, &["leverageAnalysis", "debtLevel"]),
        liquidity = path_text(&balance_sheet.payload, &["financialHealth", "liquidity"]),
        ocf_quality = path_text(&cash_flow.payload, &["operatingCashFlow", "quality"]),
        fcf_trend = path_text(&cash_flow.payload, &["freeCashFlow", "trend"]),
        generation = path_text(&cash_flow.payload, &["operatingCashFlow", "sustainability"]),
    )
}

fn build_trend_prompt(
    options: &AnalysisOptions,
    industry: &str,
    profile: &IndustryProfile,
    merged_rows: &[Value],
    context: &str,
) -> String {
    format!(
        "## Company\n\
         - Name: {name}\n\
         - Code: {code}\n\
         - Industry: {industry}\n\n\
         ## Industry characteristics\n{description}\n\n\
         ## Industry key factors\n{factors}\n\n\
         ## Industry risk factors\n{risks}\n\n\
         ## Industry benchmarks\n\
         - Gross margin: {bench_gross}%\n\
         - Net margin: {bench_net}%\n\
         - ROE: {bench_roe}%\n\n\
         ## Financial data (up to 12 recent periods, income merged with ratios)\n{rows}\n\n\
         ## Statement analysis context\n{context}\n\n\
         Produce the trend interpretations for the seven core indicators.\n",
        name = options.company_name,
        code = options.company_code,
        industry = industry,
        description = profile.description,
        factors = profile.key_factors.join(", "),
        risks = profile.risks.join(", "),
        bench_gross = fmt_opt(profile.benchmarks.gross_margin),
        bench_net = fmt_opt(profile.benchmarks.net_margin),
        bench_roe = fmt_opt(profile.benchmarks.roe),
        rows = pretty(&merged_rows),
        context = context,
    )
}
