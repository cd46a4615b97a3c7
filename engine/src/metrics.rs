// engine/src/metrics.rs
// Pure metric computation over ledger queries. Every operation takes the
// scope/month it needs explicitly and resolves insufficient-data cases to
// documented sentinels instead of erroring.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use moka::future::Cache;
use rust_decimal::Decimal;
use shared::{BaselineMetrics, HealthStatus, SourceCategory, TenantAnalytics};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::ledger::{LedgerStore, TransactionFilter};
use crate::tenants::TenantDirectory;

const ANALYTICS_CACHE_KEY: &str = "tenant_analytics";

/// Half-open UTC window covering the month that contains `anchor`.
pub fn month_window(anchor: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = anchor.with_day0(0).unwrap_or(anchor);
    let next = start.checked_add_months(Months::new(1)).unwrap_or(start);
    (
        start.and_time(NaiveTime::MIN).and_utc(),
        next.and_time(NaiveTime::MIN).and_utc(),
    )
}

/// Any date inside the month before the one containing `anchor`.
pub fn previous_month(anchor: NaiveDate) -> NaiveDate {
    anchor.checked_sub_months(Months::new(1)).unwrap_or(anchor)
}

#[derive(Clone)]
pub struct MetricsCalculator {
    ledger: Arc<dyn LedgerStore>,
    directory: Arc<dyn TenantDirectory>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    analytics_cache: Cache<&'static str, Arc<Vec<TenantAnalytics>>>,
}

impl MetricsCalculator {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        directory: Arc<dyn TenantDirectory>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let analytics_cache = Cache::builder()
            .max_capacity(config.analytics_cache_capacity)
            .time_to_live(config.analytics_cache_ttl)
            .build();
        Self {
            ledger,
            directory,
            config,
            clock,
            analytics_cache,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn anchor(&self, month: Option<NaiveDate>) -> NaiveDate {
        month.unwrap_or_else(|| self.clock.now().date_naive())
    }

    /// Monthly recurring revenue: sum of recurring transactions in the
    /// target month. Defaults to the current month, platform-wide.
    pub async fn mrr(
        &self,
        scope: Option<Uuid>,
        month: Option<NaiveDate>,
    ) -> EngineResult<Decimal> {
        let (from, to) = month_window(self.anchor(month));
        let filter = TransactionFilter::between(from, to)
            .scoped(scope)
            .recurring(true);
        let rows = self.ledger.query(&filter).await?;
        Ok(rows.iter().map(|tx| tx.amount).sum::<Decimal>().round_dp(2))
    }

    /// Annual recurring revenue, always exactly 12 × MRR.
    pub async fn arr(&self, scope: Option<Uuid>) -> EngineResult<Decimal> {
        let mrr = self.mrr(scope, None).await?;
        Ok((mrr * Decimal::from(12)).round_dp(2))
    }

    /// `(Revenue − COGS) / Revenue × 100` for the target month. Revenue is
    /// the sum of positive amounts; COGS is the absolute sum of
    /// hosting/support/payment-processing rows. Zero revenue resolves to 0.
    pub async fn gross_margin(
        &self,
        scope: Option<Uuid>,
        month: Option<NaiveDate>,
    ) -> EngineResult<Decimal> {
        let (from, to) = month_window(self.anchor(month));
        let filter = TransactionFilter::between(from, to).scoped(scope);
        let rows = self.ledger.query(&filter).await?;

        let mut revenue = Decimal::ZERO;
        let mut cogs = Decimal::ZERO;
        for tx in &rows {
            if tx.amount > Decimal::ZERO {
                revenue += tx.amount;
            }
            if tx.source_category.is_cogs() {
                cogs += tx.amount.abs();
            }
        }

        if revenue.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let margin = (revenue - cogs)
            .checked_div(revenue)
            .unwrap_or(Decimal::ZERO)
            * Decimal::ONE_HUNDRED;
        Ok(margin.round_dp(2))
    }

    /// Average revenue per user: platform MRR over the count of tenants
    /// with recurring revenue in the month. Zero when no tenant is active.
    pub async fn arpu(&self, month: Option<NaiveDate>) -> EngineResult<Decimal> {
        let mrr = self.mrr(None, month).await?;
        let active = self.active_customer_count(month).await?;
        if active == 0 {
            return Ok(Decimal::ZERO);
        }
        Ok(mrr
            .checked_div(Decimal::from(active))
            .unwrap_or(Decimal::ZERO)
            .round_dp(2))
    }

    /// Distinct tenant scopes carrying recurring revenue in the month.
    pub async fn active_customer_count(&self, month: Option<NaiveDate>) -> EngineResult<usize> {
        let (from, to) = month_window(self.anchor(month));
        let filter = TransactionFilter::between(from, to).recurring(true);
        let rows = self.ledger.query(&filter).await?;
        let scopes: HashSet<Uuid> = rows.iter().filter_map(|tx| tx.scope).collect();
        Ok(scopes.len())
    }

    /// Customer lifetime value. Tenant-scoped uses the tenant's MRR as the
    /// revenue base; platform-wide uses ARPU. Margin and churn fractions are
    /// configured assumptions, with churn floored at 0.01.
    pub async fn ltv(&self, scope: Option<Uuid>) -> EngineResult<Decimal> {
        let base = match scope {
            Some(tenant) => self.mrr(Some(tenant), None).await?,
            None => self.arpu(None).await?,
        };
        Ok(self.ltv_from_base(base))
    }

    fn ltv_from_base(&self, base: Decimal) -> Decimal {
        let churn = self.config.churn_rate_fraction.max(Decimal::new(1, 2));
        (base * self.config.gross_margin_fraction)
            .checked_div(churn)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2)
    }

    /// Customer acquisition cost over the trailing window: acquisition spend
    /// divided by the number of tenants created in the window. Falls back to
    /// the configured reference CAC when either input is zero; the fallback
    /// is logged so it is never mistaken for a true zero.
    pub async fn cac(&self) -> EngineResult<Decimal> {
        let now = self.clock.now();
        let from = now
            .checked_sub_months(Months::new(self.config.cac_window_months))
            .unwrap_or(now);

        let filter = TransactionFilter::between(from, now).with_categories(vec![
            SourceCategory::MarketingSpend,
            SourceCategory::SalesSpend,
        ]);
        let rows = self.ledger.query(&filter).await?;
        let spend: Decimal = rows.iter().map(|tx| tx.amount.abs()).sum();

        let tenants = self.directory.list_tenants().await?;
        let new_customers = tenants
            .iter()
            .filter(|t| t.created_at >= from && t.created_at <= now)
            .count();

        if spend.is_zero() || new_customers == 0 {
            tracing::warn!(
                spend = %spend,
                new_customers,
                reference_cac = %self.config.reference_cac,
                "CAC inputs incomplete, using reference CAC"
            );
            return Ok(self.config.reference_cac);
        }

        Ok(spend
            .checked_div(Decimal::from(new_customers))
            .unwrap_or(Decimal::ZERO)
            .round_dp(2))
    }

    /// `LTV / CAC`; zero when CAC is zero.
    pub async fn ltv_cac_ratio(&self, scope: Option<Uuid>) -> EngineResult<Decimal> {
        let ltv = self.ltv(scope).await?;
        let cac = self.cac().await?;
        if cac.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(ltv.checked_div(cac).unwrap_or(Decimal::ZERO).round_dp(2))
    }

    /// Months of gross profit needed to recoup CAC; zero when ARPU or the
    /// margin fraction zeroes the denominator.
    pub async fn cac_payback_months(&self) -> EngineResult<Decimal> {
        let cac = self.cac().await?;
        let denominator = self.arpu(None).await? * self.config.gross_margin_fraction;
        if denominator.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(cac
            .checked_div(denominator)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2))
    }

    /// SaaS quick ratio for the target month, bucketed by the tag taxonomy.
    /// When nothing churned, returns the capped sentinel if there was any
    /// growth, else zero — never an unbounded ratio.
    pub async fn quick_ratio(&self, month: Option<NaiveDate>) -> EngineResult<Decimal> {
        let (from, to) = month_window(self.anchor(month));
        let filter = TransactionFilter::between(from, to).with_categories(vec![
            SourceCategory::NewSubscription,
            SourceCategory::Upgrade,
            SourceCategory::Cancellation,
            SourceCategory::Downgrade,
        ]);
        let rows = self.ledger.query(&filter).await?;

        let mut growth = Decimal::ZERO;
        let mut loss = Decimal::ZERO;
        for tx in &rows {
            match tx.source_category {
                SourceCategory::NewSubscription | SourceCategory::Upgrade => {
                    growth += tx.amount.abs()
                }
                SourceCategory::Cancellation | SourceCategory::Downgrade => {
                    loss += tx.amount.abs()
                }
                _ => {}
            }
        }

        if loss.is_zero() {
            if growth > Decimal::ZERO {
                return Ok(self.config.quick_ratio_cap);
            }
            return Ok(Decimal::ZERO);
        }
        Ok(growth.checked_div(loss).unwrap_or(Decimal::ZERO).round_dp(2))
    }

    /// Positive revenue in the month over configured headcount; zero when no
    /// headcount is configured.
    pub async fn revenue_per_employee(&self, month: Option<NaiveDate>) -> EngineResult<Decimal> {
        if self.config.employee_count == 0 {
            return Ok(Decimal::ZERO);
        }
        let (from, to) = month_window(self.anchor(month));
        let rows = self
            .ledger
            .query(&TransactionFilter::between(from, to))
            .await?;
        let revenue: Decimal = rows
            .iter()
            .filter(|tx| tx.amount > Decimal::ZERO)
            .map(|tx| tx.amount)
            .sum();
        Ok(revenue
            .checked_div(Decimal::from(self.config.employee_count))
            .unwrap_or(Decimal::ZERO)
            .round_dp(2))
    }

    /// Unit economics for every known tenant, with health classification.
    /// Cached with a short TTL since it aggregates the whole directory;
    /// entries simply expire, no explicit invalidation.
    pub async fn tenant_analytics(&self) -> EngineResult<Arc<Vec<TenantAnalytics>>> {
        if let Some(cached) = self.analytics_cache.get(&ANALYTICS_CACHE_KEY).await {
            tracing::debug!("tenant analytics served from cache");
            return Ok(cached);
        }

        let tenants = self.directory.list_tenants().await?;
        let cac = self.cac().await?;
        let mut analytics = Vec::with_capacity(tenants.len());

        for tenant in tenants {
            let mrr = self.mrr(Some(tenant.id), None).await?;
            let ltv = self.ltv_from_base(mrr);
            let ratio = if cac.is_zero() {
                Decimal::ZERO
            } else {
                ltv.checked_div(cac).unwrap_or(Decimal::ZERO).round_dp(2)
            };
            let payback_denominator = mrr * self.config.gross_margin_fraction;
            let payback_months = if payback_denominator.is_zero() {
                Decimal::ZERO
            } else {
                cac.checked_div(payback_denominator)
                    .unwrap_or(Decimal::ZERO)
                    .round_dp(2)
            };

            analytics.push(TenantAnalytics {
                tenant_id: tenant.id,
                tenant_name: tenant.name,
                mrr,
                ltv,
                cac,
                ltv_cac_ratio: ratio,
                payback_months,
                health_status: HealthStatus::from_ratio(ratio),
            });
        }

        let analytics = Arc::new(analytics);
        self.analytics_cache
            .insert(ANALYTICS_CACHE_KEY, analytics.clone())
            .await;
        Ok(analytics)
    }

    /// Current platform metrics in one bundle, as read by the forecaster.
    pub async fn baseline(&self) -> EngineResult<BaselineMetrics> {
        Ok(BaselineMetrics {
            mrr: self.mrr(None, None).await?,
            arr: self.arr(None).await?,
            gross_margin_pct: self.gross_margin(None, None).await?,
            ltv: self.ltv(None).await?,
            ltv_cac_ratio: self.ltv_cac_ratio(None).await?,
            arpu: self.arpu(None).await?,
        })
    }
}
