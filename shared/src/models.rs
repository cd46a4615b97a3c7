use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════
// LEDGER TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// A single ledger entry. Immutable once written — corrections are modeled
/// as new offsetting transactions, never as updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Positive = revenue, negative = cost (COGS, marketing spend, …).
    pub amount: Decimal,
    /// ISO 4217 code.
    pub currency: String,
    /// Timestamp used for all windowing.
    pub occurred_at: DateTime<Utc>,
    /// Separates subscription revenue from one-time sales.
    pub is_recurring: bool,
    pub source_category: SourceCategory,
    /// Tenant reference; `None` means platform-wide.
    pub scope: Option<Uuid>,
    /// Idempotency key from the source system.
    pub external_id: Option<String>,
    pub description: Option<String>,
}

/// Semantic classification of a ledger entry.
///
/// The source systems report free-form type strings; they are normalized to
/// this closed set at ingestion time, with `Unclassified` as the explicit
/// catch-all for tags the metrics logic does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    NewSubscription,
    Upgrade,
    Downgrade,
    Cancellation,
    RecurringRevenue,
    OneTimeSale,
    MarketingSpend,
    SalesSpend,
    HostingCost,
    SupportCost,
    PaymentProcessingFee,
    Unclassified,
}

impl SourceCategory {
    /// Normalize a raw source-system tag. Unknown tags map to `Unclassified`
    /// rather than failing the row.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "new_subscription" | "new-subscription" => SourceCategory::NewSubscription,
            "upgrade" | "expansion" => SourceCategory::Upgrade,
            "downgrade" | "contraction" => SourceCategory::Downgrade,
            "cancellation" | "churn" => SourceCategory::Cancellation,
            "recurring_revenue" | "subscription" => SourceCategory::RecurringRevenue,
            "one_time_sale" | "one-time" => SourceCategory::OneTimeSale,
            "marketing_spend" | "marketing" => SourceCategory::MarketingSpend,
            "sales_spend" | "sales" => SourceCategory::SalesSpend,
            "hosting_cost" | "hosting" => SourceCategory::HostingCost,
            "support_cost" | "support" => SourceCategory::SupportCost,
            "payment_processing_fee" | "payment_processing" => {
                SourceCategory::PaymentProcessingFee
            }
            _ => SourceCategory::Unclassified,
        }
    }

    /// Cost-of-goods-sold buckets used by the gross-margin computation.
    pub fn is_cogs(&self) -> bool {
        matches!(
            self,
            SourceCategory::HostingCost
                | SourceCategory::SupportCost
                | SourceCategory::PaymentProcessingFee
        )
    }

    /// Acquisition-spend buckets used by the CAC computation.
    pub fn is_acquisition_spend(&self) -> bool {
        matches!(
            self,
            SourceCategory::MarketingSpend | SourceCategory::SalesSpend
        )
    }

    /// Tags whose rows count as subscription (recurring) revenue.
    pub fn implies_recurring(&self) -> bool {
        matches!(self, SourceCategory::RecurringRevenue)
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            SourceCategory::NewSubscription => "new_subscription",
            SourceCategory::Upgrade => "upgrade",
            SourceCategory::Downgrade => "downgrade",
            SourceCategory::Cancellation => "cancellation",
            SourceCategory::RecurringRevenue => "recurring_revenue",
            SourceCategory::OneTimeSale => "one_time_sale",
            SourceCategory::MarketingSpend => "marketing_spend",
            SourceCategory::SalesSpend => "sales_spend",
            SourceCategory::HostingCost => "hosting_cost",
            SourceCategory::SupportCost => "support_cost",
            SourceCategory::PaymentProcessingFee => "payment_processing_fee",
            SourceCategory::Unclassified => "unclassified",
        };
        write!(f, "{}", tag)
    }
}

/// A tenant as exposed by the tenant directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// METRIC SNAPSHOT TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Aggregation level of a metric snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Platform,
    Vertical,
    Tenant,
}

impl std::fmt::Display for ScopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeType::Platform => write!(f, "platform"),
            ScopeType::Vertical => write!(f, "vertical"),
            ScopeType::Tenant => write!(f, "tenant"),
        }
    }
}

/// Immutable point-in-time copy of the computed metrics, written once per
/// evaluation cycle for historical trend analysis.
///
/// Metrics that do not apply at a given scope (e.g. quick ratio for a single
/// tenant) are recorded as zero, matching the engine's sentinel convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub id: Uuid,
    pub date: NaiveDate,
    pub scope_type: ScopeType,
    pub scope_id: Option<Uuid>,
    pub mrr: Decimal,
    pub arr: Decimal,
    pub gross_margin_pct: Decimal,
    pub ltv: Decimal,
    pub ltv_cac_ratio: Decimal,
    pub cac_payback_months: Decimal,
    pub quick_ratio: Decimal,
    pub revenue_per_employee: Decimal,
    pub created_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// ALERT TYPES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    MarginAlert,
    MrrDrop,
    ChurnRisk,
    LtvCacWarning,
    PaybackExceeded,
    ExpansionOpportunity,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            AlertType::MarginAlert => "margin_alert",
            AlertType::MrrDrop => "mrr_drop",
            AlertType::ChurnRisk => "churn_risk",
            AlertType::LtvCacWarning => "ltv_cac_warning",
            AlertType::PaybackExceeded => "payback_exceeded",
            AlertType::ExpansionOpportunity => "expansion_opportunity",
        };
        write!(f, "{}", tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    /// Open and acknowledged alerts both block re-raising the same condition.
    pub fn is_active(&self) -> bool {
        !matches!(self, AlertStatus::Resolved)
    }
}

/// A threshold breach with its prescriptive remediation playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub message: String,
    /// Tenant the alert concerns; `None` for platform-level alerts.
    pub related_scope: Option<Uuid>,
    pub metric_value: Decimal,
    pub threshold: Decimal,
    pub playbook: String,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// At most one active alert may exist per dedup key at any time.
    pub fn dedup_key(&self) -> (AlertType, Option<Uuid>) {
        (self.alert_type, self.related_scope)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ANALYTICS & FORECAST TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Unit-economics health band, classified from the LTV:CAC ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Vip,
    Healthy,
    AtRisk,
    InLoss,
}

impl HealthStatus {
    pub fn from_ratio(ratio: Decimal) -> Self {
        if ratio >= Decimal::from(5) {
            HealthStatus::Vip
        } else if ratio >= Decimal::from(3) {
            HealthStatus::Healthy
        } else if ratio >= Decimal::ONE {
            HealthStatus::AtRisk
        } else {
            HealthStatus::InLoss
        }
    }
}

/// Per-tenant unit economics, aggregated across the whole directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantAnalytics {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub mrr: Decimal,
    pub ltv: Decimal,
    pub cac: Decimal,
    pub ltv_cac_ratio: Decimal,
    pub payback_months: Decimal,
    pub health_status: HealthStatus,
}

/// Named growth/churn scenario for revenue projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastScenario {
    Base,
    Optimistic,
    Pessimistic,
    Custom,
}

impl std::fmt::Display for ForecastScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastScenario::Base => write!(f, "base"),
            ForecastScenario::Optimistic => write!(f, "optimistic"),
            ForecastScenario::Pessimistic => write!(f, "pessimistic"),
            ForecastScenario::Custom => write!(f, "custom"),
        }
    }
}

/// Caller-supplied per-period rates for the `custom` scenario.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CustomRates {
    pub growth_rate: Decimal,
    pub churn_rate: Decimal,
}

/// One projected period of the forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectedPeriod {
    pub period: u32,
    pub mrr: Decimal,
    pub arr: Decimal,
}

/// Metric snapshot the projection starts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineMetrics {
    pub mrr: Decimal,
    pub arr: Decimal,
    pub gross_margin_pct: Decimal,
    pub ltv: Decimal,
    pub ltv_cac_ratio: Decimal,
    pub arpu: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub start_mrr: Decimal,
    pub end_mrr: Decimal,
    pub total_growth_pct: Decimal,
    pub monthly_growth_rate: Decimal,
    pub monthly_churn_rate: Decimal,
}

/// Scenario projection result. Ephemeral — recomputed on demand, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastProjection {
    pub scenario: ForecastScenario,
    pub horizon_periods: u32,
    pub baseline: BaselineMetrics,
    pub periods: Vec<ProjectedPeriod>,
    pub summary: ForecastSummary,
    pub generated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// IMPORT TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// One raw row from an external export, pre-parse. Column order follows the
/// agreed import shape: amount, currency, type, date, tenant_id, external_id,
/// description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRecord {
    pub amount: String,
    pub currency: String,
    pub record_type: String,
    pub date: String,
    pub tenant_id: Option<String>,
    pub external_id: Option<String>,
    pub description: Option<String>,
}

/// A row that failed to transform, tagged with its batch position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportError {
    pub row: usize,
    pub external_id: Option<String>,
    pub message: String,
}

/// Outcome of one import batch. Partial success is a normal result, not an
/// error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}
