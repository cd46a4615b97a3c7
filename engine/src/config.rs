// engine/src/config.rs
// All thresholds and unit-economics assumptions in one value, passed
// explicitly into every component. No ambient/global configuration.

use rust_decimal::Decimal;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tenants below this LTV:CAC ratio raise churn-risk alerts.
    pub ltv_cac_minimum: Decimal,
    /// Month-over-month MRR drop (percent) that raises an alert.
    pub mrr_drop_threshold_pct: Decimal,
    /// Platform gross margin (percent) below which an alert is raised.
    pub gross_margin_floor_pct: Decimal,
    /// Gross margin below this is critical rather than warning.
    pub gross_margin_critical_pct: Decimal,
    /// CAC payback above this many months raises an alert.
    pub payback_warning_months: Decimal,
    /// Payback above this many months is critical.
    pub payback_critical_months: Decimal,
    /// LTV:CAC at or above this flags an upsell opportunity.
    pub expansion_ratio: Decimal,

    /// Assumed margin fraction when computing LTV and payback (default 0.75).
    pub gross_margin_fraction: Decimal,
    /// Assumed monthly churn fraction when no tenant-specific signal exists
    /// (default 0.05). LTV floors this at 0.01.
    pub churn_rate_fraction: Decimal,
    /// Fallback CAC when spend or new-customer count is zero. Using it is
    /// logged — it must never be mistaken for a true zero CAC.
    pub reference_cac: Decimal,
    /// Trailing window for CAC spend and new-customer attribution.
    pub cac_window_months: u32,
    /// Sentinel returned by the quick ratio when nothing churned.
    pub quick_ratio_cap: Decimal,
    /// Headcount for revenue-per-employee; 0 resolves the metric to 0.
    pub employee_count: u32,

    /// TTL for the cached tenant-analytics aggregate.
    pub analytics_cache_ttl: Duration,
    pub analytics_cache_capacity: u64,

    /// Import stops (reporting partial success) after this many rows.
    pub import_max_rows: usize,
    /// Import stops after collecting this many row errors.
    pub import_max_errors: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ltv_cac_minimum: Decimal::from(3),
            mrr_drop_threshold_pct: Decimal::from(10),
            gross_margin_floor_pct: Decimal::from(70),
            gross_margin_critical_pct: Decimal::from(60),
            payback_warning_months: Decimal::from(12),
            payback_critical_months: Decimal::from(18),
            expansion_ratio: Decimal::from(5),
            gross_margin_fraction: Decimal::new(75, 2),
            churn_rate_fraction: Decimal::new(5, 2),
            reference_cac: Decimal::new(200_00, 2),
            cac_window_months: 3,
            quick_ratio_cap: Decimal::new(99_00, 2),
            employee_count: 0,
            analytics_cache_ttl: Duration::from_secs(300),
            analytics_cache_capacity: 1_024,
            import_max_rows: 10_000,
            import_max_errors: 100,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with fallback to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        read_decimal("LTV_CAC_MINIMUM", &mut config.ltv_cac_minimum);
        read_decimal("MRR_DROP_THRESHOLD_PCT", &mut config.mrr_drop_threshold_pct);
        read_decimal("GROSS_MARGIN_FLOOR_PCT", &mut config.gross_margin_floor_pct);
        read_decimal(
            "GROSS_MARGIN_CRITICAL_PCT",
            &mut config.gross_margin_critical_pct,
        );
        read_decimal("PAYBACK_WARNING_MONTHS", &mut config.payback_warning_months);
        read_decimal(
            "PAYBACK_CRITICAL_MONTHS",
            &mut config.payback_critical_months,
        );
        read_decimal("EXPANSION_RATIO", &mut config.expansion_ratio);
        read_decimal("GROSS_MARGIN_FRACTION", &mut config.gross_margin_fraction);
        read_decimal("CHURN_RATE_FRACTION", &mut config.churn_rate_fraction);
        read_decimal("REFERENCE_CAC", &mut config.reference_cac);
        read_decimal("QUICK_RATIO_CAP", &mut config.quick_ratio_cap);

        if let Ok(raw) = std::env::var("CAC_WINDOW_MONTHS") {
            if let Ok(months) = raw.parse::<u32>() {
                config.cac_window_months = months;
            }
        }
        if let Ok(raw) = std::env::var("EMPLOYEE_COUNT") {
            if let Ok(count) = raw.parse::<u32>() {
                config.employee_count = count;
            }
        }
        if let Ok(raw) = std::env::var("ANALYTICS_CACHE_TTL_SECONDS") {
            if let Ok(secs) = raw.parse::<u64>() {
                config.analytics_cache_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("IMPORT_MAX_ROWS") {
            if let Ok(rows) = raw.parse::<usize>() {
                config.import_max_rows = rows;
            }
        }
        if let Ok(raw) = std::env::var("IMPORT_MAX_ERRORS") {
            if let Ok(errors) = raw.parse::<usize>() {
                config.import_max_errors = errors;
            }
        }

        tracing::info!(
            ltv_cac_minimum = %config.ltv_cac_minimum,
            mrr_drop_threshold_pct = %config.mrr_drop_threshold_pct,
            gross_margin_floor_pct = %config.gross_margin_floor_pct,
            reference_cac = %config.reference_cac,
            cac_window_months = config.cac_window_months,
            analytics_cache_ttl = ?config.analytics_cache_ttl,
            "Engine config loaded"
        );

        config
    }
}

fn read_decimal(key: &str, target: &mut Decimal) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse::<Decimal>() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!(key, raw = %raw, "Ignoring unparseable config value"),
        }
    }
}
