// engine/src/snapshot.rs
// Persists an immutable point-in-time copy of all computed metrics, one
// platform row plus one row per tenant, for historical trend analysis.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{MetricSnapshot, ScopeType};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{EngineResult, StoreError};
use crate::metrics::MetricsCalculator;

/// Snapshot persistence seam. Snapshots are write-once; there is no update.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn insert(&self, snapshot: MetricSnapshot) -> Result<Uuid, StoreError>;
    async fn history(
        &self,
        scope_type: ScopeType,
        scope_id: Option<Uuid>,
    ) -> Result<Vec<MetricSnapshot>, StoreError>;
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<Vec<MetricSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn insert(&self, snapshot: MetricSnapshot) -> Result<Uuid, StoreError> {
        let id = snapshot.id;
        self.snapshots.write().await.push(snapshot);
        Ok(id)
    }

    async fn history(
        &self,
        scope_type: ScopeType,
        scope_id: Option<Uuid>,
    ) -> Result<Vec<MetricSnapshot>, StoreError> {
        let mut rows: Vec<MetricSnapshot> = self
            .snapshots
            .read()
            .await
            .iter()
            .filter(|s| s.scope_type == scope_type && s.scope_id == scope_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.date);
        Ok(rows)
    }
}

pub struct SnapshotWriter {
    calculator: MetricsCalculator,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl SnapshotWriter {
    pub fn new(
        calculator: MetricsCalculator,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            calculator,
            store,
            clock,
        }
    }

    /// One snapshot cycle: the platform row, then one row per tenant.
    /// Best-effort — a failed tenant write is logged and the cycle
    /// continues. Returns the snapshots actually written.
    pub async fn write_all(&self) -> EngineResult<Vec<MetricSnapshot>> {
        let date = self.clock.now().date_naive();
        let mut written = Vec::new();

        let platform = self.platform_snapshot(date).await?;
        self.persist(platform, &mut written).await;

        let analytics = self.calculator.tenant_analytics().await?;
        for row in analytics.iter() {
            let snapshot = MetricSnapshot {
                id: Uuid::new_v4(),
                date,
                scope_type: ScopeType::Tenant,
                scope_id: Some(row.tenant_id),
                mrr: row.mrr,
                arr: (row.mrr * Decimal::from(12)).round_dp(2),
                gross_margin_pct: self
                    .calculator
                    .gross_margin(Some(row.tenant_id), None)
                    .await?,
                ltv: row.ltv,
                ltv_cac_ratio: row.ltv_cac_ratio,
                cac_payback_months: row.payback_months,
                // Platform-level metrics; recorded as zero at tenant scope.
                quick_ratio: Decimal::ZERO,
                revenue_per_employee: Decimal::ZERO,
                created_at: self.clock.now(),
            };
            self.persist(snapshot, &mut written).await;
        }

        tracing::info!(snapshots = written.len(), date = %date, "snapshot cycle complete");
        Ok(written)
    }

    async fn platform_snapshot(&self, date: chrono::NaiveDate) -> EngineResult<MetricSnapshot> {
        Ok(MetricSnapshot {
            id: Uuid::new_v4(),
            date,
            scope_type: ScopeType::Platform,
            scope_id: None,
            mrr: self.calculator.mrr(None, None).await?,
            arr: self.calculator.arr(None).await?,
            gross_margin_pct: self.calculator.gross_margin(None, None).await?,
            ltv: self.calculator.ltv(None).await?,
            ltv_cac_ratio: self.calculator.ltv_cac_ratio(None).await?,
            cac_payback_months: self.calculator.cac_payback_months().await?,
            quick_ratio: self.calculator.quick_ratio(None).await?,
            revenue_per_employee: self.calculator.revenue_per_employee(None).await?,
            created_at: self.clock.now(),
        })
    }

    async fn persist(&self, snapshot: MetricSnapshot, written: &mut Vec<MetricSnapshot>) {
        match self.store.insert(snapshot.clone()).await {
            Ok(_) => written.push(snapshot),
            Err(err) => tracing::error!(
                error = %err,
                scope_type = %snapshot.scope_type,
                scope_id = ?snapshot.scope_id,
                "failed to write snapshot, continuing"
            ),
        }
    }
}
