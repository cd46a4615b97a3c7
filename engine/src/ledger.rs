// engine/src/ledger.rs
// The ledger store seam. The engine only consumes this interface; a
// persistent backend plugs in behind the trait. The in-memory store is the
// reference implementation used by tests and embedding callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{SourceCategory, Transaction};
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

/// Ledger query filter. All constraints are optional and conjunctive.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Inclusive lower bound on `occurred_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `occurred_at`.
    pub to: Option<DateTime<Utc>>,
    /// Restrict to one tenant. `None` means all scopes (platform-wide).
    pub scope: Option<Uuid>,
    pub is_recurring: Option<bool>,
    pub categories: Option<Vec<SourceCategory>>,
}

impl TransactionFilter {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn scoped(mut self, scope: Option<Uuid>) -> Self {
        self.scope = scope;
        self
    }

    pub fn recurring(mut self, is_recurring: bool) -> Self {
        self.is_recurring = Some(is_recurring);
        self
    }

    pub fn with_categories(mut self, categories: Vec<SourceCategory>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(from) = self.from {
            if tx.occurred_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if tx.occurred_at >= to {
                return false;
            }
        }
        if let Some(scope) = self.scope {
            if tx.scope != Some(scope) {
                return false;
            }
        }
        if let Some(is_recurring) = self.is_recurring {
            if tx.is_recurring != is_recurring {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            if !categories.contains(&tx.source_category) {
                return false;
            }
        }
        true
    }
}

/// Append-only transaction store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError>;
    /// Inserts one transaction. Must reject a non-empty `external_id` that
    /// already exists, atomically with the insert.
    async fn insert(&self, tx: Transaction) -> Result<Uuid, StoreError>;
    async fn exists_by_external_id(&self, external_id: &str) -> Result<bool, StoreError>;
}

struct LedgerInner {
    rows: Vec<Transaction>,
    external_ids: HashSet<String>,
}

/// In-memory ledger. The `external_id` uniqueness check and the append
/// happen under one write lock, so concurrent importers cannot both insert
/// the same key.
pub struct InMemoryLedger {
    inner: RwLock<LedgerInner>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerInner {
                rows: Vec::new(),
                external_ids: HashSet::new(),
            }),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Transaction> = inner
            .rows
            .iter()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        rows.sort_by_key(|tx| tx.occurred_at);
        Ok(rows)
    }

    async fn insert(&self, tx: Transaction) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(external_id) = tx.external_id.as_deref().filter(|id| !id.is_empty()) {
            if !inner.external_ids.insert(external_id.to_string()) {
                return Err(StoreError::DuplicateExternalId(external_id.to_string()));
            }
        }
        let id = tx.id;
        inner.rows.push(tx);
        Ok(id)
    }

    async fn exists_by_external_id(&self, external_id: &str) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.external_ids.contains(external_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn tx(amount: i64, at: DateTime<Utc>, category: SourceCategory) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            amount: Decimal::new(amount, 2),
            currency: "EUR".to_string(),
            occurred_at: at,
            is_recurring: category.implies_recurring(),
            source_category: category,
            scope: None,
            external_id: None,
            description: None,
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn time_window_is_half_open() {
        let ledger = InMemoryLedger::new();
        for day in [1, 10, 20] {
            ledger
                .insert(tx(100_00, at(day), SourceCategory::RecurringRevenue))
                .await
                .unwrap();
        }

        let filter = TransactionFilter::between(at(1), at(20));
        let rows = ledger.query(&filter).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_external_id_is_rejected_atomically() {
        let ledger = InMemoryLedger::new();
        let mut first = tx(50_00, at(5), SourceCategory::OneTimeSale);
        first.external_id = Some("stripe-123".to_string());
        let mut second = first.clone();
        second.id = Uuid::new_v4();

        ledger.insert(first).await.unwrap();
        let err = ledger.insert(second).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateExternalId(_)));

        let rows = ledger.query(&TransactionFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(ledger.exists_by_external_id("stripe-123").await.unwrap());
    }

    #[tokio::test]
    async fn category_and_recurring_filters_apply() {
        let ledger = InMemoryLedger::new();
        ledger
            .insert(tx(100_00, at(2), SourceCategory::RecurringRevenue))
            .await
            .unwrap();
        ledger
            .insert(tx(-40_00, at(3), SourceCategory::HostingCost))
            .await
            .unwrap();

        let recurring = TransactionFilter::default().recurring(true);
        assert_eq!(ledger.query(&recurring).await.unwrap().len(), 1);

        let cogs = TransactionFilter::default()
            .with_categories(vec![SourceCategory::HostingCost, SourceCategory::SupportCost]);
        assert_eq!(ledger.query(&cogs).await.unwrap().len(), 1);
    }
}
