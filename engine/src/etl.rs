// engine/src/etl.rs
// Idempotent batch ingestion. One bad row never aborts the batch; duplicate
// external ids are skipped, both within a batch and against the ledger.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use shared::{ImportError, ImportRecord, ImportSummary, SourceCategory, Transaction};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineResult, StoreError};
use crate::ledger::LedgerStore;

pub struct Importer {
    ledger: Arc<dyn LedgerStore>,
    config: EngineConfig,
}

impl Importer {
    pub fn new(ledger: Arc<dyn LedgerStore>, config: EngineConfig) -> Self {
        Self { ledger, config }
    }

    /// Import a batch of external records. Row-level transform failures are
    /// collected and the batch continues; infrastructure failures abort the
    /// call (rows already inserted stay committed). The configured row and
    /// error ceilings terminate the batch early with partial success.
    pub async fn import(&self, records: &[ImportRecord]) -> EngineResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        let mut seen_in_batch: HashSet<String> = HashSet::new();

        for (row, record) in records.iter().enumerate() {
            if summary.imported + summary.skipped >= self.config.import_max_rows {
                tracing::warn!(
                    row,
                    max_rows = self.config.import_max_rows,
                    "import row ceiling reached, stopping batch early"
                );
                break;
            }
            if summary.errors.len() >= self.config.import_max_errors {
                tracing::warn!(
                    row,
                    max_errors = self.config.import_max_errors,
                    "import error ceiling reached, stopping batch early"
                );
                break;
            }

            let tx = match transform(record) {
                Ok(tx) => tx,
                Err(message) => {
                    summary.errors.push(ImportError {
                        row,
                        external_id: record.external_id.clone(),
                        message,
                    });
                    continue;
                }
            };

            if let Some(external_id) = tx.external_id.clone() {
                if seen_in_batch.contains(&external_id)
                    || self.ledger.exists_by_external_id(&external_id).await?
                {
                    summary.skipped += 1;
                    seen_in_batch.insert(external_id);
                    continue;
                }
                seen_in_batch.insert(external_id);
            }

            match self.ledger.insert(tx).await {
                Ok(_) => summary.imported += 1,
                // A concurrent writer won the race on this key; the row
                // exists, so this is a skip, not a failure.
                Err(StoreError::DuplicateExternalId(_)) => summary.skipped += 1,
                Err(err) => return Err(err.into()),
            }
        }

        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "import batch complete"
        );
        Ok(summary)
    }
}

/// Derive a ledger transaction from one raw record.
fn transform(record: &ImportRecord) -> Result<Transaction, String> {
    let amount = record
        .amount
        .trim()
        .parse::<Decimal>()
        .map_err(|_| format!("malformed amount '{}'", record.amount))?;

    let currency = record.currency.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("invalid currency code '{}'", record.currency));
    }

    let occurred_at = parse_date(record.date.trim())
        .ok_or_else(|| format!("unparseable date '{}'", record.date))?;

    let scope = match record.tenant_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            Uuid::parse_str(raw).map_err(|_| format!("invalid tenant id '{raw}'"))?,
        ),
        _ => None,
    };

    let category = SourceCategory::from_tag(&record.record_type);
    if category == SourceCategory::Unclassified {
        tracing::debug!(record_type = %record.record_type, "unrecognized type tag");
    }

    let external_id = record
        .external_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    Ok(Transaction {
        id: Uuid::new_v4(),
        amount,
        currency,
        occurred_at,
        is_recurring: category.implies_recurring(),
        source_category: category,
        scope,
        external_id,
        description: record.description.clone(),
    })
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}
