//! The Report Store facade.
//!
//! Composes the content store, metadata index, query planner, and report
//! cache into the nine public operations: store, get, search, bulk store,
//! delete-with-audit, archive, storage metrics, integrity validation, and
//! point metadata lookup.
//!
//! Writes flow content-first, then a create-only metadata write; the two
//! backends are independent, so a losing create-only race strands the
//! just-written content object. That window is accepted and bounded:
//! integrity validation surfaces it, nothing masks it.

use chrono::{DateTime, Duration, Utc};
use reportvault_core::{
    ArchiveOutcome, BulkFailure, BulkStoreOutcome, ComplianceReport, ContentStore, DeleteAudit,
    HealthStatus, IndexStore, IntegrityReport, KeyCondition, MetadataUpdate, ReportId,
    ReportMetadata, ReportStatus, ReportStoreConfig, ReportVaultError, Result, ScanFilter,
    SearchCriteria, SearchResults, StorageMetrics, StoreReceipt,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::ReportCache;
use crate::derive;
use crate::planner::{self, FetchPath, QueryPlanner};

/// Flat storage price assumed for the hot tier, per GiB-month.
const STANDARD_COST_PER_GIB_MONTH: f64 = 0.023;

/// Flat storage price assumed for the archival tier, per GiB-month.
const ARCHIVE_COST_PER_GIB_MONTH: f64 = 0.004;

/// Facade over the content store and metadata index.
///
/// Cheaply cloneable: all shared state lives behind `Arc`s, so clones can
/// be handed to spawned tasks (the bulk path relies on this).
#[derive(Clone)]
pub struct ReportStore {
    content: Arc<dyn ContentStore>,
    index: Arc<dyn IndexStore>,
    cache: Arc<ReportCache>,
    planner: QueryPlanner,
    config: Arc<ReportStoreConfig>,
}

impl ReportStore {
    /// Build a store over the given backends.
    pub fn new(
        content: Arc<dyn ContentStore>,
        index: Arc<dyn IndexStore>,
        config: ReportStoreConfig,
    ) -> Self {
        let cache = Arc::new(ReportCache::new(&config.cache));
        let planner = QueryPlanner::new(config.default_search_limit);
        Self {
            content,
            index,
            cache,
            planner,
            config: Arc::new(config),
        }
    }

    // -- store --------------------------------------------------------------

    /// Store an immutable report: content object first, then a create-only
    /// metadata write.
    ///
    /// If the content write fails, no metadata is written. If the metadata
    /// write fails (including the duplicate-id case), the just-written
    /// content object is left in place for integrity validation to
    /// surface; never a silent success.
    pub async fn store_report(&self, report: &ComplianceReport) -> Result<StoreReceipt> {
        let bytes = serde_json::to_vec(report)?;
        let content_key = derive::content_key(report);
        let content_hash = derive::content_hash(&bytes);

        let object_tags = HashMap::from([
            ("report-id".to_string(), report.id.to_string()),
            ("report-type".to_string(), report.report_type.to_string()),
        ]);
        let encryption = self
            .content
            .put(
                &content_key,
                &bytes,
                derive::REPORT_CONTENT_TYPE,
                reportvault_core::StorageTier::Standard,
                &object_tags,
            )
            .await?;

        let metadata = derive::build_metadata(
            report,
            &content_key,
            bytes.len() as u64,
            &content_hash,
            Utc::now(),
            self.config.retention_days,
        );
        if let Err(e) = self.index.put_if_absent(&metadata).await {
            warn!(
                report_id = %report.id,
                content_key = %content_key,
                "metadata write failed after content write; content object stranded: {e}"
            );
            return Err(e);
        }

        self.cache.put(&report.id, report.clone()).await;
        debug!(report_id = %report.id, content_key = %content_key, "report stored");

        Ok(StoreReceipt {
            report_id: report.id.clone(),
            content_key,
            encryption,
            metadata_indexed: true,
        })
    }

    // -- get ----------------------------------------------------------------

    /// Retrieve a report by id, read-through the cache.
    ///
    /// On a cache miss the metadata record is fetched, then the content
    /// object; content missing despite metadata is an integrity violation,
    /// not a plain not-found. Successful reads populate the cache and
    /// stamp `last_accessed` in the background, best-effort.
    pub async fn get_report(&self, id: &ReportId) -> Result<ComplianceReport> {
        if let Some(report) = self.cache.get(id).await {
            return Ok(report);
        }

        let metadata = self
            .index
            .get(id)
            .await?
            .ok_or_else(|| ReportVaultError::NotFound {
                report_id: id.to_string(),
            })?;

        let bytes = self.content.get(&metadata.content_key).await?.ok_or_else(|| {
            ReportVaultError::IntegrityViolation {
                report_id: id.to_string(),
                detail: format!("content object missing at {}", metadata.content_key),
            }
        })?;
        let report: ComplianceReport = serde_json::from_slice(&bytes)?;

        self.cache.put(id, report.clone()).await;

        // Fire-and-forget: a failed stamp must never fail the read.
        let index = Arc::clone(&self.index);
        let report_id = id.clone();
        tokio::spawn(async move {
            let update = MetadataUpdate::touch_accessed(Utc::now());
            if let Err(e) = index.update(&report_id, &update).await {
                warn!(report_id = %report_id, "failed to stamp last_accessed: {e}");
            }
        });

        Ok(report)
    }

    /// Point lookup of the metadata record.
    pub async fn get_report_metadata(&self, id: &ReportId) -> Result<Option<ReportMetadata>> {
        self.index.get(id).await
    }

    // -- search -------------------------------------------------------------

    /// Multi-criteria search: plan an access path, apply the residual
    /// filter in-process, sort, paginate, then hydrate page items from the
    /// content store.
    ///
    /// A content fetch that fails for an individual page item is logged and
    /// the item dropped; `total_count` still reflects the filtered metadata
    /// count, so callers must not assume it equals the page length.
    pub async fn search_reports(&self, criteria: &SearchCriteria) -> Result<SearchResults> {
        let plan = self.planner.plan(criteria)?;

        let candidates = match &plan.fetch {
            FetchPath::Index(condition) => {
                self.index
                    .query_by_index(condition, Some(plan.fetch_limit))
                    .await?
            }
            FetchPath::Scan(filter) => self.index.scan(filter, Some(plan.fetch_limit)).await?,
        };

        let mut filtered: Vec<ReportMetadata> = candidates
            .into_iter()
            .filter(|m| planner::residual_matches(m, &plan.residual))
            .collect();
        planner::sort_candidates(&mut filtered, plan.sort_by, plan.sort_order);

        let total_count = filtered.len() as u64;
        let page = planner::paginate(filtered, plan.offset, plan.limit);

        let mut reports = Vec::with_capacity(page.len());
        for metadata in &page {
            match self.content.get(&metadata.content_key).await {
                Ok(Some(bytes)) => match serde_json::from_slice::<ComplianceReport>(&bytes) {
                    Ok(report) => reports.push(report),
                    Err(e) => warn!(
                        report_id = %metadata.report_id,
                        "dropping page item with undecodable content: {e}"
                    ),
                },
                Ok(None) => warn!(
                    report_id = %metadata.report_id,
                    content_key = %metadata.content_key,
                    "dropping page item with missing content"
                ),
                Err(e) => warn!(
                    report_id = %metadata.report_id,
                    "dropping page item after content fetch failure: {e}"
                ),
            }
        }

        Ok(SearchResults {
            reports,
            total_count,
            limit: plan.limit,
            offset: plan.offset,
        })
    }

    // -- bulk store ---------------------------------------------------------

    /// Store many reports: fixed-size sequential batches, items within a
    /// batch concurrent. One item's failure never aborts the batch.
    pub async fn bulk_store_reports(&self, reports: &[ComplianceReport]) -> BulkStoreOutcome {
        let mut outcome = BulkStoreOutcome::default();

        for batch in reports.chunks(self.config.bulk_batch_size.max(1)) {
            let mut tasks = JoinSet::new();
            for report in batch {
                let store = self.clone();
                let report = report.clone();
                tasks.spawn(async move {
                    let id = report.id.clone();
                    (id, store.store_report(&report).await)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                outcome.total_processed += 1;
                match joined {
                    Ok((id, Ok(_))) => outcome.successful.push(id),
                    Ok((id, Err(e))) => outcome.failed.push(BulkFailure {
                        report_id: id,
                        error: e.to_string(),
                    }),
                    Err(e) => warn!("bulk store task failed to join: {e}"),
                }
            }
        }

        info!(
            successful = outcome.successful.len(),
            failed = outcome.failed.len(),
            "bulk store complete"
        );
        outcome
    }

    // -- delete -------------------------------------------------------------

    /// Delete a report's content and metadata, evict it from the cache, and
    /// return an audit record.
    ///
    /// Requires the metadata record to exist. A partial failure (content
    /// gone, metadata delete failed) surfaces as an error rather than a
    /// fabricated audit record.
    pub async fn delete_report(
        &self,
        id: &ReportId,
        reason: Option<String>,
    ) -> Result<DeleteAudit> {
        let metadata = self
            .index
            .get(id)
            .await?
            .ok_or_else(|| ReportVaultError::NotFound {
                report_id: id.to_string(),
            })?;

        let content_key_deleted = self.content.delete(&metadata.content_key).await?;
        let metadata_deleted = self.index.delete(id).await?;
        self.cache.invalidate(id).await;

        info!(report_id = %id, reason = reason.as_deref().unwrap_or(""), "report deleted");

        Ok(DeleteAudit {
            report_id: id.clone(),
            deleted_at: Utc::now(),
            deleted_by: self.config.deleted_by.clone(),
            reason,
            content_key_deleted,
            metadata_deleted,
        })
    }

    // -- archive ------------------------------------------------------------

    /// Transition reports generated more than `older_than_days` ago from
    /// the hot tier to the archival tier.
    ///
    /// Scoped to Active records via the `(status, generated_at)` ordering.
    /// A record whose tier transition or status flip fails is logged and
    /// skipped; the pass continues.
    pub async fn archive_old_reports(&self, older_than_days: i64) -> Result<ArchiveOutcome> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let condition = KeyCondition::StatusInRange {
            status: ReportStatus::Active,
            start: DateTime::<Utc>::MIN_UTC,
            end: cutoff,
        };
        let candidates = self.index.query_by_index(&condition, None).await?;

        let mut outcome = ArchiveOutcome::default();
        for metadata in candidates {
            if let Err(e) = self
                .content
                .set_tier(&metadata.content_key, reportvault_core::StorageTier::Archive)
                .await
            {
                warn!(report_id = %metadata.report_id, "tier transition failed, skipping: {e}");
                continue;
            }
            let update = MetadataUpdate::status(ReportStatus::Archived, Utc::now());
            if let Err(e) = self.index.update(&metadata.report_id, &update).await {
                warn!(
                    report_id = %metadata.report_id,
                    "status flip failed after tier transition, skipping: {e}"
                );
                continue;
            }
            outcome.archived_count += 1;
            outcome.bytes_archived += metadata.size_bytes;
        }

        let gib = outcome.bytes_archived as f64 / (1024.0 * 1024.0 * 1024.0);
        outcome.estimated_monthly_savings_usd =
            gib * (STANDARD_COST_PER_GIB_MONTH - ARCHIVE_COST_PER_GIB_MONTH);

        info!(
            archived = outcome.archived_count,
            bytes = outcome.bytes_archived,
            "archival pass complete"
        );
        Ok(outcome)
    }

    // -- metrics ------------------------------------------------------------

    /// Aggregate metrics over the whole metadata corpus, with a health
    /// classification derived from the configured thresholds. Each breached
    /// threshold appends one recommendation string.
    pub async fn get_storage_metrics(&self) -> Result<StorageMetrics> {
        let records = self.index.scan(&ScanFilter::default(), None).await?;

        let total_reports = records.len() as u64;
        let total_size_bytes: u64 = records.iter().map(|r| r.size_bytes).sum();
        let average_size_bytes = if total_reports > 0 {
            total_size_bytes / total_reports
        } else {
            0
        };

        let mut reports_by_type: HashMap<String, u64> = HashMap::new();
        let mut reports_by_status: HashMap<String, u64> = HashMap::new();
        for record in &records {
            *reports_by_type
                .entry(record.report_type.to_string())
                .or_default() += 1;
            *reports_by_status
                .entry(record.status.to_string())
                .or_default() += 1;
        }

        let oldest_report = records.iter().map(|r| r.generated_at).min();
        let newest_report = records.iter().map(|r| r.generated_at).max();

        let thresholds = &self.config.metrics;
        let mut recommendations = Vec::new();
        let mut health = HealthStatus::Healthy;

        if total_size_bytes >= thresholds.critical_total_size_bytes {
            health = HealthStatus::Critical;
            recommendations.push(
                "total corpus size exceeds the critical threshold; expand capacity or tighten retention".to_string(),
            );
        } else if total_size_bytes >= thresholds.warn_total_size_bytes {
            health = HealthStatus::Warning;
            recommendations.push(
                "total corpus size exceeds the warning threshold; archive older reports".to_string(),
            );
        }
        if average_size_bytes >= thresholds.warn_average_size_bytes {
            if health == HealthStatus::Healthy {
                health = HealthStatus::Warning;
            }
            recommendations.push(
                "average report size exceeds the warning threshold; review report payloads".to_string(),
            );
        }
        let retention_window = Duration::days(thresholds.retention_warning_days);
        let now = Utc::now();
        if records
            .iter()
            .any(|r| r.expires_at.signed_duration_since(now) <= retention_window)
        {
            if health == HealthStatus::Healthy {
                health = HealthStatus::Warning;
            }
            recommendations.push(
                "reports are approaching their retention deadline; schedule a disposal review".to_string(),
            );
        }

        Ok(StorageMetrics {
            total_reports,
            total_size_bytes,
            reports_by_type,
            reports_by_status,
            average_size_bytes,
            oldest_report,
            newest_report,
            health,
            recommendations,
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
        })
    }

    // -- integrity ----------------------------------------------------------

    /// Validate metadata existence, content existence, and hash agreement
    /// for one report.
    ///
    /// Missing pieces are reported as issues, never raised as errors; only
    /// opaque backend failures propagate. A validation that found the
    /// metadata stamps `last_validated`, best-effort.
    pub async fn validate_report_integrity(&self, id: &ReportId) -> Result<IntegrityReport> {
        let Some(metadata) = self.index.get(id).await? else {
            return Ok(IntegrityReport {
                report_id: id.clone(),
                valid: false,
                issues: vec!["metadata record not found".to_string()],
                metadata_exists: false,
                content_exists: false,
                checksum_match: false,
                last_validated: None,
            });
        };

        let mut issues = Vec::new();
        let mut content_exists = false;
        let mut checksum_match = false;

        match self.content.get(&metadata.content_key).await? {
            Some(bytes) => {
                content_exists = true;
                let computed = derive::content_hash(&bytes);
                if computed == metadata.content_hash {
                    checksum_match = true;
                } else {
                    issues.push(format!(
                        "checksum mismatch: stored {} computed {}",
                        metadata.content_hash, computed
                    ));
                }
            }
            None => {
                issues.push(format!(
                    "content not found at {}",
                    metadata.content_key
                ));
            }
        }

        let now = Utc::now();
        if let Err(e) = self
            .index
            .update(id, &MetadataUpdate::touch_validated(now))
            .await
        {
            warn!(report_id = %id, "failed to stamp last_validated: {e}");
        }

        Ok(IntegrityReport {
            report_id: id.clone(),
            valid: issues.is_empty(),
            issues,
            metadata_exists: true,
            content_exists,
            checksum_match,
            last_validated: Some(now),
        })
    }

    // -- health -------------------------------------------------------------

    /// Health check across both backends.
    pub async fn health_check(&self) -> Result<()> {
        self.content.health_check().await?;
        self.index.health_check().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
