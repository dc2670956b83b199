//! End-to-end facade scenarios over the in-memory backends.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use reportvault_core::{
    CacheConfig, ComplianceReport, ContentStore, EncryptionStatus, Finding, FindingSeverity,
    ReportId, ReportScope, ReportStoreConfig, ReportType, ReportVaultError, Result, SearchCriteria,
    StorageTier,
};
use reportvault_storage::{InMemoryContentStore, InMemoryIndexStore, ReportStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Content-store wrapper that counts reads, so tests can observe whether a
/// retrieval was served from the cache or from the backing store.
struct CountingContentStore {
    inner: InMemoryContentStore,
    gets: AtomicUsize,
}

impl CountingContentStore {
    fn new() -> Self {
        Self {
            inner: InMemoryContentStore::new(),
            gets: AtomicUsize::new(0),
        }
    }

    fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for CountingContentStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        tier: StorageTier,
        tags: &HashMap<String, String>,
    ) -> Result<EncryptionStatus> {
        self.inner.put(key, bytes, content_type, tier, tags).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn set_tier(&self, key: &str, tier: StorageTier) -> Result<()> {
        self.inner.set_tier(key, tier).await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}

fn make_store_with(
    content: Arc<dyn ContentStore>,
    config: ReportStoreConfig,
) -> ReportStore {
    ReportStore::new(content, Arc::new(InMemoryIndexStore::new()), config)
}

fn make_store() -> ReportStore {
    make_store_with(
        Arc::new(InMemoryContentStore::new()),
        ReportStoreConfig::default(),
    )
}

fn make_report(id: &str, report_type: ReportType) -> ComplianceReport {
    ComplianceReport::new(ReportId::from(id), report_type)
        .with_scope(ReportScope {
            regulations: vec!["GDPR".to_string()],
            departments: vec!["Legal".to_string()],
            resource_types: vec![],
            period_start: None,
            period_end: None,
        })
        .with_executive_summary("Periodic compliance review.")
}

fn high_finding() -> Finding {
    Finding {
        id: "f1".to_string(),
        title: "Access review overdue".to_string(),
        description: "Quarterly access review not performed".to_string(),
        severity: FindingSeverity::High,
        finding_type: "access_review".to_string(),
        regulation: Some("GDPR".to_string()),
        department: Some("Legal".to_string()),
        resource: None,
        detected_at: Utc::now(),
    }
}

#[tokio::test]
async fn round_trip_preserves_identity_and_counts() {
    let store = make_store();
    let report = make_report("r1", ReportType::Dpia).with_finding(high_finding());

    let receipt = store.store_report(&report).await.unwrap();
    let loaded = store.get_report(&receipt.report_id).await.unwrap();

    assert_eq!(loaded.id, report.id);
    assert_eq!(loaded.report_type, report.report_type);
    assert_eq!(
        loaded.generated_at.timestamp_millis(),
        report.generated_at.timestamp_millis()
    );
    assert_eq!(loaded.findings.len(), report.findings.len());
}

#[tokio::test]
async fn storing_same_id_twice_is_rejected() {
    let store = make_store();
    let original = make_report("r1", ReportType::Audit).with_finding(high_finding());
    store.store_report(&original).await.unwrap();

    let replacement = make_report("r1", ReportType::Audit);
    let err = store.store_report(&replacement).await.unwrap_err();
    assert!(matches!(err, ReportVaultError::AlreadyExists { .. }));

    // First write is untouched
    let metadata = store
        .get_report_metadata(&ReportId::from("r1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata.findings_count, 1);
}

#[tokio::test]
async fn search_by_type_returns_only_matching_reports() {
    let store = make_store();
    store
        .store_report(&make_report("a1", ReportType::Audit))
        .await
        .unwrap();
    store
        .store_report(&make_report("a2", ReportType::Audit))
        .await
        .unwrap();
    store
        .store_report(&make_report("s1", ReportType::Summary))
        .await
        .unwrap();

    let results = store
        .search_reports(&SearchCriteria::new().with_type(ReportType::Audit))
        .await
        .unwrap();

    assert_eq!(results.total_count, 2);
    assert!(results
        .reports
        .iter()
        .all(|r| r.report_type == ReportType::Audit));
}

#[tokio::test]
async fn reads_within_ttl_hit_the_cache() {
    let content = Arc::new(CountingContentStore::new());
    let store = make_store_with(content.clone(), ReportStoreConfig::default());

    store
        .store_report(&make_report("r1", ReportType::Audit))
        .await
        .unwrap();
    assert_eq!(content.get_count(), 0);

    // The store populated the cache, so neither read touches the backend
    store.get_report(&ReportId::from("r1")).await.unwrap();
    store.get_report(&ReportId::from("r1")).await.unwrap();
    assert_eq!(content.get_count(), 0);
}

#[tokio::test]
async fn reads_beyond_ttl_fetch_from_the_stores() {
    let content = Arc::new(CountingContentStore::new());
    let config = ReportStoreConfig {
        cache: CacheConfig {
            capacity: 100,
            ttl_seconds: 1,
        },
        ..ReportStoreConfig::default()
    };
    let store = make_store_with(content.clone(), config);

    store
        .store_report(&make_report("r1", ReportType::Audit))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    store.get_report(&ReportId::from("r1")).await.unwrap();
    assert_eq!(content.get_count(), 1);

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    store.get_report(&ReportId::from("r1")).await.unwrap();
    assert_eq!(content.get_count(), 2);
}

#[tokio::test]
async fn archive_only_touches_old_active_reports() {
    let store = make_store();

    let old_date = Utc::now() - Duration::days(500);
    store
        .store_report(&make_report("old", ReportType::Audit).with_generated_at(old_date))
        .await
        .unwrap();
    store
        .store_report(&make_report("recent", ReportType::Audit))
        .await
        .unwrap();

    let outcome = store.archive_old_reports(400).await.unwrap();
    assert_eq!(outcome.archived_count, 1);

    let old_meta = store
        .get_report_metadata(&ReportId::from("old"))
        .await
        .unwrap()
        .unwrap();
    let recent_meta = store
        .get_report_metadata(&ReportId::from("recent"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(old_meta.status.to_string(), "ARCHIVED");
    assert_eq!(recent_meta.status.to_string(), "ACTIVE");
}

#[tokio::test]
async fn deletion_removes_metadata_and_cache_entry() {
    let content = Arc::new(CountingContentStore::new());
    let store = make_store_with(content.clone(), ReportStoreConfig::default());

    store
        .store_report(&make_report("r1", ReportType::Ropa))
        .await
        .unwrap();
    store.delete_report(&ReportId::from("r1"), None).await.unwrap();

    assert!(store
        .get_report_metadata(&ReportId::from("r1"))
        .await
        .unwrap()
        .is_none());
    // A cached entry would have answered without an error; NotFound proves
    // both the cache entry and the metadata record are gone.
    let err = store.get_report(&ReportId::from("r1")).await.unwrap_err();
    assert!(matches!(err, ReportVaultError::NotFound { .. }));
}

#[tokio::test]
async fn scenario_a_content_key_encodes_type_and_date() {
    let store = make_store();
    let generated_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    let report = make_report("r1", ReportType::Audit)
        .with_generated_at(generated_at)
        .with_finding(high_finding());

    let receipt = store.store_report(&report).await.unwrap();
    assert!(receipt.content_key.contains("audit/2024/01/15"));
    assert!(receipt.metadata_indexed);
}

#[tokio::test]
async fn scenario_b_immediate_reread_is_served_from_cache() {
    let content = Arc::new(CountingContentStore::new());
    let store = make_store_with(content.clone(), ReportStoreConfig::default());

    store
        .store_report(&make_report("r1", ReportType::Audit))
        .await
        .unwrap();

    let loaded = store.get_report(&ReportId::from("r1")).await.unwrap();
    assert_eq!(loaded.id.as_str(), "r1");
    assert_eq!(content.get_count(), 0);
}

#[tokio::test]
async fn scenario_c_out_of_band_content_loss_is_surfaced() {
    let content = Arc::new(CountingContentStore::new());
    let store = make_store_with(content.clone(), ReportStoreConfig::default());

    let receipt = store
        .store_report(&make_report("r1", ReportType::Audit))
        .await
        .unwrap();

    // Remove the content object behind the store's back
    content.delete(&receipt.content_key).await.unwrap();

    let integrity = store
        .validate_report_integrity(&ReportId::from("r1"))
        .await
        .unwrap();
    assert!(!integrity.valid);
    assert!(!integrity.content_exists);
    assert!(integrity.metadata_exists);
    assert!(integrity
        .issues
        .iter()
        .any(|i| i.contains("content not found")));
}

#[tokio::test]
async fn read_stamps_last_accessed_in_background() {
    let config = ReportStoreConfig {
        cache: CacheConfig {
            capacity: 1,
            ttl_seconds: 300,
        },
        ..ReportStoreConfig::default()
    };
    let store = make_store_with(Arc::new(InMemoryContentStore::new()), config);

    store
        .store_report(&make_report("r1", ReportType::Audit))
        .await
        .unwrap();
    // Push "r1" out of the single-entry cache so the read goes to the stores
    store
        .store_report(&make_report("r2", ReportType::Audit))
        .await
        .unwrap();

    store.get_report(&ReportId::from("r1")).await.unwrap();

    // The stamp is fire-and-forget; poll briefly for it to land
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(1);
    loop {
        let metadata = store
            .get_report_metadata(&ReportId::from("r1"))
            .await
            .unwrap()
            .unwrap();
        if metadata.last_accessed.is_some() {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "last_accessed was never stamped"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
