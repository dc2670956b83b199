//! In-memory storage backends for testing.
//!
//! Stores all data in memory. Not intended for production use; all methods
//! are `O(n)` linear scans.

use async_trait::async_trait;
use reportvault_core::{
    ContentStore, EncryptionStatus, IndexStore, KeyCondition, MetadataUpdate, ReportId,
    ReportMetadata, ReportVaultError, Result, ScanFilter, StorageTier,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

// ===========================================================================
// InMemoryContentStore
// ===========================================================================

/// A stored content object with its attributes.
#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
    tier: StorageTier,
    #[allow(dead_code)]
    tags: HashMap<String, String>,
}

/// In-memory content store for testing.
///
/// Data is lost when the struct is dropped.
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryContentStore {
    /// Create a new, empty in-memory content store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Current tier of an object, if it exists. Test helper.
    pub async fn tier_of(&self, key: &str) -> Option<StorageTier> {
        let objects = self.objects.read().await;
        objects.get(key).map(|o| o.tier)
    }

    /// Number of stored objects. Test helper.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        tier: StorageTier,
        tags: &HashMap<String, String>,
    ) -> Result<EncryptionStatus> {
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                body: bytes.to_vec(),
                content_type: content_type.to_string(),
                tier,
                tags: tags.clone(),
            },
        );
        Ok(EncryptionStatus::None)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let objects = self.objects.read().await;
        Ok(objects.get(key).map(|o| o.body.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut objects = self.objects.write().await;
        Ok(objects.remove(key).is_some())
    }

    async fn set_tier(&self, key: &str, tier: StorageTier) -> Result<()> {
        let mut objects = self.objects.write().await;
        match objects.get_mut(key) {
            Some(object) => {
                object.tier = tier;
                Ok(())
            }
            None => Err(ReportVaultError::ContentStore(format!(
                "unknown content key: {key}"
            ))),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

// ===========================================================================
// InMemoryIndexStore
// ===========================================================================

/// In-memory metadata index for testing.
///
/// Honors create-only puts, the two predeclared orderings, and native scan
/// filters exactly as a durable backend would.
pub struct InMemoryIndexStore {
    records: RwLock<Vec<ReportMetadata>>,
}

impl InMemoryIndexStore {
    /// Create a new, empty in-memory index store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Check whether a record matches the native predicates of a scan filter.
    fn record_matches(record: &ReportMetadata, filter: &ScanFilter) -> bool {
        if let Some(ref needle) = filter.department_contains {
            let needle = needle.to_lowercase();
            let hit = record
                .tags
                .iter()
                .filter_map(|t| t.strip_prefix("department:"))
                .any(|d| d.contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(min) = filter.min_score {
            match record.overall_score.or(record.compliance_score) {
                Some(score) if score >= min => {}
                _ => return false,
            }
        }
        if let Some(max) = filter.max_findings {
            if record.findings_count > max {
                return false;
            }
        }
        if let Some(severity) = filter.has_severity {
            if record.severity_counts.at(severity) == 0 {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if record.status != status {
                return false;
            }
        }
        true
    }
}

impl Default for InMemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn put_if_absent(&self, record: &ReportMetadata) -> Result<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.report_id == record.report_id) {
            return Err(ReportVaultError::AlreadyExists {
                report_id: record.report_id.to_string(),
            });
        }
        records.push(record.clone());
        Ok(())
    }

    async fn get(&self, report_id: &ReportId) -> Result<Option<ReportMetadata>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| &r.report_id == report_id).cloned())
    }

    async fn update(&self, report_id: &ReportId, update: &MetadataUpdate) -> Result<()> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| &r.report_id == report_id) else {
            return Err(ReportVaultError::NotFound {
                report_id: report_id.to_string(),
            });
        };
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(t) = update.last_accessed {
            record.last_accessed = Some(t);
        }
        if let Some(t) = update.last_validated {
            record.last_validated = Some(t);
        }
        if let Some(t) = update.last_modified {
            record.last_modified = t;
        }
        Ok(())
    }

    async fn delete(&self, report_id: &ReportId) -> Result<bool> {
        let mut records = self.records.write().await;
        let initial = records.len();
        records.retain(|r| &r.report_id != report_id);
        Ok(records.len() < initial)
    }

    async fn query_by_index(
        &self,
        condition: &KeyCondition,
        limit: Option<u32>,
    ) -> Result<Vec<ReportMetadata>> {
        let records = self.records.read().await;
        let mut results: Vec<ReportMetadata> = records
            .iter()
            .filter(|r| match condition {
                KeyCondition::TypeInRange {
                    report_type,
                    start,
                    end,
                } => {
                    r.report_type == *report_type
                        && r.generated_at >= *start
                        && r.generated_at <= *end
                }
                KeyCondition::StatusInRange { status, start, end } => {
                    r.status == *status && r.generated_at >= *start && r.generated_at <= *end
                }
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| a.generated_at.cmp(&b.generated_at));

        if let Some(limit) = limit {
            results.truncate(limit as usize);
        }
        Ok(results)
    }

    async fn scan(&self, filter: &ScanFilter, limit: Option<u32>) -> Result<Vec<ReportMetadata>> {
        let records = self.records.read().await;
        let mut results: Vec<ReportMetadata> = records
            .iter()
            .filter(|r| Self::record_matches(r, filter))
            .cloned()
            .collect();

        if let Some(limit) = limit {
            results.truncate(limit as usize);
        }
        Ok(results)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
