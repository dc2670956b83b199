//! Core types, traits, and errors for ReportVault
//!
//! This crate contains the foundational types shared across all ReportVault
//! components: the compliance-report document model, the metadata index
//! record, the storage-layer traits, configuration structs, and the error
//! taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Unique identifier for a stored report.
///
/// Report ids are opaque strings: callers may supply their own (externally
/// meaningful) ids, or generate one via [`ReportId::new`]. Once a report is
/// stored its id is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

impl ReportId {
    /// Generate a new random report ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReportId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReportId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Report enums
// ---------------------------------------------------------------------------

/// The closed set of report kinds the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportType {
    /// Full compliance audit with per-control assessments.
    Audit,
    /// Data protection impact assessment.
    Dpia,
    /// Record of processing activities.
    Ropa,
    /// Periodic executive summary across the other report kinds.
    Summary,
}

impl ReportType {
    /// Lower-case segment used when deriving content keys.
    #[must_use]
    pub fn key_segment(self) -> &'static str {
        match self {
            Self::Audit => "audit",
            Self::Dpia => "dpia",
            Self::Ropa => "ropa",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audit => write!(f, "AUDIT"),
            Self::Dpia => write!(f, "DPIA"),
            Self::Ropa => write!(f, "ROPA"),
            Self::Summary => write!(f, "SUMMARY"),
        }
    }
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AUDIT" => Ok(Self::Audit),
            "DPIA" => Ok(Self::Dpia),
            "ROPA" => Ok(Self::Ropa),
            "SUMMARY" => Ok(Self::Summary),
            _ => Err(format!("unknown report type: {s}")),
        }
    }
}

/// Severity level for compliance findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingSeverity {
    /// Minor issue, fix at leisure.
    Low,
    /// Should be addressed in the next cycle.
    Medium,
    /// Prompt attention needed.
    High,
    /// Immediate remediation required.
    Critical,
}

impl std::fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for FindingSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Lifecycle status of an indexed report.
///
/// The only legal transition is `Active` → `Archived`. Deleted reports have
/// their metadata record removed outright; there is no `Deleted` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    /// Report is live and served at full fidelity.
    Active,
    /// Report content has been moved to the archival tier.
    Archived,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Archived => write!(f, "ARCHIVED"),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(format!("unknown status: {s}")),
        }
    }
}

/// Cost/latency class assigned to a content object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageTier {
    /// Hot tier: immediate retrieval, standard cost.
    Standard,
    /// Cold tier: cheap storage for retired reports.
    Archive,
}

impl std::fmt::Display for StorageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "STANDARD"),
            Self::Archive => write!(f, "ARCHIVE"),
        }
    }
}

/// Encryption applied by the content backend, reported on put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionStatus {
    /// The backend encrypts objects at rest.
    ServerSide,
    /// No encryption is applied by the backend.
    None,
}

impl std::fmt::Display for EncryptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerSide => write!(f, "SERVER_SIDE"),
            Self::None => write!(f, "NONE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Report document types
// ---------------------------------------------------------------------------

/// A single compliance finding inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Unique identifier within the report.
    pub id: String,
    /// Short headline.
    pub title: String,
    /// Full description of the issue.
    pub description: String,
    /// Severity of the finding.
    pub severity: FindingSeverity,
    /// Finding-type tag (e.g. "missing_consent", "retention_exceeded").
    pub finding_type: String,
    /// Regulation the finding relates to, if any.
    pub regulation: Option<String>,
    /// Department the finding was raised against, if any.
    pub department: Option<String>,
    /// Affected resource, if any.
    pub resource: Option<String>,
    /// When the finding was detected.
    pub detected_at: DateTime<Utc>,
}

/// A control assessment inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier within the report.
    pub id: String,
    /// Control that was assessed.
    pub control: String,
    /// Whether the control passed.
    pub passed: bool,
    /// Assessor notes.
    pub notes: Option<String>,
}

/// A remediation recommendation inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Unique identifier within the report.
    pub id: String,
    /// Short headline.
    pub title: String,
    /// What should be done.
    pub description: String,
    /// Urgency, on the finding severity scale.
    pub priority: FindingSeverity,
}

/// Structured description of what a report covers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportScope {
    /// Regulations in scope (e.g. "GDPR", "HIPAA").
    #[serde(default)]
    pub regulations: Vec<String>,
    /// Departments in scope.
    #[serde(default)]
    pub departments: Vec<String>,
    /// Resource types in scope.
    #[serde(default)]
    pub resource_types: Vec<String>,
    /// Start of the covered period, if bounded.
    pub period_start: Option<DateTime<Utc>>,
    /// End of the covered period, if bounded.
    pub period_end: Option<DateTime<Utc>>,
}

/// A complete compliance report document.
///
/// Reports are immutable once stored: the store rejects a second write with
/// the same id rather than overwriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Globally unique report identifier.
    pub id: ReportId,
    /// Kind of report.
    pub report_type: ReportType,
    /// When the report was generated (part of the derived storage key).
    pub generated_at: DateTime<Utc>,
    /// What the report covers.
    pub scope: ReportScope,
    /// Ordered list of findings.
    pub findings: Vec<Finding>,
    /// Control assessments.
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    /// Remediation recommendations.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    /// Narrative summary for executives.
    pub executive_summary: String,
    /// Aggregate score, populated for SUMMARY reports.
    pub overall_score: Option<f64>,
    /// Compliance percentage, populated for AUDIT reports.
    pub compliance_score: Option<f64>,
}

impl ComplianceReport {
    /// Create an empty report of the given kind, generated now.
    pub fn new(id: ReportId, report_type: ReportType) -> Self {
        Self {
            id,
            report_type,
            generated_at: Utc::now(),
            scope: ReportScope::default(),
            findings: Vec::new(),
            assessments: Vec::new(),
            recommendations: Vec::new(),
            executive_summary: String::new(),
            overall_score: None,
            compliance_score: None,
        }
    }

    /// Set the generation timestamp.
    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// Set the report scope.
    pub fn with_scope(mut self, scope: ReportScope) -> Self {
        self.scope = scope;
        self
    }

    /// Append a finding.
    pub fn with_finding(mut self, finding: Finding) -> Self {
        self.findings.push(finding);
        self
    }

    /// Set the executive summary.
    pub fn with_executive_summary(mut self, summary: impl Into<String>) -> Self {
        self.executive_summary = summary.into();
        self
    }

    /// Count findings at the given severity.
    #[must_use]
    pub fn findings_at(&self, severity: FindingSeverity) -> u32 {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count() as u32
    }
}

// ---------------------------------------------------------------------------
// Metadata index record
// ---------------------------------------------------------------------------

/// Per-severity finding counts, derived at store time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Number of LOW findings.
    pub low: u32,
    /// Number of MEDIUM findings.
    pub medium: u32,
    /// Number of HIGH findings.
    pub high: u32,
    /// Number of CRITICAL findings.
    pub critical: u32,
}

impl SeverityCounts {
    /// Count at a given severity.
    #[must_use]
    pub fn at(&self, severity: FindingSeverity) -> u32 {
        match severity {
            FindingSeverity::Low => self.low,
            FindingSeverity::Medium => self.medium,
            FindingSeverity::High => self.high,
            FindingSeverity::Critical => self.critical,
        }
    }

    /// Sum across all severities.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.low + self.medium + self.high + self.critical
    }
}

/// The queryable index record kept one-to-one with each stored report.
///
/// All derived fields (`size_bytes`, counts, `tags`, `searchable_text`,
/// `content_hash`) are computed from the report content at store time and
/// never recomputed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Primary key; equals the report's id.
    pub report_id: ReportId,
    /// Kind of report.
    pub report_type: ReportType,
    /// Generation timestamp (secondary-ordering component).
    pub generated_at: DateTime<Utc>,
    /// Pointer into the content store.
    pub content_key: String,
    /// Serialized size of the content object, in bytes.
    pub size_bytes: u64,
    /// Total number of findings.
    pub findings_count: u32,
    /// Finding counts broken down by severity.
    pub severity_counts: SeverityCounts,
    /// Finding counts broken down by finding-type tag.
    #[serde(default)]
    pub finding_type_counts: HashMap<String, u32>,
    /// Aggregate score, if the report carries one.
    pub overall_score: Option<f64>,
    /// Compliance percentage, if the report carries one.
    pub compliance_score: Option<f64>,
    /// Lifecycle status.
    pub status: ReportStatus,
    /// Flat facet strings for tag-containment search.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Normalized lower-cased text for substring search.
    pub searchable_text: String,
    /// SHA-256 hex digest of the content object.
    pub content_hash: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Last mutation of this record.
    pub last_modified: DateTime<Utc>,
    /// Last successful read of the report (`None` if never read).
    pub last_accessed: Option<DateTime<Utc>>,
    /// Last integrity validation (`None` if never validated).
    pub last_validated: Option<DateTime<Utc>>,
    /// Retention deadline after which the report is eligible for disposal.
    pub expires_at: DateTime<Utc>,
}

/// Partial fieldset for [`IndexStore::update`].
///
/// Only the fields a lifecycle operation may legally touch are updatable;
/// derived fields are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataUpdate {
    /// New lifecycle status.
    pub status: Option<ReportStatus>,
    /// New last-accessed timestamp.
    pub last_accessed: Option<DateTime<Utc>>,
    /// New last-validated timestamp.
    pub last_validated: Option<DateTime<Utc>>,
    /// New last-modified timestamp.
    pub last_modified: Option<DateTime<Utc>>,
}

impl MetadataUpdate {
    /// Update that flips the status and stamps `last_modified`.
    #[must_use]
    pub fn status(status: ReportStatus, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            last_modified: Some(now),
            ..Self::default()
        }
    }

    /// Update that only stamps `last_accessed`.
    #[must_use]
    pub fn touch_accessed(now: DateTime<Utc>) -> Self {
        Self {
            last_accessed: Some(now),
            ..Self::default()
        }
    }

    /// Update that only stamps `last_validated`.
    #[must_use]
    pub fn touch_validated(now: DateTime<Utc>) -> Self {
        Self {
            last_validated: Some(now),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Search types
// ---------------------------------------------------------------------------

/// Inclusive timestamp range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    /// Start of the range (inclusive).
    pub start: DateTime<Utc>,
    /// End of the range (inclusive).
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Whether the range runs forward in time.
    #[must_use]
    pub fn is_chronological(&self) -> bool {
        self.start <= self.end
    }

    /// Whether `t` lies inside the range.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Field a search result set can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Generation timestamp (the default).
    GeneratedAt,
    /// Total findings count.
    FindingsCount,
    /// Aggregate score.
    OverallScore,
}

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending (the default).
    Desc,
}

/// Multi-criteria search request. All fields are optional; an empty request
/// matches the whole corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Filter by report kind.
    pub report_type: Option<ReportType>,
    /// Filter by generation time range.
    pub date_range: Option<DateRange>,
    /// Substring match against the regulation facets.
    pub regulation: Option<String>,
    /// Substring match against department facets.
    pub department: Option<String>,
    /// Keep reports with at least one finding at this severity.
    pub severity: Option<FindingSeverity>,
    /// Keep reports whose score (overall or compliance) is at least this.
    pub min_score: Option<f64>,
    /// Keep reports with at most this many findings.
    pub max_findings: Option<u32>,
    /// Filter by lifecycle status.
    pub status: Option<ReportStatus>,
    /// Facet tags the report must all carry.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-text substring match over the searchable text.
    pub text_query: Option<String>,
    /// Page size (defaults to the store's configured limit).
    pub limit: Option<u32>,
    /// Number of filtered results to skip.
    pub offset: Option<u32>,
    /// Sort field (defaults to generation time).
    pub sort_by: Option<SortField>,
    /// Sort direction (defaults to descending).
    pub sort_order: Option<SortOrder>,
}

impl SearchCriteria {
    /// Create an empty (match-all) criteria set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by report kind.
    #[must_use]
    pub fn with_type(mut self, report_type: ReportType) -> Self {
        self.report_type = Some(report_type);
        self
    }

    /// Filter by generation time range.
    #[must_use]
    pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some(DateRange { start, end });
        self
    }

    /// Filter by lifecycle status.
    #[must_use]
    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Keep reports with at least one finding at `severity`.
    #[must_use]
    pub fn with_severity(mut self, severity: FindingSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Substring match over the searchable text.
    #[must_use]
    pub fn with_text_query(mut self, query: impl Into<String>) -> Self {
        self.text_query = Some(query.into());
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` filtered results.
    #[must_use]
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the sort field and direction.
    #[must_use]
    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.sort_order = Some(order);
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// Hydrated reports on this page. May be shorter than the page size if
    /// individual content fetches failed; see `total_count`.
    pub reports: Vec<ComplianceReport>,
    /// Size of the fully filtered candidate set, before pagination and
    /// before content hydration. Callers must not assume it equals
    /// `reports.len()`.
    pub total_count: u64,
    /// Page size that was applied.
    pub limit: u32,
    /// Offset that was applied.
    pub offset: u32,
}

// ---------------------------------------------------------------------------
// Operation outcome types
// ---------------------------------------------------------------------------

/// Receipt returned by a successful store operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreReceipt {
    /// Id of the stored report.
    pub report_id: ReportId,
    /// Derived content-store key the document was written to.
    pub content_key: String,
    /// Encryption reported by the content backend.
    pub encryption: EncryptionStatus,
    /// Whether the metadata record was indexed.
    pub metadata_indexed: bool,
}

/// A single failed item inside a bulk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    /// Id of the report that failed.
    pub report_id: ReportId,
    /// Rendered error.
    pub error: String,
}

/// Outcome of a bulk store: per-item successes and failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkStoreOutcome {
    /// Ids stored successfully.
    pub successful: Vec<ReportId>,
    /// Items that failed, with their errors.
    pub failed: Vec<BulkFailure>,
    /// Total number of items processed.
    pub total_processed: usize,
}

/// Audit record returned by a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAudit {
    /// Id of the deleted report.
    pub report_id: ReportId,
    /// When the delete completed.
    pub deleted_at: DateTime<Utc>,
    /// Actor attribution (from configuration).
    pub deleted_by: String,
    /// Caller-supplied reason, if any.
    pub reason: Option<String>,
    /// Whether a content object was actually removed.
    pub content_key_deleted: bool,
    /// Whether the metadata record was removed.
    pub metadata_deleted: bool,
}

/// Outcome of an archival pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    /// Number of reports transitioned to the archival tier.
    pub archived_count: u64,
    /// Total bytes moved to the archival tier.
    pub bytes_archived: u64,
    /// Approximate monthly cost reduction.
    pub estimated_monthly_savings_usd: f64,
}

/// Result of an integrity validation. Missing pieces are reported as
/// issues, never raised as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Id that was validated.
    pub report_id: ReportId,
    /// True iff metadata and content both exist and the hash matches.
    pub valid: bool,
    /// Human-readable findings, one per problem.
    pub issues: Vec<String>,
    /// Whether the metadata record exists.
    pub metadata_exists: bool,
    /// Whether the content object exists.
    pub content_exists: bool,
    /// Whether the stored hash matches the content.
    pub checksum_match: bool,
    /// When this validation ran (`None` if metadata was absent and the
    /// timestamp could not be recorded).
    pub last_validated: Option<DateTime<Utc>>,
}

/// Health classification derived from storage metrics thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    /// All thresholds respected.
    Healthy,
    /// At least one threshold breached.
    Warning,
    /// Total size beyond the critical threshold.
    Critical,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "HEALTHY"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Aggregate storage metrics over the whole metadata corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageMetrics {
    /// Total number of indexed reports.
    pub total_reports: u64,
    /// Sum of content sizes, in bytes.
    pub total_size_bytes: u64,
    /// Report counts keyed by report type.
    pub reports_by_type: HashMap<String, u64>,
    /// Report counts keyed by status.
    pub reports_by_status: HashMap<String, u64>,
    /// Mean content size, in bytes (0 when empty).
    pub average_size_bytes: u64,
    /// Generation time of the oldest report.
    pub oldest_report: Option<DateTime<Utc>>,
    /// Generation time of the newest report.
    pub newest_report: Option<DateTime<Utc>>,
    /// Derived health classification.
    pub health: HealthStatus,
    /// One human-readable recommendation per threshold breach.
    pub recommendations: Vec<String>,
    /// Cache hits since process start.
    pub cache_hits: u64,
    /// Cache misses since process start.
    pub cache_misses: u64,
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// Key condition for [`IndexStore::query_by_index`], selecting one of the
/// predeclared secondary orderings and bounding it by a generation-time
/// range.
#[derive(Debug, Clone)]
pub enum KeyCondition {
    /// Range over the `(report_type, generated_at)` ordering.
    TypeInRange {
        /// Partition value.
        report_type: ReportType,
        /// Range start (inclusive).
        start: DateTime<Utc>,
        /// Range end (inclusive).
        end: DateTime<Utc>,
    },
    /// Range over the `(status, generated_at)` ordering.
    StatusInRange {
        /// Partition value.
        status: ReportStatus,
        /// Range start (inclusive).
        start: DateTime<Utc>,
        /// Range end (inclusive).
        end: DateTime<Utc>,
    },
}

/// Filter expression an [`IndexStore`] can evaluate natively during a scan.
///
/// Everything a backend cannot express here is applied by the caller as a
/// residual in-process pass.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    /// Department facet substring (lower-cased comparison).
    pub department_contains: Option<String>,
    /// Minimum overall or compliance score.
    pub min_score: Option<f64>,
    /// Maximum findings count.
    pub max_findings: Option<u32>,
    /// Require at least one finding at this severity.
    pub has_severity: Option<FindingSeverity>,
    /// Lifecycle status.
    pub status: Option<ReportStatus>,
}

impl ScanFilter {
    /// True when no native predicate is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.department_contains.is_none()
            && self.min_score.is_none()
            && self.max_findings.is_none()
            && self.has_severity.is_none()
            && self.status.is_none()
    }
}

/// Durable key→bytes storage for full report documents.
///
/// Failures are opaque [`ReportVaultError::ContentStore`] values; retry
/// policy belongs to the backing client, not to callers of this trait.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Write an object. Overwrites are allowed at this layer; uniqueness is
    /// enforced by the index store's create-only write.
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        tier: StorageTier,
        tags: &HashMap<String, String>,
    ) -> Result<EncryptionStatus>;

    /// Read an object. `None` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete an object. Returns `false` if the key was not present.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Move an object to a different storage tier.
    async fn set_tier(&self, key: &str, tier: StorageTier) -> Result<()>;

    /// Health check for the content backend.
    async fn health_check(&self) -> Result<()>;
}

/// Durable structured-record storage for report metadata.
#[async_trait::async_trait]
pub trait IndexStore: Send + Sync {
    /// Create-only write: fails with [`ReportVaultError::AlreadyExists`] if
    /// a record with the same id is present. This is the sole id-uniqueness
    /// mechanism in the system.
    async fn put_if_absent(&self, record: &ReportMetadata) -> Result<()>;

    /// Point lookup by report id.
    async fn get(&self, report_id: &ReportId) -> Result<Option<ReportMetadata>>;

    /// Partial update. Fails with [`ReportVaultError::NotFound`] if the
    /// record is absent.
    async fn update(&self, report_id: &ReportId, update: &MetadataUpdate) -> Result<()>;

    /// Delete a record. Returns `false` if it was not present.
    async fn delete(&self, report_id: &ReportId) -> Result<bool>;

    /// Range query along one of the predeclared secondary orderings.
    /// Results are ordered by `generated_at` ascending; callers re-sort for
    /// presentation.
    async fn query_by_index(
        &self,
        condition: &KeyCondition,
        limit: Option<u32>,
    ) -> Result<Vec<ReportMetadata>>;

    /// Unordered full-corpus scan with a natively evaluated filter.
    async fn scan(&self, filter: &ScanFilter, limit: Option<u32>) -> Result<Vec<ReportMetadata>>;

    /// Health check for the index backend.
    async fn health_check(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Report cache sizing and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached reports.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Time-to-live per entry, in seconds.
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_cache_capacity() -> usize {
    100
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

impl CacheConfig {
    /// TTL as a [`Duration`].
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

/// Thresholds feeding the storage-metrics health classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsThresholds {
    /// Total corpus size that triggers a warning.
    #[serde(default = "default_warn_total_size_bytes")]
    pub warn_total_size_bytes: u64,
    /// Total corpus size that triggers a critical classification.
    #[serde(default = "default_critical_total_size_bytes")]
    pub critical_total_size_bytes: u64,
    /// Average report size that triggers a warning.
    #[serde(default = "default_warn_average_size_bytes")]
    pub warn_average_size_bytes: u64,
    /// Warn when the oldest report is within this many days of its
    /// retention deadline.
    #[serde(default = "default_retention_warning_days")]
    pub retention_warning_days: i64,
}

fn default_warn_total_size_bytes() -> u64 {
    50 * 1024 * 1024 * 1024
}

fn default_critical_total_size_bytes() -> u64 {
    200 * 1024 * 1024 * 1024
}

fn default_warn_average_size_bytes() -> u64 {
    25 * 1024 * 1024
}

fn default_retention_warning_days() -> i64 {
    90
}

impl Default for MetricsThresholds {
    fn default() -> Self {
        Self {
            warn_total_size_bytes: default_warn_total_size_bytes(),
            critical_total_size_bytes: default_critical_total_size_bytes(),
            warn_average_size_bytes: default_warn_average_size_bytes(),
            retention_warning_days: default_retention_warning_days(),
        }
    }
}

/// Top-level configuration for a Report Store facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStoreConfig {
    /// Cache sizing and expiry.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Items per bulk batch (batches are sequential, items concurrent).
    #[serde(default = "default_bulk_batch_size")]
    pub bulk_batch_size: usize,
    /// Page size applied when a search sets no limit.
    #[serde(default = "default_search_limit")]
    pub default_search_limit: u32,
    /// Retention period used to derive `expires_at`, in days.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Actor string recorded in delete audit records.
    #[serde(default = "default_deleted_by")]
    pub deleted_by: String,
    /// Health classification thresholds.
    #[serde(default)]
    pub metrics: MetricsThresholds,
}

fn default_bulk_batch_size() -> usize {
    10
}

fn default_search_limit() -> u32 {
    50
}

fn default_retention_days() -> i64 {
    2555
}

fn default_deleted_by() -> String {
    "report-store".to_string()
}

impl Default for ReportStoreConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            bulk_batch_size: default_bulk_batch_size(),
            default_search_limit: default_search_limit(),
            retention_days: default_retention_days(),
            deleted_by: default_deleted_by(),
            metrics: MetricsThresholds::default(),
        }
    }
}

impl ReportStoreConfig {
    /// Load a configuration from a YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportVaultError::Config`] if the file cannot be read or
    /// the YAML is invalid.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReportVaultError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ReportVaultError::Config(format!("invalid config YAML: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error taxonomy.
#[derive(thiserror::Error, Debug)]
pub enum ReportVaultError {
    /// The report id is unknown to the metadata index.
    #[error("Report not found: {report_id}")]
    NotFound {
        /// The unknown id.
        report_id: String,
    },

    /// Create-only write rejected: the id is already stored.
    #[error("Report already exists: {report_id}")]
    AlreadyExists {
        /// The duplicate id.
        report_id: String,
    },

    /// Metadata and content diverge (e.g. content missing despite an
    /// active metadata record).
    #[error("Integrity violation for {report_id}: {detail}")]
    IntegrityViolation {
        /// The affected id.
        report_id: String,
        /// What diverged.
        detail: String,
    },

    /// Opaque content-layer failure.
    #[error("Content store error: {0}")]
    ContentStore(String),

    /// Opaque index-layer failure.
    #[error("Index store error: {0}")]
    IndexStore(String),

    /// Malformed search criteria or operation input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `std::result::Result<T, ReportVaultError>`.
pub type Result<T> = std::result::Result<T, ReportVaultError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
