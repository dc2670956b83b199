//! Derived-field computation owned by the Report Store facade.
//!
//! Everything the metadata index carries beyond the raw report (content
//! key, content hash, size, counts, facet tags, searchable text, retention
//! deadline) is computed here, once, at store time. None of it is ever
//! recomputed on read.

use chrono::{DateTime, Datelike, Duration, Utc};
use reportvault_core::{ComplianceReport, ReportMetadata, ReportStatus, SeverityCounts};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// MIME type written alongside every content object.
pub const REPORT_CONTENT_TYPE: &str = "application/json";

/// Derive the content-store key for a report:
/// `reports/{type}/{YYYY}/{MM}/{DD}/{id}.json`, date-partitioned on the
/// generation timestamp.
#[must_use]
pub fn content_key(report: &ComplianceReport) -> String {
    let date = report.generated_at.date_naive();
    format!(
        "reports/{}/{:04}/{:02}/{:02}/{}.json",
        report.report_type.key_segment(),
        date.year(),
        date.month(),
        date.day(),
        report.id
    )
}

/// SHA-256 hex digest of a content object.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Normalize free text for substring search: lower-cased, punctuation
/// stripped, whitespace collapsed to single spaces.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the normalized searchable text for a report: id, type, executive
/// summary, finding titles/descriptions/types, recommendation titles, and
/// the scope facets, concatenated and normalized.
#[must_use]
pub fn searchable_text(report: &ComplianceReport) -> String {
    let mut parts: Vec<&str> = vec![
        report.id.as_str(),
        report.report_type.key_segment(),
        &report.executive_summary,
    ];
    for finding in &report.findings {
        parts.push(&finding.title);
        parts.push(&finding.description);
        parts.push(&finding.finding_type);
    }
    for recommendation in &report.recommendations {
        parts.push(&recommendation.title);
    }
    for regulation in &report.scope.regulations {
        parts.push(regulation);
    }
    for department in &report.scope.departments {
        parts.push(department);
    }
    normalize_text(&parts.join(" "))
}

/// Build the flat facet tags for a report: type, regulations, departments,
/// resource types, and a severity marker per severity present. Sorted and
/// de-duplicated.
#[must_use]
pub fn facet_tags(report: &ComplianceReport) -> Vec<String> {
    let mut tags = vec![format!("type:{}", report.report_type.key_segment())];
    for regulation in &report.scope.regulations {
        tags.push(format!("regulation:{}", regulation.to_lowercase()));
    }
    for department in &report.scope.departments {
        tags.push(format!("department:{}", department.to_lowercase()));
    }
    for resource_type in &report.scope.resource_types {
        tags.push(format!("resource:{}", resource_type.to_lowercase()));
    }
    for finding in &report.findings {
        tags.push(format!(
            "severity:{}",
            finding.severity.to_string().to_lowercase()
        ));
    }
    tags.sort();
    tags.dedup();
    tags
}

/// Count findings per severity.
#[must_use]
pub fn severity_counts(report: &ComplianceReport) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for finding in &report.findings {
        match finding.severity {
            reportvault_core::FindingSeverity::Low => counts.low += 1,
            reportvault_core::FindingSeverity::Medium => counts.medium += 1,
            reportvault_core::FindingSeverity::High => counts.high += 1,
            reportvault_core::FindingSeverity::Critical => counts.critical += 1,
        }
    }
    counts
}

/// Count findings per finding-type tag.
#[must_use]
pub fn finding_type_counts(report: &ComplianceReport) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for finding in &report.findings {
        *counts.entry(finding.finding_type.clone()).or_default() += 1;
    }
    counts
}

/// Assemble the full metadata record for a report at store time.
#[must_use]
pub fn build_metadata(
    report: &ComplianceReport,
    content_key: &str,
    size_bytes: u64,
    content_hash: &str,
    now: DateTime<Utc>,
    retention_days: i64,
) -> ReportMetadata {
    ReportMetadata {
        report_id: report.id.clone(),
        report_type: report.report_type,
        generated_at: report.generated_at,
        content_key: content_key.to_string(),
        size_bytes,
        findings_count: report.findings.len() as u32,
        severity_counts: severity_counts(report),
        finding_type_counts: finding_type_counts(report),
        overall_score: report.overall_score,
        compliance_score: report.compliance_score,
        status: ReportStatus::Active,
        tags: facet_tags(report),
        searchable_text: searchable_text(report),
        content_hash: content_hash.to_string(),
        created_at: now,
        last_modified: now,
        last_accessed: None,
        last_validated: None,
        expires_at: report.generated_at + Duration::days(retention_days),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reportvault_core::{Finding, FindingSeverity, ReportId, ReportScope, ReportType};

    fn make_report() -> ComplianceReport {
        let generated_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        ComplianceReport::new(ReportId::from("r1"), ReportType::Audit)
            .with_generated_at(generated_at)
            .with_scope(ReportScope {
                regulations: vec!["GDPR".to_string()],
                departments: vec!["Engineering".to_string()],
                resource_types: vec![],
                period_start: None,
                period_end: None,
            })
            .with_executive_summary("Quarterly Audit: 1 high-severity gap found.")
            .with_finding(Finding {
                id: "f1".to_string(),
                title: "Unencrypted backups".to_string(),
                description: "Offsite backups lack encryption at rest".to_string(),
                severity: FindingSeverity::High,
                finding_type: "encryption".to_string(),
                regulation: Some("GDPR".to_string()),
                department: Some("Engineering".to_string()),
                resource: None,
                detected_at: generated_at,
            })
    }

    #[test]
    fn test_content_key_is_date_partitioned() {
        let key = content_key(&make_report());
        assert_eq!(key, "reports/audit/2024/01/15/r1.json");
        assert!(key.contains("audit/2024/01/15"));
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(b"payload");
        let b = content_hash(b"payload");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_hash(b"other"));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("Quarterly Audit: 1 high-severity gap,  found!"),
            "quarterly audit 1 high severity gap found"
        );
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_searchable_text_covers_findings_and_scope() {
        let text = searchable_text(&make_report());
        assert!(text.contains("unencrypted backups"));
        assert!(text.contains("gdpr"));
        assert!(text.contains("engineering"));
        assert!(text.contains("r1"));
        // Normalized: no punctuation, no upper case
        assert!(!text.contains(':'));
        assert_eq!(text, text.to_lowercase());
    }

    #[test]
    fn test_facet_tags() {
        let tags = facet_tags(&make_report());
        assert!(tags.contains(&"type:audit".to_string()));
        assert!(tags.contains(&"regulation:gdpr".to_string()));
        assert!(tags.contains(&"department:engineering".to_string()));
        assert!(tags.contains(&"severity:high".to_string()));
        // Sorted and de-duplicated
        let mut sorted = tags.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(tags, sorted);
    }

    #[test]
    fn test_severity_and_type_counts() {
        let report = make_report();
        let counts = severity_counts(&report);
        assert_eq!(counts.high, 1);
        assert_eq!(counts.total(), 1);

        let types = finding_type_counts(&report);
        assert_eq!(types.get("encryption"), Some(&1));
    }

    #[test]
    fn test_build_metadata() {
        let report = make_report();
        let now = Utc::now();
        let metadata = build_metadata(&report, "k", 2048, "abc123", now, 365);

        assert_eq!(metadata.report_id, report.id);
        assert_eq!(metadata.status, ReportStatus::Active);
        assert_eq!(metadata.size_bytes, 2048);
        assert_eq!(metadata.findings_count, 1);
        assert_eq!(metadata.created_at, now);
        assert_eq!(
            metadata.expires_at,
            report.generated_at + Duration::days(365)
        );
        assert!(metadata.last_accessed.is_none());
        assert!(metadata.last_validated.is_none());
    }
}
