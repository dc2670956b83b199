//! Query planning for multi-criteria report search.
//!
//! Given a [`SearchCriteria`], the planner picks the cheapest access path
//! the index store offers (one of the two predeclared secondary orderings,
//! or a filtered full scan) and splits the criteria into the part the
//! store evaluates natively and the residual part applied in-process over
//! the returned candidates. Sorting and pagination always happen
//! in-process, after all filtering, so the fetch limit handed to the store
//! must cover the page *and* the skipped offset.

use reportvault_core::{
    KeyCondition, ReportMetadata, ReportStatus, ReportType, ReportVaultError, Result, ScanFilter,
    SearchCriteria, SortField, SortOrder,
};

use crate::derive::normalize_text;

/// How the candidate set is fetched from the index store.
#[derive(Debug, Clone)]
pub enum FetchPath {
    /// Range query along a secondary ordering.
    Index(KeyCondition),
    /// Full scan with natively evaluated predicates.
    Scan(ScanFilter),
}

/// Criteria the chosen access path could not evaluate natively; applied
/// in-process over the fetched candidates.
#[derive(Debug, Clone, Default)]
pub struct ResidualFilter {
    /// Report kind (only residual on the scan path).
    pub report_type: Option<ReportType>,
    /// Regulation facet substring, lower-cased.
    pub regulation: Option<String>,
    /// Department facet substring, lower-cased.
    pub department: Option<String>,
    /// At least one finding at this severity.
    pub severity: Option<reportvault_core::FindingSeverity>,
    /// Minimum overall/compliance score.
    pub min_score: Option<f64>,
    /// Maximum findings count.
    pub max_findings: Option<u32>,
    /// Lifecycle status.
    pub status: Option<ReportStatus>,
    /// Facet tags that must all be present.
    pub tags: Vec<String>,
    /// Normalized substring over the searchable text.
    pub text_query: Option<String>,
}

/// A fully resolved execution plan for one search.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Access path to fetch candidates.
    pub fetch: FetchPath,
    /// In-process residual filter.
    pub residual: ResidualFilter,
    /// Limit handed to the store: covers page size plus offset.
    pub fetch_limit: u32,
    /// Requested page size.
    pub limit: u32,
    /// Requested offset.
    pub offset: u32,
    /// Sort field.
    pub sort_by: SortField,
    /// Sort direction.
    pub sort_order: SortOrder,
}

/// Plans search requests against the index store's access paths.
#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner {
    default_limit: u32,
}

impl QueryPlanner {
    /// Create a planner with the page size used when criteria set none.
    #[must_use]
    pub fn new(default_limit: u32) -> Self {
        Self {
            default_limit: default_limit.max(1),
        }
    }

    /// Validate the criteria and produce an execution plan.
    ///
    /// Planning rule, first match wins:
    /// 1. type and date range → `(type, generated_at)` ordering;
    /// 2. date range only → `(status, generated_at)` ordering, status
    ///    defaulting to Active;
    /// 3. otherwise → scan, pushing down whatever the store evaluates
    ///    natively.
    pub fn plan(&self, criteria: &SearchCriteria) -> Result<QueryPlan> {
        if let Some(range) = criteria.date_range {
            if !range.is_chronological() {
                return Err(ReportVaultError::Validation(
                    "date range end precedes start".to_string(),
                ));
            }
        }
        if criteria.limit == Some(0) {
            return Err(ReportVaultError::Validation(
                "limit must be positive".to_string(),
            ));
        }

        let limit = criteria.limit.unwrap_or(self.default_limit);
        let offset = criteria.offset.unwrap_or(0);
        let fetch_limit = limit.saturating_add(offset);
        let sort_by = criteria.sort_by.unwrap_or(SortField::GeneratedAt);
        let sort_order = criteria.sort_order.unwrap_or(SortOrder::Desc);

        let mut residual = ResidualFilter {
            regulation: criteria.regulation.as_ref().map(|r| r.to_lowercase()),
            tags: criteria.tags.clone(),
            text_query: criteria
                .text_query
                .as_deref()
                .map(normalize_text)
                .filter(|q| !q.is_empty()),
            ..ResidualFilter::default()
        };

        let fetch = match (criteria.report_type, criteria.date_range) {
            (Some(report_type), Some(range)) => {
                residual.department = criteria.department.as_ref().map(|d| d.to_lowercase());
                residual.severity = criteria.severity;
                residual.min_score = criteria.min_score;
                residual.max_findings = criteria.max_findings;
                residual.status = criteria.status;
                FetchPath::Index(KeyCondition::TypeInRange {
                    report_type,
                    start: range.start,
                    end: range.end,
                })
            }
            (None, Some(range)) => {
                residual.department = criteria.department.as_ref().map(|d| d.to_lowercase());
                residual.severity = criteria.severity;
                residual.min_score = criteria.min_score;
                residual.max_findings = criteria.max_findings;
                FetchPath::Index(KeyCondition::StatusInRange {
                    status: criteria.status.unwrap_or(ReportStatus::Active),
                    start: range.start,
                    end: range.end,
                })
            }
            _ => {
                residual.report_type = criteria.report_type;
                FetchPath::Scan(ScanFilter {
                    department_contains: criteria.department.as_ref().map(|d| d.to_lowercase()),
                    min_score: criteria.min_score,
                    max_findings: criteria.max_findings,
                    has_severity: criteria.severity,
                    status: criteria.status,
                })
            }
        };

        Ok(QueryPlan {
            fetch,
            residual,
            fetch_limit,
            limit,
            offset,
            sort_by,
            sort_order,
        })
    }
}

/// Whether a candidate survives the residual filter pass.
#[must_use]
pub fn residual_matches(record: &ReportMetadata, residual: &ResidualFilter) -> bool {
    if let Some(report_type) = residual.report_type {
        if record.report_type != report_type {
            return false;
        }
    }
    if let Some(ref needle) = residual.regulation {
        let hit = record
            .tags
            .iter()
            .filter_map(|t| t.strip_prefix("regulation:"))
            .any(|r| r.contains(needle.as_str()));
        if !hit {
            return false;
        }
    }
    if let Some(ref needle) = residual.department {
        let hit = record
            .tags
            .iter()
            .filter_map(|t| t.strip_prefix("department:"))
            .any(|d| d.contains(needle.as_str()));
        if !hit {
            return false;
        }
    }
    if let Some(severity) = residual.severity {
        if record.severity_counts.at(severity) == 0 {
            return false;
        }
    }
    if let Some(min) = residual.min_score {
        match record.overall_score.or(record.compliance_score) {
            Some(score) if score >= min => {}
            _ => return false,
        }
    }
    if let Some(max) = residual.max_findings {
        if record.findings_count > max {
            return false;
        }
    }
    if let Some(status) = residual.status {
        if record.status != status {
            return false;
        }
    }
    if !residual.tags.iter().all(|t| record.tags.contains(t)) {
        return false;
    }
    if let Some(ref query) = residual.text_query {
        if !record.searchable_text.contains(query.as_str()) {
            return false;
        }
    }
    true
}

/// Sort the filtered candidate set in-process.
pub fn sort_candidates(candidates: &mut [ReportMetadata], sort_by: SortField, order: SortOrder) {
    candidates.sort_by(|a, b| {
        let ordering = match sort_by {
            SortField::GeneratedAt => a.generated_at.cmp(&b.generated_at),
            SortField::FindingsCount => a.findings_count.cmp(&b.findings_count),
            SortField::OverallScore => {
                let score_a = a.overall_score.or(a.compliance_score);
                let score_b = b.overall_score.or(b.compliance_score);
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Apply offset/limit pagination to the sorted candidate set.
#[must_use]
pub fn paginate(candidates: Vec<ReportMetadata>, offset: u32, limit: u32) -> Vec<ReportMetadata> {
    candidates
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use reportvault_core::{ReportId, SeverityCounts};
    use std::collections::HashMap;

    fn make_metadata(id: &str, report_type: ReportType) -> ReportMetadata {
        let now = Utc::now();
        ReportMetadata {
            report_id: ReportId::from(id),
            report_type,
            generated_at: now,
            content_key: format!("reports/{id}.json"),
            size_bytes: 100,
            findings_count: 0,
            severity_counts: SeverityCounts::default(),
            finding_type_counts: HashMap::new(),
            overall_score: None,
            compliance_score: None,
            status: ReportStatus::Active,
            tags: Vec::new(),
            searchable_text: String::new(),
            content_hash: String::new(),
            created_at: now,
            last_modified: now,
            last_accessed: None,
            last_validated: None,
            expires_at: now + Duration::days(365),
        }
    }

    fn planner() -> QueryPlanner {
        QueryPlanner::new(50)
    }

    #[test]
    fn test_type_and_range_selects_type_index() {
        let now = Utc::now();
        let criteria = SearchCriteria::new()
            .with_type(ReportType::Audit)
            .with_date_range(now - Duration::days(7), now)
            .with_status(ReportStatus::Archived);

        let plan = planner().plan(&criteria).unwrap();
        match plan.fetch {
            FetchPath::Index(KeyCondition::TypeInRange { report_type, .. }) => {
                assert_eq!(report_type, ReportType::Audit);
            }
            other => panic!("expected type index path, got {other:?}"),
        }
        // Status was not consumed by the index, so it stays residual
        assert_eq!(plan.residual.status, Some(ReportStatus::Archived));
        assert!(plan.residual.report_type.is_none());
    }

    #[test]
    fn test_range_without_type_selects_status_index() {
        let now = Utc::now();
        let criteria = SearchCriteria::new().with_date_range(now - Duration::days(7), now);

        let plan = planner().plan(&criteria).unwrap();
        match plan.fetch {
            FetchPath::Index(KeyCondition::StatusInRange { status, .. }) => {
                assert_eq!(status, ReportStatus::Active);
            }
            other => panic!("expected status index path, got {other:?}"),
        }
        // Status was consumed by the index partition
        assert!(plan.residual.status.is_none());
    }

    #[test]
    fn test_no_range_selects_scan() {
        let criteria = SearchCriteria::new()
            .with_type(ReportType::Dpia)
            .with_severity(reportvault_core::FindingSeverity::Critical);

        let plan = planner().plan(&criteria).unwrap();
        match &plan.fetch {
            FetchPath::Scan(filter) => {
                assert_eq!(
                    filter.has_severity,
                    Some(reportvault_core::FindingSeverity::Critical)
                );
            }
            other => panic!("expected scan path, got {other:?}"),
        }
        // Type is not natively scannable, so it becomes residual
        assert_eq!(plan.residual.report_type, Some(ReportType::Dpia));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let now = Utc::now();
        let criteria = SearchCriteria::new().with_date_range(now, now - Duration::days(1));
        let err = planner().plan(&criteria).unwrap_err();
        assert!(matches!(err, ReportVaultError::Validation(_)));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let criteria = SearchCriteria::new().with_limit(0);
        assert!(planner().plan(&criteria).is_err());
    }

    #[test]
    fn test_fetch_limit_covers_offset() {
        let criteria = SearchCriteria::new().with_limit(10).with_offset(30);
        let plan = planner().plan(&criteria).unwrap();
        assert_eq!(plan.fetch_limit, 40);
        assert_eq!(plan.limit, 10);
        assert_eq!(plan.offset, 30);
    }

    #[test]
    fn test_default_limit_and_sort() {
        let plan = planner().plan(&SearchCriteria::new()).unwrap();
        assert_eq!(plan.limit, 50);
        assert_eq!(plan.sort_by, SortField::GeneratedAt);
        assert_eq!(plan.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_residual_text_query() {
        let mut record = make_metadata("r1", ReportType::Audit);
        record.searchable_text = "quarterly audit retention exceeded".to_string();

        let criteria = SearchCriteria::new().with_text_query("Retention EXCEEDED!");
        let plan = planner().plan(&criteria).unwrap();
        assert!(residual_matches(&record, &plan.residual));

        let criteria = SearchCriteria::new().with_text_query("nonexistent phrase");
        let plan = planner().plan(&criteria).unwrap();
        assert!(!residual_matches(&record, &plan.residual));
    }

    #[test]
    fn test_residual_regulation_and_tags() {
        let mut record = make_metadata("r1", ReportType::Audit);
        record.tags = vec![
            "regulation:gdpr".to_string(),
            "department:legal".to_string(),
            "type:audit".to_string(),
        ];

        let residual = ResidualFilter {
            regulation: Some("gdp".to_string()),
            tags: vec!["type:audit".to_string()],
            ..ResidualFilter::default()
        };
        assert!(residual_matches(&record, &residual));

        let residual = ResidualFilter {
            regulation: Some("hipaa".to_string()),
            ..ResidualFilter::default()
        };
        assert!(!residual_matches(&record, &residual));

        let residual = ResidualFilter {
            tags: vec!["type:ropa".to_string()],
            ..ResidualFilter::default()
        };
        assert!(!residual_matches(&record, &residual));
    }

    #[test]
    fn test_residual_score_prefers_overall_then_compliance() {
        let mut record = make_metadata("r1", ReportType::Audit);
        record.compliance_score = Some(80.0);

        let residual = ResidualFilter {
            min_score: Some(75.0),
            ..ResidualFilter::default()
        };
        assert!(residual_matches(&record, &residual));

        record.compliance_score = None;
        assert!(!residual_matches(&record, &residual));
    }

    #[test]
    fn test_sort_candidates_descending_default() {
        let mut a = make_metadata("a", ReportType::Audit);
        a.generated_at = Utc::now() - Duration::days(2);
        let b = make_metadata("b", ReportType::Audit);
        let mut candidates = vec![a, b];

        sort_candidates(&mut candidates, SortField::GeneratedAt, SortOrder::Desc);
        assert_eq!(candidates[0].report_id.as_str(), "b");

        sort_candidates(&mut candidates, SortField::GeneratedAt, SortOrder::Asc);
        assert_eq!(candidates[0].report_id.as_str(), "a");
    }

    #[test]
    fn test_sort_by_findings_count() {
        let mut a = make_metadata("a", ReportType::Audit);
        a.findings_count = 3;
        let mut b = make_metadata("b", ReportType::Audit);
        b.findings_count = 9;
        let mut candidates = vec![a, b];

        sort_candidates(&mut candidates, SortField::FindingsCount, SortOrder::Desc);
        assert_eq!(candidates[0].report_id.as_str(), "b");
    }

    #[test]
    fn test_paginate() {
        let candidates: Vec<ReportMetadata> = (0..10)
            .map(|i| make_metadata(&format!("r{i}"), ReportType::Audit))
            .collect();

        let page = paginate(candidates.clone(), 4, 3);
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].report_id.as_str(), "r4");

        let past_end = paginate(candidates, 20, 5);
        assert!(past_end.is_empty());
    }
}
