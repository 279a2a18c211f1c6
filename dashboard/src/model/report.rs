//! Reports, schedules and analytics

use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newtype for report and schedule identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Performance,
    Assessment,
    Training,
    Attendance,
    Feedback,
    Summary,
    Custom,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Performance => "performance",
            ReportType::Assessment => "assessment",
            ReportType::Training => "training",
            ReportType::Attendance => "attendance",
            ReportType::Feedback => "feedback",
            ReportType::Summary => "summary",
            ReportType::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Generated,
    Scheduled,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Criteria narrowing the data a report is generated from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spocs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub departments: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ReportFilter {
    /// Checks the score against the min/max bounds
    pub fn admits_score(&self, score: u8) -> bool {
        self.min_score.is_none_or(|min| score >= min) && self.max_score.is_none_or(|max| score <= max)
    }

    /// Checks the intern against the intern list, an empty list admits everyone
    pub fn admits_intern(&self, intern_id: &str, name: &str) -> bool {
        self.interns.is_empty()
            || self
                .interns
                .iter()
                .any(|entry| entry.eq_ignore_ascii_case(intern_id) || entry.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(rename = "type")]
    pub kind: ReportType,
    pub status: ReportStatus,
    pub filters: ReportFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Csv,
    Excel,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Csv => "CSV",
            ExportFormat::Excel => "EXCEL",
            ExportFormat::Json => "JSON",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
}

impl ScheduleFrequency {
    /// Next run following `from`
    ///
    /// Month based frequencies keep the day of month, falling back to the last day of shorter
    /// months.
    pub fn next_run(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let next = match self {
            ScheduleFrequency::Daily => from.checked_add_days(Days::new(1)),
            ScheduleFrequency::Weekly => from.checked_add_days(Days::new(7)),
            ScheduleFrequency::Biweekly => from.checked_add_days(Days::new(14)),
            ScheduleFrequency::Monthly => from.checked_add_months(Months::new(1)),
            ScheduleFrequency::Quarterly => from.checked_add_months(Months::new(3)),
        };
        next.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSchedule {
    pub id: ReportId,
    pub report_id: ReportId,
    pub frequency: ScheduleFrequency,
    pub next_run: DateTime<Utc>,
    pub recipients: Vec<String>,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<RunStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn of(change: f64) -> Self {
        if change > 0.0 {
            Trend::Up
        } else if change < 0.0 {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetric {
    pub key: String,
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl AnalyticsMetric {
    pub fn new(key: &str, label: &str, value: f64) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            value,
            change: None,
            trend: None,
            unit: None,
        }
    }

    pub fn with_change(mut self, change: f64) -> Self {
        self.change = Some(change);
        self.trend = Some(Trend::of(change));
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_owned());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Positive,
    Negative,
    Neutral,
}

/// Automated finding attached to report analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsInsight {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: InsightCategory,
    pub related_metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub metrics: Vec<AnalyticsMetric>,
    pub insights: Vec<AnalyticsInsight>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn schedule_next_run() {
        let from = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();

        assert_eq!(
            ScheduleFrequency::Daily.next_run(from),
            Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(
            ScheduleFrequency::Biweekly.next_run(from),
            Utc.with_ymd_and_hms(2025, 2, 14, 9, 0, 0).unwrap()
        );
        assert_eq!(
            ScheduleFrequency::Monthly.next_run(from),
            Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap()
        );
        assert_eq!(
            ScheduleFrequency::Quarterly.next_run(from),
            Utc.with_ymd_and_hms(2025, 4, 30, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn filter_bounds() {
        let filter = ReportFilter {
            min_score: Some(70),
            max_score: Some(90),
            ..Default::default()
        };
        assert!(filter.admits_score(70));
        assert!(filter.admits_score(90));
        assert!(!filter.admits_score(69));
        assert!(!filter.admits_score(91));
        assert!(ReportFilter::default().admits_score(0));
    }
}
