//! Reports generation, scheduling, export and analytics

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::auth::AuthService;
use crate::metrics::{self, Scored};
use crate::model::intern::Intern;
use crate::model::performance::PerformanceRecord;
use crate::model::report::{
    Analytics, AnalyticsInsight, AnalyticsMetric, DateRange, ExportFormat, InsightCategory, Report,
    ReportFilter, ReportId, ReportSchedule, ReportStatus, ReportType, RunStatus,
    ScheduleFrequency, Severity,
};
use crate::notify::Notifications;
use crate::service::{InternService, PerformanceStore, ServiceError, ServiceResult, settle};
use crate::state::{Subject, Subscription};

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn sample_reports() -> Vec<Report> {
    let report = |id: &str, title: &str, description: &str, created_at, created_by: &str, kind, status, filters| Report {
        id: ReportId::new(id),
        title: title.to_owned(),
        description: description.to_owned(),
        created_at,
        created_by: created_by.to_owned(),
        kind,
        status,
        filters,
        data: None,
    };

    vec![
        report(
            "1",
            "Monthly Intern Performance Report",
            "Overall performance metrics for all interns",
            date(2025, 5, 1),
            "Manager User",
            ReportType::Performance,
            ReportStatus::Generated,
            ReportFilter {
                date_range: Some(DateRange {
                    start: date(2025, 4, 1),
                    end: date(2025, 4, 30),
                }),
                ..Default::default()
            },
        ),
        report(
            "2",
            "Q2 Skills Assessment",
            "Technical skills evaluation for Q2",
            date(2025, 5, 15),
            "SPOC User",
            ReportType::Assessment,
            ReportStatus::Generated,
            ReportFilter {
                departments: vec!["Engineering".into(), "Product".into()],
                skills: vec!["Angular".into(), "React".into(), "Node.js".into()],
                ..Default::default()
            },
        ),
        report(
            "3",
            "Training Completion Status",
            "Progress report on mandatory training completion",
            date(2025, 5, 20),
            "SPOC User",
            ReportType::Training,
            ReportStatus::Generated,
            ReportFilter {
                status: Some("in-progress".into()),
                ..Default::default()
            },
        ),
        report(
            "4",
            "Intern Feedback Summary",
            "Aggregated feedback from SPOCs",
            date(2025, 5, 25),
            "Manager User",
            ReportType::Feedback,
            ReportStatus::Scheduled,
            ReportFilter {
                date_range: Some(DateRange {
                    start: date(2025, 5, 1),
                    end: date(2025, 5, 31),
                }),
                ..Default::default()
            },
        ),
    ]
}

fn sample_schedules() -> Vec<ReportSchedule> {
    vec![
        ReportSchedule {
            id: ReportId::new("1"),
            report_id: ReportId::new("1"),
            frequency: ScheduleFrequency::Monthly,
            next_run: date(2025, 6, 1),
            recipients: vec![
                "manager@ilink-systems.com".into(),
                "hr@ilink-systems.com".into(),
            ],
            enabled: true,
            last_run: Some(date(2025, 5, 1)),
            last_status: Some(RunStatus::Success),
        },
        ReportSchedule {
            id: ReportId::new("2"),
            report_id: ReportId::new("4"),
            frequency: ScheduleFrequency::Weekly,
            next_run: date(2025, 6, 1),
            recipients: vec![
                "manager@ilink-systems.com".into(),
                "spocs@ilink-systems.com".into(),
            ],
            enabled: true,
            last_run: None,
            last_status: None,
        },
    ]
}

/// Performance payload over the review table
fn performance_data(records: &[PerformanceRecord], filters: &ReportFilter) -> Value {
    let records: Vec<_> = records
        .iter()
        .filter(|record| {
            filters.admits_score(record.score.value())
                && filters.admits_intern(record.intern_id.as_str(), &record.name)
        })
        .collect();

    let top = metrics::top_performers(&records, 1).first().map(|record| **record);
    let interns: Vec<_> = records
        .iter()
        .map(|record| {
            json!({
                "internId": record.intern_id,
                "name": record.name,
                "score": record.score,
                "level": record.level,
                "status": record.status,
            })
        })
        .collect();
    let levels: serde_json::Map<_, _> = metrics::level_distribution(&records)
        .into_iter()
        .map(|(level, count)| (level.as_str().to_owned(), json!(count)))
        .collect();

    json!({
        "summary": {
            "count": records.len(),
            "averageScore": metrics::average_score(&records),
            "topPerformer": top.map(|record| &record.name),
            "topPerformerScore": top.map(|record| record.score),
            "lowestScore": records.iter().filter_map(|record| record.score()).min(),
        },
        "interns": interns,
        "levels": levels,
    })
}

/// Feedback payload over the interns feedback
fn feedback_data(interns: &[Intern], filters: &ReportFilter) -> Value {
    let in_range = |timestamp: &DateTime<Utc>| {
        filters
            .date_range
            .as_ref()
            .is_none_or(|range| (range.start..=range.end).contains(timestamp))
    };

    let mut total = 0;
    let mut rating_sum = 0u32;
    let mut positive = 0;
    let mut rows = vec![];

    for intern in interns {
        if !filters.admits_intern(intern.id.as_str(), &intern.name) {
            continue;
        }
        let Some(performance) = &intern.performance else {
            continue;
        };

        let ratings: Vec<u32> = performance
            .feedback
            .iter()
            .filter(|feedback| in_range(&feedback.timestamp))
            .map(|feedback| feedback.rating.value() as u32)
            .collect();
        if ratings.is_empty() {
            continue;
        }

        total += ratings.len();
        rating_sum += ratings.iter().sum::<u32>();
        positive += ratings.iter().filter(|rating| **rating >= 4).count();
        rows.push(json!({
            "internId": intern.id,
            "name": intern.name,
            "feedback": ratings.len(),
            "averageRating": one_decimal(ratings.iter().sum::<u32>() as f64 / ratings.len() as f64),
        }));
    }

    let average = (total > 0).then(|| one_decimal(rating_sum as f64 / total as f64));
    let positive_share = (total > 0).then(|| format!("{}%", positive * 100 / total));

    json!({
        "summary": {
            "totalFeedback": total,
            "averageRating": average,
            "positivePercentage": positive_share,
        },
        "interns": rows,
    })
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Fixed payloads for the report types without a data source
fn static_data(kind: ReportType) -> Value {
    match kind {
        ReportType::Assessment => json!({
            "summary": {
                "assessmentsCompleted": 45,
                "averageScore": 76.8,
                "passRate": "89%",
                "skillGaps": ["Advanced React", "Cloud Architecture", "Testing"],
            },
            "skills": [
                { "name": "Angular", "average": 82 },
                { "name": "React", "average": 75 },
                { "name": "Node.js", "average": 70 },
                { "name": "Testing", "average": 65 },
                { "name": "DevOps", "average": 62 },
            ],
        }),
        ReportType::Training => json!({
            "summary": {
                "totalCourses": 12,
                "completionRate": "68%",
                "averageCompletionTime": "14 days",
                "onTrackPercentage": "72%",
            },
            "courses": [
                { "name": "Angular Fundamentals", "completion": 92, "averageScore": 88 },
                { "name": "React Advanced", "completion": 78, "averageScore": 82 },
                { "name": "Node.js Basics", "completion": 85, "averageScore": 90 },
                { "name": "API Design", "completion": 62, "averageScore": 75 },
                { "name": "Git Workflow", "completion": 98, "averageScore": 95 },
            ],
        }),
        ReportType::Attendance => json!({
            "summary": {
                "averageAttendance": "94.2%",
                "lateArrivalRate": "5.8%",
                "absenteeismRate": "2.3%",
                "perfectAttendance": 12,
            },
            "trends": [
                { "month": "January", "attendance": 91 },
                { "month": "February", "attendance": 93 },
                { "month": "March", "attendance": 92 },
                { "month": "April", "attendance": 94 },
                { "month": "May", "attendance": 94.2 },
            ],
        }),
        _ => json!({ "message": "Custom report data would be generated here" }),
    }
}

/// Exported report document
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedReport {
    pub file_name: String,
    pub content_type: &'static str,
    pub content: String,
}

fn file_stem(title: &str) -> String {
    let stem: Vec<_> = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    if stem.is_empty() {
        "report".to_owned()
    } else {
        stem.join("-")
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join("; "),
        other => other.to_string(),
    }
}

/// Renders the report table as CSV
///
/// The `interns` rows of the payload make the table, columns sorted by name. Reports without them are rendered as
/// field/value pairs of the summary, or of the report itself when there is no payload.
fn render_csv(report: &Report) -> ServiceResult<String> {
    let mut writer = csv::Writer::from_writer(vec![]);

    let rows = report
        .data
        .as_ref()
        .and_then(|data| data.get("interns"))
        .and_then(Value::as_array)
        .filter(|rows| !rows.is_empty());

    if let Some(rows) = rows {
        let mut header: Vec<&str> = rows[0]
            .as_object()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default();
        header.sort_unstable();
        writer.write_record(&header)?;
        for row in rows {
            writer.write_record(header.iter().map(|key| cell(&row[*key])))?;
        }
    } else {
        writer.write_record(["field", "value"])?;
        let summary = report
            .data
            .as_ref()
            .and_then(|data| data.get("summary").or(Some(data)))
            .and_then(Value::as_object);
        match summary {
            Some(summary) => {
                for (key, value) in summary {
                    writer.write_record([key.as_str(), cell(value).as_str()])?;
                }
            }
            None => {
                writer.write_record(["title", report.title.as_str()])?;
                writer.write_record(["type", report.kind.as_str()])?;
                writer.write_record(["createdBy", report.created_by.as_str()])?;
                writer.write_record(["createdAt", report.created_at.to_rfc3339().as_str()])?;
            }
        }
    }

    let content = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&content).into_owned())
}

fn performance_analytics(data: &Value) -> Analytics {
    let scores: Vec<u64> = data["interns"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|row| row["score"].as_u64()).collect())
        .unwrap_or_default();
    let average = data["summary"]["averageScore"].as_f64().unwrap_or_default();
    let top = scores.iter().filter(|score| **score >= 90).count();
    let low = scores.iter().filter(|score| **score < 70).count();

    let metrics = vec![
        AnalyticsMetric::new("avg_score", "Average Performance Score", average).with_unit("%"),
        AnalyticsMetric::new("top_performers", "Top Performers (90%+)", top as f64)
            .with_unit("people"),
        AnalyticsMetric::new("low_performers", "Low Performers (<70%)", low as f64)
            .with_unit("people"),
    ];

    let mut insights = vec![];
    if low > 0 {
        insights.push(AnalyticsInsight {
            id: "low_performers".into(),
            title: "Interns need attention".into(),
            description: format!("{low} intern(s) scored below 70 and need a development plan."),
            severity: Severity::High,
            category: InsightCategory::Negative,
            related_metrics: vec!["low_performers".into()],
        });
    }
    if top > 0 {
        insights.push(AnalyticsInsight {
            id: "top_performers".into(),
            title: "Consistent top performers".into(),
            description: format!("{top} intern(s) scored 90 or above."),
            severity: Severity::Low,
            category: InsightCategory::Positive,
            related_metrics: vec!["top_performers".into()],
        });
    }
    if average >= 80.0 {
        insights.push(AnalyticsInsight {
            id: "avg_score".into(),
            title: "Strong overall performance".into(),
            description: format!("The average score of {average} is above the L2 threshold."),
            severity: Severity::Medium,
            category: InsightCategory::Positive,
            related_metrics: vec!["avg_score".into()],
        });
    }

    Analytics { metrics, insights }
}

fn assessment_analytics() -> Analytics {
    Analytics {
        metrics: vec![
            AnalyticsMetric::new("pass_rate", "Assessment Pass Rate", 89.0)
                .with_change(4.0)
                .with_unit("%"),
            AnalyticsMetric::new("avg_score", "Average Assessment Score", 76.8)
                .with_change(1.5)
                .with_unit("%"),
            AnalyticsMetric::new("skill_coverage", "Skill Coverage", 85.0)
                .with_change(5.0)
                .with_unit("%"),
        ],
        insights: vec![AnalyticsInsight {
            id: "1".into(),
            title: "React skills gap identified".into(),
            description: "Advanced React skills show consistently lower scores, suggesting a training opportunity.".into(),
            severity: Severity::Medium,
            category: InsightCategory::Negative,
            related_metrics: vec!["avg_score".into()],
        }],
    }
}

fn generic_analytics() -> Analytics {
    Analytics {
        metrics: vec![
            AnalyticsMetric::new("generic", "Generic Metric", 75.0)
                .with_change(5.0)
                .with_unit("%"),
        ],
        insights: vec![AnalyticsInsight {
            id: "1".into(),
            title: "Generic Insight".into(),
            description: "This is a placeholder insight for this report type.".into(),
            severity: Severity::Medium,
            category: InsightCategory::Neutral,
            related_metrics: vec!["generic".into()],
        }],
    }
}

#[derive(Clone)]
pub struct ReportService {
    reports: Subject<Vec<Report>>,
    schedules: Subject<Vec<ReportSchedule>>,
    auth: AuthService,
    interns: InternService,
    performance: PerformanceStore,
    notifications: Notifications,
}

impl ReportService {
    /// Service over the sample reports, generating from the given data sources
    pub fn new(
        auth: AuthService,
        interns: InternService,
        performance: PerformanceStore,
        notifications: Notifications,
    ) -> Self {
        Self {
            reports: Subject::new(sample_reports()),
            schedules: Subject::new(sample_schedules()),
            auth,
            interns,
            performance,
            notifications,
        }
    }

    pub async fn reports(&self) -> Subscription<Vec<Report>> {
        self.reports.subscribe().await
    }

    pub async fn all(&self) -> Vec<Report> {
        self.reports.get().await
    }

    pub async fn by_id(&self, id: &ReportId) -> Option<Report> {
        self.reports
            .with(|reports| reports.iter().find(|report| report.id == *id).cloned())
            .await
    }

    pub async fn by_type(&self, kind: ReportType) -> Vec<Report> {
        self.reports
            .with(|reports| {
                reports
                    .iter()
                    .filter(|report| report.kind == kind)
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Generates the report and adds it to the list
    #[instrument(skip(self, filters))]
    pub async fn generate(
        &self,
        title: &str,
        kind: ReportType,
        filters: ReportFilter,
    ) -> ServiceResult<Report> {
        self.notifications.set_loading(true).await;

        let data = match kind {
            ReportType::Performance => performance_data(&self.performance.all().await, &filters),
            ReportType::Feedback => feedback_data(&self.interns.all().await, &filters),
            kind => static_data(kind),
        };
        let created_by = self
            .auth
            .current_user()
            .await
            .map(|user| user.name)
            .unwrap_or_else(|| "Unknown User".to_owned());

        let report = Report {
            id: ReportId::generate(),
            title: title.to_owned(),
            description: format!("Generated {} report", kind.as_str()),
            created_at: Utc::now(),
            created_by,
            kind,
            status: ReportStatus::Generated,
            filters,
            data: Some(data),
        };
        self.reports.update(|reports| reports.push(report.clone())).await;
        info!(id = %report.id, "Report generated");

        settle(&self.notifications, Ok(report), |report| {
            Some(format!("Report \"{}\" generated successfully", report.title))
        })
        .await
    }

    /// Schedules the report, the first run is one period from now
    #[instrument(skip(self, recipients))]
    pub async fn schedule(
        &self,
        report_id: &ReportId,
        frequency: ScheduleFrequency,
        recipients: Vec<String>,
    ) -> ServiceResult<ReportSchedule> {
        self.notifications.set_loading(true).await;

        let result = match self.by_id(report_id).await {
            Some(_) => {
                let schedule = ReportSchedule {
                    id: ReportId::generate(),
                    report_id: report_id.clone(),
                    frequency,
                    next_run: frequency.next_run(Utc::now()),
                    recipients,
                    enabled: true,
                    last_run: None,
                    last_status: None,
                };
                self.schedules
                    .update(|schedules| schedules.push(schedule.clone()))
                    .await;
                Ok(schedule)
            }
            None => Err(ServiceError::NotFound("Report")),
        };

        settle(&self.notifications, result, |_| {
            Some("Report scheduled successfully".to_owned())
        })
        .await
    }

    pub async fn schedules(&self) -> Subscription<Vec<ReportSchedule>> {
        self.schedules.subscribe().await
    }

    pub async fn all_schedules(&self) -> Vec<ReportSchedule> {
        self.schedules.get().await
    }

    /// Renders the report in the requested format
    #[instrument(skip(self))]
    pub async fn export(&self, report_id: &ReportId, format: ExportFormat) -> ServiceResult<ExportedReport> {
        self.notifications.set_loading(true).await;

        let result = match self.by_id(report_id).await {
            None => Err(ServiceError::NotFound("Report")),
            Some(report) => {
                let file_name = format!("{}.{}", file_stem(&report.title), format.extension());
                match format {
                    ExportFormat::Json => serde_json::to_string_pretty(&report)
                        .map_err(ServiceError::from)
                        .map(|content| ExportedReport {
                            file_name,
                            content_type: "application/json",
                            content,
                        }),
                    ExportFormat::Csv => render_csv(&report).map(|content| ExportedReport {
                        file_name,
                        content_type: "text/csv",
                        content,
                    }),
                    ExportFormat::Pdf | ExportFormat::Excel => {
                        Err(ServiceError::UnsupportedFormat(format))
                    }
                }
            }
        };

        settle(&self.notifications, result, |_| {
            Some(format!("Report exported as {format} successfully"))
        })
        .await
    }

    /// Metrics and insights of the report, empty if the report has no data
    pub async fn analytics(&self, report_id: &ReportId) -> ServiceResult<Analytics> {
        let report = self
            .by_id(report_id)
            .await
            .ok_or(ServiceError::NotFound("Report"))?;

        let Some(data) = &report.data else {
            return Ok(Analytics::default());
        };

        Ok(match report.kind {
            ReportType::Performance => performance_analytics(data),
            ReportType::Assessment => assessment_analytics(),
            _ => generic_analytics(),
        })
    }

    /// Deletes the report together with its schedules
    #[instrument(skip(self))]
    pub async fn delete(&self, report_id: &ReportId) -> ServiceResult<()> {
        self.notifications.set_loading(true).await;

        let deleted = self
            .reports
            .replace_if(|reports| {
                let kept: Vec<_> = reports
                    .iter()
                    .filter(|report| report.id != *report_id)
                    .cloned()
                    .collect();
                (kept.len() != reports.len()).then_some(kept)
            })
            .await;

        let result = if deleted {
            self.schedules
                .update(|schedules| schedules.retain(|schedule| schedule.report_id != *report_id))
                .await;
            Ok(())
        } else {
            Err(ServiceError::NotFound("Report"))
        };

        settle(&self.notifications, result, |_| {
            Some("Report deleted successfully".to_owned())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> (ReportService, Notifications) {
        let auth = AuthService::mock();
        auth.login("manager", "manager123").await.unwrap();
        let notifications = Notifications::new();
        let interns = InternService::sample(auth.clone(), notifications.clone());
        let service = ReportService::new(
            auth,
            interns,
            PerformanceStore::sample(),
            notifications.clone(),
        );
        (service, notifications)
    }

    #[tokio::test]
    async fn samples() {
        let (service, _) = service().await;
        assert_eq!(service.all().await.len(), 4);
        assert_eq!(service.all_schedules().await.len(), 2);
        assert_eq!(service.by_type(ReportType::Performance).await.len(), 1);
        assert_eq!(
            service.by_id(&ReportId::new("2")).await.unwrap().title,
            "Q2 Skills Assessment"
        );
    }

    #[tokio::test]
    async fn performance_report_computed_from_table() {
        let (service, notifications) = service().await;
        let report = service
            .generate("June", ReportType::Performance, ReportFilter::default())
            .await
            .unwrap();

        assert_eq!(report.created_by, "Manager User");
        assert_eq!(report.description, "Generated performance report");
        let data = report.data.as_ref().unwrap();
        assert_eq!(data["summary"]["averageScore"], 83);
        assert_eq!(data["summary"]["topPerformer"], "Abdullah Firdowsi");
        assert_eq!(data["summary"]["lowestScore"], 65);
        assert_eq!(data["levels"]["L1"], 2);
        assert_eq!(data["interns"].as_array().unwrap().len(), 6);

        assert_eq!(service.all().await.len(), 5);
        assert_eq!(
            notifications.current_success().await,
            "Report \"June\" generated successfully"
        );
    }

    #[tokio::test]
    async fn performance_report_filters() {
        let (service, _) = service().await;
        let filters = ReportFilter {
            min_score: Some(80),
            max_score: Some(90),
            ..Default::default()
        };
        let report = service
            .generate("Mid", ReportType::Performance, filters)
            .await
            .unwrap();
        let data = report.data.unwrap();
        assert_eq!(data["summary"]["count"], 2);
        assert_eq!(data["summary"]["averageScore"], 87);
    }

    #[tokio::test]
    async fn feedback_report_computed_from_interns() {
        let (service, _) = service().await;
        let report = service
            .generate("Feedback", ReportType::Feedback, ReportFilter::default())
            .await
            .unwrap();
        let data = report.data.unwrap();
        assert_eq!(data["summary"]["totalFeedback"], 2);
        assert_eq!(data["summary"]["averageRating"], 4.5);
        assert_eq!(data["summary"]["positivePercentage"], "100%");

        let filters = ReportFilter {
            date_range: Some(DateRange {
                start: date(2025, 5, 21),
                end: date(2025, 5, 31),
            }),
            ..Default::default()
        };
        let report = service
            .generate("Late May", ReportType::Feedback, filters)
            .await
            .unwrap();
        let data = report.data.unwrap();
        assert_eq!(data["summary"]["totalFeedback"], 1);
        assert_eq!(data["interns"][0]["internId"], "I347");
    }

    #[tokio::test]
    async fn anonymous_reports() {
        let auth = AuthService::mock();
        let notifications = Notifications::new();
        let interns = InternService::sample(auth.clone(), notifications.clone());
        let service = ReportService::new(auth, interns, PerformanceStore::sample(), notifications);

        let report = service
            .generate("Custom", ReportType::Custom, ReportFilter::default())
            .await
            .unwrap();
        assert_eq!(report.created_by, "Unknown User");
        assert_eq!(
            report.data.unwrap()["message"],
            "Custom report data would be generated here"
        );
    }

    #[tokio::test]
    async fn scheduling() {
        let (service, _) = service().await;
        let before = Utc::now();
        let schedule = service
            .schedule(
                &ReportId::new("3"),
                ScheduleFrequency::Weekly,
                vec!["spocs@ilink-systems.com".into()],
            )
            .await
            .unwrap();
        assert!(schedule.enabled);
        assert!(schedule.next_run >= ScheduleFrequency::Weekly.next_run(before));
        assert_eq!(service.all_schedules().await.len(), 3);

        assert!(matches!(
            service
                .schedule(&ReportId::new("nope"), ScheduleFrequency::Daily, vec![])
                .await,
            Err(ServiceError::NotFound("Report"))
        ));
    }

    #[tokio::test]
    async fn exports() {
        let (service, notifications) = service().await;
        let report = service
            .generate("Intern Performance", ReportType::Performance, ReportFilter::default())
            .await
            .unwrap();

        let json = service.export(&report.id, ExportFormat::Json).await.unwrap();
        assert_eq!(json.file_name, "intern-performance.json");
        let decoded: Report = serde_json::from_str(&json.content).unwrap();
        assert_eq!(decoded, report);

        let csv = service.export(&report.id, ExportFormat::Csv).await.unwrap();
        assert_eq!(csv.content_type, "text/csv");
        let mut lines = csv.content.lines();
        assert_eq!(lines.next(), Some("internId,level,name,score,status"));
        assert_eq!(lines.next(), Some("I400,L1,Abdullah Firdowsi,95,Approved"));
        assert_eq!(lines.count(), 5);
        assert_eq!(
            notifications.current_success().await,
            "Report exported as CSV successfully"
        );

        let sample = service
            .export(&ReportId::new("2"), ExportFormat::Csv)
            .await
            .unwrap();
        let mut lines = sample.content.lines();
        assert_eq!(lines.next(), Some("field,value"));
        assert_eq!(lines.next(), Some("title,Q2 Skills Assessment"));

        assert!(matches!(
            service.export(&report.id, ExportFormat::Pdf).await,
            Err(ServiceError::UnsupportedFormat(ExportFormat::Pdf))
        ));
        assert!(matches!(
            service.export(&ReportId::new("nope"), ExportFormat::Json).await,
            Err(ServiceError::NotFound("Report"))
        ));
    }

    #[tokio::test]
    async fn analytics() {
        let (service, _) = service().await;
        let empty = service.analytics(&ReportId::new("1")).await.unwrap();
        assert_eq!(empty, Analytics::default());

        let report = service
            .generate("Perf", ReportType::Performance, ReportFilter::default())
            .await
            .unwrap();
        let analytics = service.analytics(&report.id).await.unwrap();
        let value = |key: &str| {
            analytics
                .metrics
                .iter()
                .find(|metric| metric.key == key)
                .map(|metric| metric.value)
        };
        assert_eq!(value("avg_score"), Some(83.0));
        assert_eq!(value("top_performers"), Some(2.0));
        assert_eq!(value("low_performers"), Some(1.0));
        assert_eq!(analytics.insights.len(), 3);
        assert_eq!(analytics.insights[0].severity, Severity::High);

        let report = service
            .generate("Attendance", ReportType::Attendance, ReportFilter::default())
            .await
            .unwrap();
        let analytics = service.analytics(&report.id).await.unwrap();
        assert_eq!(analytics.metrics[0].key, "generic");
    }

    #[tokio::test]
    async fn delete_drops_schedules() {
        let (service, _) = service().await;
        service.delete(&ReportId::new("1")).await.unwrap();
        assert_eq!(service.all().await.len(), 3);

        let schedules = service.all_schedules().await;
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].report_id, ReportId::new("4"));

        assert!(matches!(
            service.delete(&ReportId::new("1")).await,
            Err(ServiceError::NotFound("Report"))
        ));
    }
}
