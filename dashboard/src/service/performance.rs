//! Performance review table
//!
//! SPOCs edit the records, which puts them back to review. Managers approve them.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::AuthService;
use crate::metrics::Metrics;
use crate::model::intern::{InternId, Score};
use crate::model::performance::{ApprovalStatus, PerformanceLevel, PerformanceRecord, RecordEdit};
use crate::model::role::Role;
use crate::notify::Notifications;
use crate::service::{ServiceError, ServiceResult, settle};
use crate::state::{Subject, Subscription};

/// Sample review table
pub fn sample() -> Vec<PerformanceRecord> {
    let record = |id, intern_id: &str, name: &str, email: &str, location: &str, language: &str, score, status| {
        let score = Score::clamped(score);
        PerformanceRecord {
            id,
            intern_id: InternId::new(intern_id),
            name: name.to_owned(),
            location: location.to_owned(),
            language: language.to_owned(),
            email: format!("{email}@ilink-systems.com"),
            college: "Karpagam".to_owned(),
            business_unit: "DEX".to_owned(),
            score,
            level: PerformanceLevel::from_score(score),
            status,
            last_modified_by: None,
            last_modified_at: None,
        }
    };

    use ApprovalStatus::*;
    vec![
        record(1, "I400", "Abdullah Firdowsi", "abdullah.firdowsi", "Chennai", "Python", 95, Approved),
        record(2, "I403", "Logesh M", "logesh.m", "Trichy", "Java", 85, Pending),
        record(3, "I404", "Guna Kuppuchamy", "guna.kuppuchamy", "Trichy", "Java", 65, Pending),
        record(4, "I406", "Gugan MK", "gugan.mk", "Chennai", "Java", 88, Approved),
        record(5, "I411", "Mohana Gowri", "mohana.gowri", "Chennai", "Java", 92, Pending),
        record(6, "I413", "Dilip S", "dilip.s", "Chennai", "Java", 75, Pending),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    #[default]
    Id,
    InternId,
    Name,
    Location,
    Language,
    BusinessUnit,
    Score,
    Level,
    Status,
}

impl SortColumn {
    fn compare(self, a: &PerformanceRecord, b: &PerformanceRecord) -> Ordering {
        let text = |a: &str, b: &str| a.to_lowercase().cmp(&b.to_lowercase());
        match self {
            SortColumn::Id => a.id.cmp(&b.id),
            SortColumn::InternId => a.intern_id.as_str().cmp(b.intern_id.as_str()),
            SortColumn::Name => text(&a.name, &b.name),
            SortColumn::Location => text(&a.location, &b.location),
            SortColumn::Language => text(&a.language, &b.language),
            SortColumn::BusinessUnit => text(&a.business_unit, &b.business_unit),
            SortColumn::Score => a.score.cmp(&b.score),
            SortColumn::Level => a.level.cmp(&b.level),
            SortColumn::Status => a.status.cmp(&b.status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sorting of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortState {
    /// Clicking the current column flips the direction, another column sorts ascending
    pub fn toggle(self, column: SortColumn) -> Self {
        let direction = match (column == self.column, self.direction) {
            (true, SortDirection::Asc) => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        Self { column, direction }
    }

    pub fn sort(&self, records: &mut [PerformanceRecord]) {
        records.sort_by(|a, b| {
            let ordering = self.column.compare(a, b);
            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
}

/// Case-insensitive match of the term against the textual columns
pub fn matches(record: &PerformanceRecord, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || [
            record.intern_id.as_str(),
            record.name.as_str(),
            record.location.as_str(),
            record.language.as_str(),
            record.email.as_str(),
            record.college.as_str(),
            record.business_unit.as_str(),
        ]
        .into_iter()
        .any(|field| field.to_lowercase().contains(&term))
}

/// Review table state, shared by every user of the process
#[derive(Clone)]
pub struct PerformanceStore {
    records: Subject<Vec<PerformanceRecord>>,
    original: Arc<[PerformanceRecord]>,
}

impl PerformanceStore {
    pub fn new(records: Vec<PerformanceRecord>) -> Self {
        Self {
            original: records.clone().into(),
            records: Subject::new(records),
        }
    }

    /// Store over the sample table
    pub fn sample() -> Self {
        Self::new(sample())
    }

    pub async fn records(&self) -> Subscription<Vec<PerformanceRecord>> {
        self.records.subscribe().await
    }

    pub async fn all(&self) -> Vec<PerformanceRecord> {
        self.records.get().await
    }

    pub async fn by_id(&self, id: u32) -> Option<PerformanceRecord> {
        self.records
            .with(|records| records.iter().find(|record| record.id == id).cloned())
            .await
    }

    /// Applies the SPOC edit to the record
    ///
    /// The level follows the new score and the record goes back to review.
    #[instrument(skip(self, edit), err)]
    pub async fn update_as(
        &self,
        role: Role,
        id: u32,
        edit: RecordEdit,
    ) -> ServiceResult<PerformanceRecord> {
        if role != Role::Spoc {
            return Err(ServiceError::PermissionDenied {
                required: Role::Spoc,
            });
        }

        let score = edit.score.map(Score::new).transpose()?;
        let record = self
            .records
            .try_update(|records| -> ServiceResult<PerformanceRecord> {
                let record = records
                    .iter_mut()
                    .find(|record| record.id == id)
                    .ok_or(ServiceError::NotFound("Record"))?;

                if let Some(score) = score {
                    record.score = score;
                }
                record.level = PerformanceLevel::from_score(record.score);
                if let Some(location) = edit.location {
                    record.location = location;
                }
                if let Some(language) = edit.language {
                    record.language = language;
                }
                if let Some(business_unit) = edit.business_unit {
                    record.business_unit = business_unit;
                }
                record.status = ApprovalStatus::Pending;
                record.last_modified_by = Some(role);
                record.last_modified_at = Some(Utc::now());

                Ok(record.clone())
            })
            .await?;

        info!(intern = %record.intern_id, score = %record.score, "Record updated");
        Ok(record)
    }

    /// Approves the record
    #[instrument(skip(self), err)]
    pub async fn approve_as(&self, role: Role, id: u32) -> ServiceResult<PerformanceRecord> {
        if role != Role::Manager {
            return Err(ServiceError::PermissionDenied {
                required: Role::Manager,
            });
        }

        let record = self
            .records
            .try_update(|records| -> ServiceResult<PerformanceRecord> {
                let record = records
                    .iter_mut()
                    .find(|record| record.id == id)
                    .ok_or(ServiceError::NotFound("Record"))?;

                record.status = ApprovalStatus::Approved;
                record.last_modified_by = Some(role);
                record.last_modified_at = Some(Utc::now());
                Ok(record.clone())
            })
            .await?;

        info!(intern = %record.intern_id, "Record approved");
        Ok(record)
    }

    /// Restores the table the store was created with
    pub async fn reset(&self) {
        self.records.set(self.original.to_vec()).await;
    }

    pub async fn search(&self, term: &str) -> Vec<PerformanceRecord> {
        self.records
            .with(|records| {
                records
                    .iter()
                    .filter(|record| matches(record, term))
                    .cloned()
                    .collect()
            })
            .await
    }

    pub async fn sorted(&self, sort: SortState) -> Vec<PerformanceRecord> {
        let mut records = self.all().await;
        sort.sort(&mut records);
        records
    }

    pub async fn metrics(&self) -> Metrics {
        self.records.with(|records| Metrics::of(records)).await
    }
}

/// Review table as seen by the signed in user
#[derive(Clone)]
pub struct InternPerformanceService {
    store: PerformanceStore,
    auth: AuthService,
    notifications: Notifications,
}

impl InternPerformanceService {
    pub fn new(store: PerformanceStore, auth: AuthService, notifications: Notifications) -> Self {
        Self {
            store,
            auth,
            notifications,
        }
    }

    pub fn store(&self) -> &PerformanceStore {
        &self.store
    }

    pub async fn records(&self) -> Subscription<Vec<PerformanceRecord>> {
        self.store.records().await
    }

    pub async fn by_id(&self, id: u32) -> Option<PerformanceRecord> {
        self.store.by_id(id).await
    }

    async fn signed_in_role(&self, required: Role) -> ServiceResult<Role> {
        self.auth
            .role()
            .await
            .ok_or(ServiceError::PermissionDenied { required })
    }

    /// Saves the edited record, only SPOCs can edit
    pub async fn update(&self, id: u32, edit: RecordEdit) -> ServiceResult<PerformanceRecord> {
        self.notifications.set_loading(true).await;
        let result = match self.signed_in_role(Role::Spoc).await {
            Ok(role) => self.store.update_as(role, id, edit).await,
            Err(err) => Err(err),
        };

        settle(&self.notifications, result, |record| {
            Some(format!("Performance of {} updated successfully", record.name))
        })
        .await
    }

    /// Approves the record, only managers can approve
    pub async fn approve(&self, id: u32) -> ServiceResult<PerformanceRecord> {
        self.notifications.set_loading(true).await;
        let result = match self.signed_in_role(Role::Manager).await {
            Ok(role) => self.store.approve_as(role, id).await,
            Err(err) => Err(err),
        };

        settle(&self.notifications, result, |record| {
            Some(format!("Performance of {} approved", record.name))
        })
        .await
    }

    pub async fn reset(&self) {
        self.store.reset().await
    }

    pub async fn can_edit(&self) -> bool {
        self.auth.role().await == Some(Role::Spoc)
    }

    pub async fn can_approve(&self) -> bool {
        self.auth.role().await == Some(Role::Manager)
    }

    pub async fn is_intern(&self) -> bool {
        self.auth.role().await == Some(Role::Intern)
    }

    pub async fn search(&self, term: &str) -> Vec<PerformanceRecord> {
        self.store.search(term).await
    }

    pub async fn sorted(&self, sort: SortState) -> Vec<PerformanceRecord> {
        self.store.sorted(sort).await
    }

    pub async fn metrics(&self) -> Metrics {
        self.store.metrics().await
    }
}
