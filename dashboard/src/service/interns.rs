//! Intern records with their performance and feedback

use chrono::{TimeZone, Utc};
use tracing::{info, instrument};

use crate::auth::AuthService;
use crate::metrics::Metrics;
use crate::model::intern::{
    Feedback, Intern, InternId, NewFeedback, Performance, PerformanceUpdate, Rating, Score,
};
use crate::notify::Notifications;
use crate::service::{ServiceError, ServiceResult, settle};
use crate::state::{Subject, Subscription};

/// Intern shown on the intern dashboard when the user has no matching record
pub const DEFAULT_INTERN: &str = "I346";

fn skills(list: &str) -> Vec<String> {
    list.split(',').map(|skill| skill.trim().to_owned()).collect()
}

/// Sample interns
pub fn sample() -> Vec<Intern> {
    let feedback = |id, message: &str, rating, day| Feedback {
        id,
        author: "SPOC User".to_owned(),
        message: message.to_owned(),
        rating: Rating::clamped(rating),
        timestamp: Utc
            .with_ymd_and_hms(2025, 5, day, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    };

    vec![
        Intern {
            id: InternId::new("I346"),
            name: "Deepan Chakkaravarthi".to_owned(),
            location: "Chennai".to_owned(),
            language: "Python".to_owned(),
            email: "deepan.chakkaravarthi@ilink-systems.com".to_owned(),
            college: "REC".to_owned(),
            primary_skills: skills("Python,SQL"),
            secondary_skills: skills("Cloud computing,RPA"),
            area_of_interest: "Cloud Computing".to_owned(),
            business_unit: "DATA".to_owned(),
            performance: Some(
                Performance::new(Score::clamped(85), 70)
                    .with_strengths(["Python programming", "Database management", "Problem-solving"])
                    .with_improvements(["Communication skills", "Documentation"])
                    .with_feedback(feedback(1, "Good progress on the Python project.", 4, 20)),
            ),
        },
        Intern {
            id: InternId::new("I347"),
            name: "Logesh Kanna".to_owned(),
            location: "Chennai".to_owned(),
            language: "Java".to_owned(),
            email: "logesh.kanna@ilink-systems.com".to_owned(),
            college: "REC".to_owned(),
            primary_skills: skills("Java,SQL"),
            secondary_skills: skills("HTML,CSS,Python"),
            area_of_interest: "Web development , Data Analytics".to_owned(),
            business_unit: "DATA".to_owned(),
            performance: Some(
                Performance::new(Score::clamped(92), 85)
                    .with_strengths(["Java programming", "Web development", "Team collaboration"])
                    .with_improvements(["Testing practices"])
                    .with_feedback(feedback(2, "Excellent work on the Java application.", 5, 22)),
            ),
        },
    ]
}

#[derive(Clone)]
pub struct InternService {
    interns: Subject<Vec<Intern>>,
    auth: AuthService,
    notifications: Notifications,
}

impl InternService {
    pub fn new(interns: Vec<Intern>, auth: AuthService, notifications: Notifications) -> Self {
        Self {
            interns: Subject::new(interns),
            auth,
            notifications,
        }
    }

    /// Service over the sample interns
    pub fn sample(auth: AuthService, notifications: Notifications) -> Self {
        Self::new(sample(), auth, notifications)
    }

    /// Stream of the intern list
    pub async fn interns(&self) -> Subscription<Vec<Intern>> {
        self.interns.subscribe().await
    }

    pub async fn all(&self) -> Vec<Intern> {
        self.interns.get().await
    }

    pub async fn by_id(&self, id: &str) -> Option<Intern> {
        self.interns
            .with(|interns| interns.iter().find(|intern| intern.id.as_str() == id).cloned())
            .await
    }

    /// Intern of the signed in user
    ///
    /// Users are matched to interns by name, falling back to `DEFAULT_INTERN`.
    pub async fn current(&self) -> Option<Intern> {
        if let Some(user) = self.auth.current_user().await
            && let Some(intern) = self
                .interns
                .with(|interns| interns.iter().find(|intern| intern.name == user.name).cloned())
                .await
        {
            return Some(intern);
        }

        self.by_id(DEFAULT_INTERN).await
    }

    /// Appends the feedback to the intern performance
    ///
    /// The feedback id is the position of the feedback on the intern list, starting from 1.
    #[instrument(skip(self, feedback))]
    pub async fn add_feedback(&self, id: &str, feedback: NewFeedback) -> ServiceResult<Feedback> {
        self.notifications.set_loading(true).await;
        let result = self
            .interns
            .try_update(|interns| -> ServiceResult<Feedback> {
                let performance = interns
                    .iter_mut()
                    .find(|intern| intern.id.as_str() == id)
                    .and_then(|intern| intern.performance.as_mut())
                    .ok_or(ServiceError::NotFound("Intern"))?;

                let feedback =
                    feedback.validate(performance.feedback.len() as u32 + 1, Utc::now())?;
                performance.feedback.push(feedback.clone());
                Ok(feedback)
            })
            .await;

        settle(&self.notifications, result, |_| {
            info!("Feedback added");
            Some("Feedback added successfully".to_owned())
        })
        .await
    }

    /// Updates the intern performance, grade and level follow the new score
    #[instrument(skip(self, update))]
    pub async fn update_performance(
        &self,
        id: &str,
        update: PerformanceUpdate,
    ) -> ServiceResult<Performance> {
        self.notifications.set_loading(true).await;
        let result = self
            .interns
            .try_update(|interns| -> ServiceResult<Performance> {
                let performance = interns
                    .iter_mut()
                    .find(|intern| intern.id.as_str() == id)
                    .and_then(|intern| intern.performance.as_mut())
                    .ok_or(ServiceError::NotFound("Intern"))?;

                *performance = update.apply(performance)?;
                Ok(performance.clone())
            })
            .await;

        settle(&self.notifications, result, |performance| {
            info!(score = %performance.score, "Performance updated");
            Some("Performance updated successfully".to_owned())
        })
        .await
    }

    /// Unique skills of all the interns, primary first
    pub async fn skills(&self) -> Vec<String> {
        self.interns
            .with(|interns| {
                let mut skills: Vec<String> = vec![];
                let all = interns
                    .iter()
                    .flat_map(|intern| &intern.primary_skills)
                    .chain(interns.iter().flat_map(|intern| &intern.secondary_skills));

                for skill in all {
                    let skill = skill.trim();
                    if !skill.is_empty() && !skills.iter().any(|known| known == skill) {
                        skills.push(skill.to_owned());
                    }
                }
                skills
            })
            .await
    }

    pub async fn metrics(&self) -> Metrics {
        self.interns.with(|interns| Metrics::of(interns)).await
    }
}
