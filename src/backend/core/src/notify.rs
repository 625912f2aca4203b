//! Notification dispatch.
//!
//! Invoked by the service layer after a successful mutation, never from
//! the policy engine. Dispatch is fire-and-forget: a failed delivery is
//! logged and swallowed, it never fails or rolls back the mutation that
//! triggered it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{Application, Job, Notification, NotificationKind, UserId};
use crate::store::Store;

/// Something worth telling a user about.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// A new application arrived; notify the job's employer.
    ApplicationReceived { application: Application, job: Job },
    /// An application changed status; notify the applicant.
    ApplicationStatusChanged { application: Application, job: Job },
    /// An applicant withdrew; notify the job's employer.
    ApplicationWithdrawn { application: Application, job: Job },
}

impl NotificationEvent {
    /// Who should hear about this.
    pub fn recipient(&self) -> UserId {
        match self {
            Self::ApplicationReceived { job, .. } | Self::ApplicationWithdrawn { job, .. } => {
                job.employer_id
            }
            Self::ApplicationStatusChanged { application, .. } => application.applicant_id,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::ApplicationReceived { .. } => NotificationKind::ApplicationReceived,
            Self::ApplicationStatusChanged { .. } => NotificationKind::ApplicationStatus,
            Self::ApplicationWithdrawn { .. } => NotificationKind::ApplicationWithdrawn,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::ApplicationReceived { job, .. } => {
                format!("New application for \"{}\"", job.title)
            }
            Self::ApplicationStatusChanged { application, job } => {
                format!(
                    "Your application for \"{}\" is now {}",
                    job.title, application.status
                )
            }
            Self::ApplicationWithdrawn { job, .. } => {
                format!("An application for \"{}\" was withdrawn", job.title)
            }
        }
    }

    fn into_notification(self) -> Notification {
        let recipient = self.recipient();
        let kind = self.kind();
        let message = self.message();
        let (job_id, application_id) = match &self {
            Self::ApplicationReceived { application, job }
            | Self::ApplicationStatusChanged { application, job }
            | Self::ApplicationWithdrawn { application, job } => (job.id, application.id),
        };
        Notification::new(recipient, kind, message)
            .about_job(job_id)
            .about_application(application_id)
    }
}

/// Delivery backend.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, event: NotificationEvent) -> Result<()>;
}

/// Fire-and-forget wrapper around [`Notifier::notify`]. Failures are
/// logged at warn and dropped.
pub async fn dispatch(notifier: &dyn Notifier, event: NotificationEvent) {
    let kind = event.kind();
    let recipient = event.recipient();
    if let Err(err) = notifier.notify(event).await {
        warn!(
            kind = kind.as_str(),
            recipient = %recipient,
            error = %err,
            "Notification delivery failed"
        );
    }
}

/// Logs events without delivering anywhere. Useful in development.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<()> {
        debug!(
            kind = event.kind().as_str(),
            recipient = %event.recipient(),
            message = %event.message(),
            "Notification"
        );
        Ok(())
    }
}

/// Persists notifications through the store so users can poll them.
pub struct StoreNotifier {
    store: Arc<dyn Store>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<()> {
        self.store
            .insert_notification(&event.into_notification())
            .await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoardError;
    use crate::model::{ApplicationId, ApplicationStatus, JobId, JobStatus};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn fixture() -> (Application, Job) {
        let job = Job {
            id: JobId::new(),
            employer_id: UserId::new(),
            company_id: None,
            title: "SRE".into(),
            description: String::new(),
            location: "Accra".into(),
            status: JobStatus::Open,
            application_deadline: None,
            created_at: Utc::now(),
        };
        let application = Application {
            id: ApplicationId::new(),
            job_id: job.id,
            applicant_id: UserId::new(),
            status: ApplicationStatus::Shortlisted,
            cover_letter: None,
            applied_at: Utc::now(),
        };
        (application, job)
    }

    #[test]
    fn test_event_recipients() {
        let (application, job) = fixture();
        let received = NotificationEvent::ApplicationReceived {
            application: application.clone(),
            job: job.clone(),
        };
        assert_eq!(received.recipient(), job.employer_id);

        let changed = NotificationEvent::ApplicationStatusChanged {
            application: application.clone(),
            job: job.clone(),
        };
        assert_eq!(changed.recipient(), application.applicant_id);

        let employer = job.employer_id;
        let withdrawn = NotificationEvent::ApplicationWithdrawn { application, job };
        assert_eq!(withdrawn.recipient(), employer);
    }

    #[tokio::test]
    async fn test_store_notifier_persists() {
        let store = Arc::new(MemoryStore::new());
        let notifier = StoreNotifier::new(store.clone());
        let (application, job) = fixture();
        let applicant = application.applicant_id;

        notifier
            .notify(NotificationEvent::ApplicationStatusChanged { application, job })
            .await
            .unwrap();

        let inbox = store.notifications_for(applicant).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::ApplicationStatus);
        assert!(inbox[0].message.contains("shortlisted"));
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _event: NotificationEvent) -> Result<()> {
            Err(BoardError::internal("smtp down"))
        }
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let (application, job) = fixture();
        // Must not panic or propagate.
        dispatch(
            &FailingNotifier,
            NotificationEvent::ApplicationReceived { application, job },
        )
        .await;
    }
}
