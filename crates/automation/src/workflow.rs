//! The shift workflow: login, staff lookup, date reasoning, filtered
//! search, and cancellation submission.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use call_assistant_config::SiteConfig;
use call_assistant_core::{DateInterval, ShiftRecord, StaffRecord};
use call_assistant_llm::{DateReasoner, ShiftIntent};

use crate::browser::{BrowserConnector, BrowserSession};
use crate::cookies::CookieStore;
use crate::login::login;
use crate::mail::Mailer;
use crate::notify::format_cancellation_email;
use crate::shifts::{filter_by_interval, search_shifts};
use crate::staff::lookup_staff_by_phone;
use crate::WorkflowError;

/// Aggregate of one lookup pass.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub staff: StaffRecord,
    pub interval: DateInterval,
    pub intent: ShiftIntent,
    pub is_shift_query: bool,
    pub all_shifts: Vec<ShiftRecord>,
    pub filtered_shifts: Vec<ShiftRecord>,
}

/// Seam the conversation core calls through; `ShiftWorkflow` is the
/// production implementation.
#[async_trait]
pub trait ShiftService: Send + Sync {
    async fn lookup(
        &self,
        phone: &str,
        utterance: &str,
        stop: &CancellationToken,
    ) -> Result<WorkflowResult, WorkflowError>;

    async fn submit_cancellation(
        &self,
        staff: &StaffRecord,
        shift: &ShiftRecord,
        reason: &str,
    ) -> Result<(), WorkflowError>;
}

pub struct ShiftWorkflow {
    connector: Arc<dyn BrowserConnector>,
    cookies: CookieStore,
    site: SiteConfig,
    mailer: Arc<dyn Mailer>,
    subject: String,
    // reason() is stateful (owned chat history), hence the async mutex.
    reasoner: Mutex<DateReasoner>,
}

impl ShiftWorkflow {
    pub fn new(
        connector: Arc<dyn BrowserConnector>,
        cookies: CookieStore,
        site: SiteConfig,
        mailer: Arc<dyn Mailer>,
        subject: impl Into<String>,
        reasoner: DateReasoner,
    ) -> Self {
        Self {
            connector,
            cookies,
            site,
            mailer,
            subject: subject.into(),
            reasoner: Mutex::new(reasoner),
        }
    }

    async fn run_logged_in(
        &self,
        session: &dyn BrowserSession,
        phone: &str,
        utterance: &str,
        stop: &CancellationToken,
    ) -> Result<WorkflowResult, WorkflowError> {
        check_stop(stop)?;
        let staff = lookup_staff_by_phone(session, &self.site, phone).await?;

        check_stop(stop)?;
        let reasoned = self.reasoner.lock().await.reason(utterance).await;
        tracing::info!(
            interval = %reasoned.interval,
            intent = ?reasoned.intent,
            rationale = %reasoned.rationale,
            "dates reasoned for lookup"
        );

        check_stop(stop)?;
        let all_shifts = search_shifts(session, &self.site, &staff.full_name, &reasoned.interval).await?;

        // The server-side filter is trusted, but not completely.
        let filtered_shifts = filter_by_interval(&all_shifts, &reasoned.interval);

        Ok(WorkflowResult {
            staff,
            interval: reasoned.interval,
            intent: reasoned.intent,
            is_shift_query: reasoned.is_shift_query,
            all_shifts,
            filtered_shifts,
        })
    }
}

#[async_trait]
impl ShiftService for ShiftWorkflow {
    async fn lookup(
        &self,
        phone: &str,
        utterance: &str,
        stop: &CancellationToken,
    ) -> Result<WorkflowResult, WorkflowError> {
        check_stop(stop)?;
        let session = login(self.connector.as_ref(), &self.site, &self.cookies).await?;

        let outcome = self.run_logged_in(session.as_ref(), phone, utterance, stop).await;

        if let Err(e) = session.close().await {
            tracing::warn!("failed to close browser session: {e}");
        }
        outcome
    }

    async fn submit_cancellation(
        &self,
        staff: &StaffRecord,
        shift: &ShiftRecord,
        reason: &str,
    ) -> Result<(), WorkflowError> {
        let body = format_cancellation_email(staff, std::slice::from_ref(shift), Some(reason));
        self.mailer.send(&self.subject, &body).await?;
        tracing::info!(
            shift_id = %shift.shift_id,
            client = %shift.client_name,
            "cancellation submitted"
        );
        Ok(())
    }
}

fn check_stop(stop: &CancellationToken) -> Result<(), WorkflowError> {
    if stop.is_cancelled() {
        Err(WorkflowError::Interrupted)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::TableRow;
    use crate::shifts::parse_shift_row;
    use chrono::NaiveDate;
    use parking_lot::Mutex as SyncMutex;
    use std::sync::Arc;

    struct RecordingMailer {
        sent: SyncMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, subject: &str, body: &str) -> Result<(), WorkflowError> {
            self.sent.lock().push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct ScriptedChat;

    #[async_trait]
    impl call_assistant_llm::Chat for ScriptedChat {
        async fn complete(
            &self,
            _messages: &[call_assistant_llm::Message],
        ) -> Result<String, call_assistant_llm::LlmError> {
            Err(call_assistant_llm::LlmError::EmptyReply)
        }
    }

    struct NoBrowser;

    #[async_trait]
    impl BrowserConnector for NoBrowser {
        async fn open(&self) -> Result<Box<dyn BrowserSession>, WorkflowError> {
            Err(WorkflowError::Browser("no browser in tests".to_string()))
        }
    }

    fn workflow(mailer: Arc<RecordingMailer>) -> ShiftWorkflow {
        let today = NaiveDate::from_ymd_opt(2025, 12, 16);
        let reasoner = DateReasoner::new(Arc::new(ScriptedChat), today);
        ShiftWorkflow::new(
            Arc::new(NoBrowser),
            CookieStore::new(tempfile::tempdir().unwrap().keep()).unwrap(),
            SiteConfig::default(),
            mailer,
            "SHIFT CANCELLATION REQUEST",
            reasoner,
        )
    }

    #[tokio::test]
    async fn test_submit_cancellation_sends_the_template() {
        let mailer = Arc::new(RecordingMailer {
            sent: SyncMutex::new(Vec::new()),
        });
        let workflow = workflow(mailer.clone());

        let staff = StaffRecord {
            id: "1728".into(),
            full_name: "Alannah Courtnay".into(),
            email: "alannah@example.com".into(),
            team: "VIC Team".into(),
            mobile: "0431256441".into(),
        };
        let shift = parse_shift_row(&TableRow {
            cells: vec![
                "Shift".into(),
                "Alannah Courtnay".into(),
                "ABC on 17-12-2025 at 02:00 PM".into(),
            ],
            link: Some("https://site/roster/s123".into()),
        })
        .unwrap();

        workflow
            .submit_cancellation(&staff, &shift, "I'm sick")
            .await
            .unwrap();

        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "SHIFT CANCELLATION REQUEST");
        assert!(sent[0].1.contains("· Name: Alannah Courtnay"));
        assert!(sent[0].1.contains("· ABC at 02:00 PM 17-12-2025"));
        assert!(sent[0].1.contains("    REASON:\n        I'm sick"));
    }

    #[tokio::test]
    async fn test_lookup_respects_stop_before_any_step() {
        let mailer = Arc::new(RecordingMailer {
            sent: SyncMutex::new(Vec::new()),
        });
        let workflow = workflow(mailer);

        let stop = CancellationToken::new();
        stop.cancel();

        let err = workflow
            .lookup("0431256441", "cancel my shift tomorrow", &stop)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Interrupted));
    }
}
