use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::SmtpConfig;
use crate::models::{Athlete, TrainingWeek};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// Fire-and-forget outbound notifications. Callers log and swallow
/// failures; nothing here may fail the pipeline.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// "Your training schedule was updated" signal to the athlete.
    async fn week_updated(
        &self,
        athlete: &Athlete,
        week: &TrainingWeek,
    ) -> Result<(), NotifyError>;

    /// Operator alert for a failed invocation.
    async fn alert(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

pub struct EmailNotifier {
    config: SmtpConfig,
}

impl EmailNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn render_week_html(week: &TrainingWeek) -> String {
        let mut items = String::new();
        for session in &week.sessions {
            items.push_str(&format!(
                "<li><strong>{}</strong> {:?} &mdash; {:.1} mi<br>{}</li>",
                session.day, session.session_type, session.distance, session.notes
            ));
        }
        format!(
            "<html><body>\
             <h1>Your Training Schedule</h1>\
             <p>Get pumped for this week's training.</p>\
             <ul>{items}</ul>\
             </body></html>"
        )
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), NotifyError> {
        let from: Mailbox = self
            .config
            .from_email
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(self.config.from_email.clone()))?;
        let to: Mailbox = to
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let config = self.config.clone();
        // lettre's SMTP transport is blocking; keep it off the runtime threads.
        tokio::task::spawn_blocking(move || {
            let mailer = SmtpTransport::relay(&config.host)
                .map_err(|e| NotifyError::Delivery(e.to_string()))?
                .credentials(Credentials::new(config.username, config.password))
                .build();
            mailer
                .send(&message)
                .map(|_| ())
                .map_err(|e| NotifyError::Delivery(e.to_string()))
        })
        .await
        .map_err(|e| NotifyError::Delivery(e.to_string()))?
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn week_updated(
        &self,
        athlete: &Athlete,
        week: &TrainingWeek,
    ) -> Result<(), NotifyError> {
        let Some(email) = athlete.email.as_deref() else {
            info!(athlete_id = athlete.athlete_id, "no email on file, skipping");
            return Ok(());
        };
        let html = Self::render_week_html(week);
        self.send(email, "Your training schedule was updated", html)
            .await?;
        info!(athlete_id = athlete.athlete_id, "sent week-updated email");
        Ok(())
    }

    async fn alert(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let html = format!("<html><body><h1>{subject}</h1><p>{body}</p></body></html>");
        self.send(&self.config.alert_email, subject, html).await
    }
}
