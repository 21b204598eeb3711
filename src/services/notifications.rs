use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::email_templates::{
    render_body, render_subject, NotificationKind, ReservationEmailContext,
};

/// Outbound mail message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        info!(
            to = ?message.to,
            cc = ?message.cc,
            subject = %message.subject,
            "Mail (log backend)"
        );
        Ok(())
    }
}

/// Hands messages to an HTTP mail relay as JSON.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("Mail client setup failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, message), fields(subject = %message.subject))]
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        let mut request = self.client.post(&self.endpoint).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Mail relay unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "Mail relay returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}

/// Builds the mailer selected by `mail_backend`.
pub fn mailer_from_config(config: &AppConfig) -> Result<Arc<dyn Mailer>, ServiceError> {
    match config.mail_backend.as_str() {
        "http" => {
            let endpoint = config.mail_relay_url.clone().ok_or_else(|| {
                ServiceError::InvalidInput("mail_relay_url is required for the http backend".into())
            })?;
            Ok(Arc::new(HttpMailer::new(
                endpoint,
                config.mail_relay_token.clone(),
            )?))
        }
        "log" => Ok(Arc::new(LogMailer)),
        other => Err(ServiceError::InvalidInput(format!(
            "Unknown mail backend '{}'",
            other
        ))),
    }
}

/// Sends lifecycle mail. Delivery failures are logged and counted, never
/// returned to the caller.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from: String,
    event_sender: Option<EventSender>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
            event_sender: None,
        }
    }

    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Returns whether the mail was handed off successfully.
    pub async fn notify(
        &self,
        request_id: Uuid,
        kind: NotificationKind,
        to: Vec<String>,
        cc: Vec<String>,
        ctx: &ReservationEmailContext,
    ) -> bool {
        let to: Vec<String> = to.into_iter().filter(|a| !a.trim().is_empty()).collect();
        if to.is_empty() {
            warn!(request_id = %request_id, ?kind, "No recipient for notification, skipping");
            return false;
        }

        let message = EmailMessage {
            from: self.from.clone(),
            to,
            cc: cc.into_iter().filter(|a| !a.trim().is_empty()).collect(),
            subject: render_subject(kind, ctx),
            html_body: render_body(kind, ctx),
        };

        match self.mailer.send(&message).await {
            Ok(()) => {
                counter!("reservations.notifications.sent", 1);
                true
            }
            Err(e) => {
                counter!("reservations.notifications.failed", 1);
                warn!(
                    request_id = %request_id,
                    ?kind,
                    error = %e,
                    "Failed to send reservation notification"
                );
                if let Some(sender) = &self.event_sender {
                    sender
                        .send_or_log(Event::NotificationFailed {
                            request_id,
                            recipient: message.to.join(", "),
                            error: e.to_string(),
                        })
                        .await;
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for Recording {
        async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
            if self.fail {
                return Err(ServiceError::ExternalServiceError("relay down".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn ctx() -> ReservationEmailContext {
        ReservationEmailContext {
            reference_number: "RR-202401-0001".into(),
            title: "Planning".into(),
            venue_name: "Room 1".into(),
            requester_name: "Sam".into(),
            requester_email: "sam@example.com".into(),
            from: Utc::now(),
            to: Utc::now(),
            status: "Approved".into(),
            reason: None,
            decided_by: None,
        }
    }

    #[tokio::test]
    async fn blank_recipients_are_dropped() {
        let mailer = Arc::new(Recording::default());
        let notifier = Notifier::new(mailer.clone(), "noreply@example.com");

        let delivered = notifier
            .notify(
                Uuid::new_v4(),
                NotificationKind::Approved,
                vec!["sam@example.com".into(), " ".into()],
                vec!["".into()],
                &ctx(),
            )
            .await;

        assert!(delivered);
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].to, vec!["sam@example.com".to_string()]);
        assert!(sent[0].cc.is_empty());
        assert_eq!(sent[0].from, "noreply@example.com");
    }

    #[tokio::test]
    async fn failures_are_reported_as_events_not_errors() {
        let mailer = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let (sender, mut rx) = crate::events::channel(4);
        let notifier = Notifier::new(mailer, "noreply@example.com").with_events(sender);

        let delivered = notifier
            .notify(
                Uuid::new_v4(),
                NotificationKind::Cancelled,
                vec!["sam@example.com".into()],
                vec![],
                &ctx(),
            )
            .await;

        assert!(!delivered);
        assert_eq!(rx.recv().await.unwrap().name(), "notification_failed");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut config = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        config.mail_backend = "pigeon".into();
        assert!(mailer_from_config(&config).is_err());

        config.mail_backend = "http".into();
        config.mail_relay_url = None;
        assert!(mailer_from_config(&config).is_err());
    }
}
