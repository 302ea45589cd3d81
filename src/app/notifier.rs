use anyhow::Result;
use lettre::message::Mailbox;
use sqlx::Row;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::notice::Notice;
use crate::infra::db::Db;
use crate::infra::email::EmailChannel;
use crate::infra::sms::SmsChannel;

/// The channel capability set, resolved once at startup. Dispatch never
/// re-checks configuration; a channel is either here or it is not.
#[derive(Clone)]
pub struct NotificationChannels {
    pub email: Option<EmailChannel>,
    pub sms: Option<SmsChannel>,
}

impl NotificationChannels {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let email = EmailChannel::from_config(config)?;
        let sms = SmsChannel::from_config(config);

        match &email {
            Some(_) => info!("email notifications enabled"),
            None => warn!("email notifications disabled, SMTP credentials not configured"),
        }
        match &sms {
            Some(_) => info!("sms notifications enabled"),
            None => warn!("sms notifications disabled, Twilio credentials not configured"),
        }

        Ok(Self { email, sms })
    }

    pub fn none() -> Self {
        Self {
            email: None,
            sms: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.sms.is_none()
    }
}

/// Successful sends per channel, out of `recipients` eligible users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub recipients: usize,
    pub email_sent: usize,
    pub sms_sent: usize,
}

pub struct Notifier {
    db: Db,
    channels: NotificationChannels,
}

impl Notifier {
    pub fn new(db: Db, channels: NotificationChannels) -> Self {
        Self { db, channels }
    }

    /// Fan a notice out to every registered user. Every `(user, channel)`
    /// attempt is isolated: a failure is logged and counted, and the batch
    /// carries on. With no channels configured this is a no-op returning a
    /// zero summary.
    pub async fn broadcast(&self, notice: &Notice) -> Result<BroadcastSummary> {
        if self.channels.is_empty() {
            return Ok(BroadcastSummary::default());
        }

        let rows = sqlx::query(
            "SELECT email, first_name, last_name, mobile_no FROM users ORDER BY created_at, id",
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut summary = BroadcastSummary {
            recipients: rows.len(),
            ..Default::default()
        };

        for row in &rows {
            let address: String = row.get("email");
            let first_name: String = row.get("first_name");
            let last_name: String = row.get("last_name");
            let mobile_no: String = row.get("mobile_no");
            let name = format!("{} {}", first_name, last_name);

            if let Some(email) = &self.channels.email {
                match send_email(email, &address, &name, notice).await {
                    Ok(()) => summary.email_sent += 1,
                    Err(err) => {
                        warn!(error = ?err, email = %address, "email notification failed");
                    }
                }
            }

            if let Some(sms) = &self.channels.sms {
                let body = render_sms(&name, notice);
                match sms.send(&mobile_no, &body).await {
                    Ok(()) => summary.sms_sent += 1,
                    Err(err) => {
                        warn!(error = ?err, mobile_no = %mobile_no, "sms notification failed");
                    }
                }
            }
        }

        Ok(summary)
    }
}

async fn send_email(
    channel: &EmailChannel,
    address: &str,
    name: &str,
    notice: &Notice,
) -> Result<()> {
    let to: Mailbox = address.parse()?;
    let subject = format!("New notice: {}", notice.title);
    channel.send(to, &subject, render_email(name, notice)).await
}

/// Fixed HTML template. Optional event fields are omitted entirely when
/// absent, never rendered as blanks.
fn render_email(name: &str, notice: &Notice) -> String {
    let mut body = String::new();
    body.push_str("<html><body>");
    body.push_str("<h2>New Notice</h2>");
    body.push_str(&format!("<p>Hello {},</p>", name));
    body.push_str("<p>A new notice has been posted on the notice board:</p>");
    body.push_str(&format!("<h3>{}</h3>", notice.title));
    body.push_str(&format!(
        "<p><strong>Category:</strong> {}</p>",
        notice.category
    ));
    body.push_str(&format!("<p>{}</p>", notice.description));
    if let Some(event_date) = notice.event_date {
        body.push_str(&format!(
            "<p><strong>Event date:</strong> {}</p>",
            event_date
        ));
    }
    if let Some(start) = notice.event_start_time {
        match notice.event_end_time {
            Some(end) => body.push_str(&format!(
                "<p><strong>Event time:</strong> {} - {}</p>",
                start, end
            )),
            None => body.push_str(&format!("<p><strong>Event time:</strong> {}</p>", start)),
        }
    }
    body.push_str(&format!(
        "<p><strong>Posted on:</strong> {}</p>",
        notice.post_date
    ));
    body.push_str("<p>Please check the notice board for details.</p>");
    body.push_str("</body></html>");
    body
}

fn render_sms(name: &str, notice: &Notice) -> String {
    let mut body = format!(
        "New notice for {}: {}\n{}\n{}",
        name, notice.title, notice.category, notice.description
    );
    if let Some(event_date) = notice.event_date {
        body.push_str(&format!("\nEvent date: {}", event_date));
    }
    body.push_str("\nCheck the notice board for details.");
    body
}
