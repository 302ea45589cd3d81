use anyhow::{anyhow, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::AppConfig;

/// SMTP email channel. Present only when the full credential set is
/// configured; absence disables the channel without failing startup.
#[derive(Clone)]
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        let (Some(host), Some(username), Some(password), Some(from)) = (
            config.smtp_host.as_ref(),
            config.smtp_username.as_ref(),
            config.smtp_password.as_ref(),
            config.mail_from.as_ref(),
        ) else {
            return Ok(None);
        };

        let from: Mailbox = from
            .parse()
            .map_err(|err| anyhow!("invalid MAIL_FROM: {}", err))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();

        Ok(Some(Self { transport, from }))
    }

    /// Plaintext SMTP for local relays (dev catch-all servers); not for
    /// production providers.
    pub fn plaintext(host: &str, port: u16, from: Mailbox) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();
        Self { transport, from }
    }

    pub async fn send(&self, to: Mailbox, subject: &str, html_body: String) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)?;
        self.transport.send(message).await?;
        Ok(())
    }
}
