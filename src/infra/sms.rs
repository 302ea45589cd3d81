use anyhow::{anyhow, Result};

use crate::config::AppConfig;

/// SMS channel backed by the Twilio Messages REST API. Present only when the
/// full credential set is configured.
#[derive(Clone)]
pub struct SmsChannel {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl SmsChannel {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let (Some(account_sid), Some(auth_token), Some(from_number)) = (
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_from_number.clone(),
        ) else {
            return None;
        };

        Some(Self {
            client: reqwest::Client::new(),
            account_sid,
            auth_token,
            from_number,
        })
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let params = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("sms provider returned {}: {}", status, detail));
        }
        Ok(())
    }
}
