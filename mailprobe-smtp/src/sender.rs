//! Per-target probe submission: one full SMTP exchange per probe mail.

use std::time::Duration;

use async_trait::async_trait;

use mailprobe_common::{config::TargetConfig, outgoing, traits::MailSender};

use crate::client::SmtpClient;
use crate::error::{ClientError, Result};

/// Upper bound on one whole submission exchange, greeting through QUIT.
const SUBMISSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Identification offered in EHLO; relays only need something syntactically
/// valid from a submission client.
const EHLO_DOMAIN: &str = "localhost";

/// A [`MailSender`] that drives one SMTP submission per probe through the
/// target's configured relay.
#[derive(Debug, Clone)]
pub struct SmtpSender {
    target: TargetConfig,
}

impl SmtpSender {
    #[must_use]
    pub const fn new(target: TargetConfig) -> Self {
        Self { target }
    }

    async fn submit(&self, message: &[u8]) -> Result<()> {
        let mut client = SmtpClient::connect(&self.target.relay_addr()).await?;

        client.read_greeting().await?.completed()?;
        client.ehlo(EHLO_DOMAIN).await?.completed()?;

        if !self.target.login.is_empty() {
            client
                .auth_plain(&self.target.login, &self.target.passphrase)
                .await?
                .completed()?;
        }

        client.mail_from(&self.target.from).await?.completed()?;
        client.rcpt_to(&self.target.to).await?.completed()?;
        client.data().await?.intermediate()?;
        client.send_data(message).await?.completed()?;

        // The probe is accepted at this point; a failed QUIT is not worth
        // surfacing
        client.quit().await.ok();

        Ok(())
    }
}

#[async_trait]
impl MailSender for SmtpSender {
    async fn send(&self, message: &[u8]) -> anyhow::Result<()> {
        outgoing!(
            level = DEBUG,
            "sending probe mail via {}",
            self.target.relay_addr()
        );

        tokio::time::timeout(SUBMISSION_TIMEOUT, self.submit(message))
            .await
            .map_err(|_| ClientError::Timeout)??;

        Ok(())
    }
}
