//! Outgoing email. Delivery is an external collaborator: handlers talk to the
//! [`Mailer`] trait, and the binary wires in SMTP when configured or a
//! tracing-backed logger otherwise (useful in development and tests).

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::EmailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Logs outgoing mail instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(to, subject, "email (log-only delivery)\n{body}");
        Ok(())
    }
}

/// Delivers mail through an SMTP relay over TLS.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let smtp = config
            .smtp
            .as_ref()
            .context("smtp configuration missing")?;
        let transport = SmtpTransport::relay(&smtp.host)?
            .credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ))
            .build();
        let from = config.from.parse().context("invalid email.from address")?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("invalid recipient address")?)
            .subject(subject)
            .body(body.to_string())?;

        // The rustls SMTP transport is blocking; keep it off the async runtime.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .context("mailer task panicked")??;
        Ok(())
    }
}

/// Pick the mailer implied by the configuration.
pub fn build(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    if config.smtp.is_some() {
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        Ok(Arc::new(LogMailer))
    }
}

/// Account-verification email body.
pub fn verification_email(frontend_domain: &str, name: &str, token: &str) -> (String, String) {
    let url = format!("{frontend_domain}/verify-email/{token}/");
    (
        "Verifica tu cuenta en Kichwa Yachay".to_string(),
        format!(
            "Hola {name},\n\nGracias por registrarte. Verifica tu cuenta haciendo clic en este enlace:\n{url}\n\nSi tú no solicitaste esta cuenta, puedes ignorar este mensaje.\n"
        ),
    )
}

/// Password-reset email body.
pub fn password_reset_email(frontend_domain: &str, name: &str, token: &str) -> (String, String) {
    let url = format!("{frontend_domain}/reset-password/{token}/");
    (
        "Recupera tu contraseña en Kichwa Yachay".to_string(),
        format!(
            "Hola {name},\n\nRestablece tu contraseña haciendo clic en este enlace:\n{url}\n\nSi tú no solicitaste esto, puedes ignorar este mensaje.\n"
        ),
    )
}
