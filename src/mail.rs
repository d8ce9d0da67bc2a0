//! Outgoing mail for confirmation codes.
//!
//! [`Mailer`] picks a backend from [`EmailConfig`]: SMTP through the `lettre` async
//! transport, a console backend that only logs, or an in-memory outbox.

use std::sync::{Arc, Mutex};

use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{EmailBackend, EmailConfig};

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// A message accepted by the mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
enum Backend {
    Console,
    Smtp(Arc<AsyncSmtpTransport<Tokio1Executor>>),
    Memory(Arc<Mutex<Vec<OutgoingMail>>>),
}

#[derive(Clone)]
pub struct Mailer {
    from_address: String,
    backend: Backend,
}

impl Mailer {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self, EmailError> {
        let backend = match cfg.backend {
            EmailBackend::Console => Backend::Console,
            EmailBackend::Memory => Backend::Memory(Arc::new(Mutex::new(Vec::new()))),
            EmailBackend::Smtp => {
                let host = cfg
                    .smtp_host
                    .as_deref()
                    .ok_or_else(|| EmailError::Build("email.smtp_host is not set".to_string()))?;
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(cfg.smtp_port);
                if let (Some(user), Some(pass)) = (&cfg.smtp_user, &cfg.smtp_password) {
                    builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
                }
                Backend::Smtp(Arc::new(builder.build()))
            }
        };
        Ok(Self { from_address: cfg.from_address.clone(), backend })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        match &self.backend {
            Backend::Console => {
                tracing::info!(to, subject, body, "Email (console backend)");
            }
            Backend::Memory(outbox) => {
                let mail = OutgoingMail { to: to.to_string(), subject: subject.to_string(), body: body.to_string() };
                outbox.lock().unwrap_or_else(|e| e.into_inner()).push(mail);
            }
            Backend::Smtp(transport) => {
                let email = Message::builder()
                    .from(self.from_address.parse()?)
                    .to(to.parse()?)
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(body.to_string())
                    .map_err(|e| EmailError::Build(e.to_string()))?;
                transport.send(email).await?;
                tracing::info!(to, subject, "Email sent");
            }
        }
        Ok(())
    }

    /// Messages held by the in-memory backend. Empty for other backends.
    pub fn outbox(&self) -> Vec<OutgoingMail> {
        match &self.backend {
            Backend::Memory(outbox) => outbox.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            _ => Vec::new(),
        }
    }
}

pub fn confirmation_subject() -> &'static str {
    "yaMDB: email confirmation code"
}

pub fn confirmation_body(code: &str) -> String {
    format!("Confirmation code: {}", code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> EmailConfig {
        EmailConfig {
            backend: EmailBackend::Memory,
            from_address: "noreply@yamdb.local".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[tokio::test]
    async fn memory_backend_keeps_messages() {
        let mailer = Mailer::from_config(&memory_config()).unwrap();
        mailer.send("a@example.com", confirmation_subject(), &confirmation_body("abc")).await.unwrap();
        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, "a@example.com");
        assert!(outbox[0].body.contains("abc"));
    }

    #[test]
    fn smtp_backend_requires_host() {
        let cfg = EmailConfig { backend: EmailBackend::Smtp, ..memory_config() };
        assert!(matches!(Mailer::from_config(&cfg), Err(EmailError::Build(_))));
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = EmailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }
}
