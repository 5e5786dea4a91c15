// Outbound email
// Decision: Mailer is a trait object so tests and dev mode can swap the transport
// Decision: Without MAIL_API_KEY the log-only mailer is used (codes appear in the log)

pub mod http;

use anyhow::Result;
use async_trait::async_trait;

pub use http::{HttpMailer, MailConfig};

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailMessage {
    /// The verification code email sent on signup and login.
    pub fn otp(to_email: &str, to_name: &str, otp: &str, ttl_minutes: u64) -> Self {
        let subject = "Your verification code".to_string();
        let text = format!(
            "Hello {to_name},\n\nYour verification code is {otp}. It expires in {ttl_minutes} minutes.\n\nIf you did not request this code, you can ignore this email."
        );
        let html = format!(
            "<p>Hello {to_name},</p>\
             <p>Your verification code is <strong>{otp}</strong>. It expires in {ttl_minutes} minutes.</p>\
             <p>If you did not request this code, you can ignore this email.</p>"
        );
        Self {
            to_email: to_email.to_string(),
            to_name: Some(to_name.to_string()),
            subject,
            html,
            text,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// Dev-mode mailer that writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to_email,
            subject = %message.subject,
            body = %message.text,
            "Email delivery disabled, logging message"
        );
        Ok(())
    }
}
