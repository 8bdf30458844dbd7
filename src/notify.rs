use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::{Config, EmailConfig};
use crate::models::user::AuthType;

/// Work items handed to the delivery worker.
#[derive(Debug)]
pub enum Notification {
    VerificationCode {
        channel: AuthType,
        recipient: String,
        code: String,
    },
}

/// Handle used by request handlers to dispatch notifications. The HTTP
/// path never waits on delivery; the response is already decided when the
/// worker picks the item up.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    pub fn send_verification_code(&self, channel: AuthType, recipient: &str, code: &str) {
        let notification = Notification::VerificationCode {
            channel,
            recipient: recipient.to_string(),
            code: code.to_string(),
        };
        if self.tx.send(notification).is_err() {
            error!("Notification worker is gone, dropping verification code dispatch");
        }
    }
}

/// Spawn the delivery worker and return the sending handle.
pub fn spawn_notifier() -> Notifier {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_worker(rx));
    Notifier { tx }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Notification>) {
    let config = &Config::get().email;
    let mailer = build_mailer(config);
    if mailer.is_none() {
        info!("SMTP not configured, verification codes will be logged instead");
    }

    while let Some(notification) = rx.recv().await {
        match notification {
            Notification::VerificationCode {
                channel,
                recipient,
                code,
            } => {
                if let Err(e) = deliver_code(&mailer, config, channel, &recipient, &code).await {
                    // Delivery failures never reach the caller; make sure
                    // they at least reach the operator.
                    error!("Failed to deliver verification code to {}: {}", recipient, e);
                }
            }
        }
    }
}

fn build_mailer(config: &EmailConfig) -> Option<AsyncSmtpTransport<Tokio1Executor>> {
    let host = config.smtp_host.as_deref()?;
    let builder = match AsyncSmtpTransport::<Tokio1Executor>::relay(host) {
        Ok(builder) => builder,
        Err(e) => {
            error!("Invalid SMTP relay {}: {}", host, e);
            return None;
        }
    };
    let mailer = builder
        .credentials(Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ))
        .build();
    Some(mailer)
}

/// Build the verification email for a code.
pub fn verification_email(
    from_address: &str,
    recipient: &str,
    code: &str,
) -> anyhow::Result<Message> {
    Message::builder()
        .from(from_address.parse()?)
        .to(recipient.parse()?)
        .subject("Your Verification Code")
        .header(ContentType::TEXT_PLAIN)
        .body(format!(
            "Your verification code is {}. It expires in a few minutes.",
            code
        ))
        .map_err(Into::into)
}

async fn deliver_code(
    mailer: &Option<AsyncSmtpTransport<Tokio1Executor>>,
    config: &EmailConfig,
    channel: AuthType,
    recipient: &str,
    code: &str,
) -> anyhow::Result<()> {
    match channel {
        AuthType::Phone => {
            // SMS delivery is an external concern; surface the code for
            // development setups.
            info!("Verification code for {}: {}", recipient, code);
            Ok(())
        }
        AuthType::Email => match mailer {
            Some(mailer) => {
                let email = verification_email(&config.from_address, recipient, code)?;
                mailer.send(email).await?;
                info!("Verification code sent to {}", recipient);
                Ok(())
            }
            None => {
                info!("Verification code for {}: {}", recipient, code);
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_verification_email() {
        let email =
            verification_email("no-reply@photogram.local", "user@example.com", "1234");
        assert!(email.is_ok());
    }

    #[test]
    fn rejects_invalid_recipient() {
        let email = verification_email("no-reply@photogram.local", "not an address", "1234");
        assert!(email.is_err());
    }

    #[tokio::test]
    async fn unconfigured_mailer_logs_instead_of_failing() {
        let config = EmailConfig {
            smtp_host: None,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: "no-reply@photogram.local".into(),
        };
        let mailer = build_mailer(&config);
        assert!(mailer.is_none());
        let result =
            deliver_code(&mailer, &config, AuthType::Email, "user@example.com", "1234").await;
        assert!(result.is_ok());
    }
}
