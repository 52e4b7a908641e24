use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::utils::error_chain_fmt;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// A fully composed email, ready to hand over to a [`Mailer`].
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub recipient: SubscriberEmail,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid email address.")]
    Address(#[from] AddressError),
    #[error("Failed to build the email message.")]
    Message(#[from] lettre::error::Error),
    #[error("Failed to submit the email over SMTP.")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl std::fmt::Debug for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Mail transport used by the digest sender.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), DeliveryError>;

    /// Checks the transport credentials without sending anything.
    async fn test_connection(&self) -> bool;
}

/// Submits mail over SMTP with STARTTLS and username/password authentication.
pub struct EmailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl EmailClient {
    /// Builds the pooled transport, which spawns its connection pool on the
    /// current Tokio runtime. Must be called from within a runtime.
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: Secret<String>,
        sender: SubscriberEmail,
        sender_name: String,
        timeout: Option<time::Duration>,
    ) -> Result<EmailClient, DeliveryError> {
        let credentials = Credentials::new(username, password.expose_secret().to_owned());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(credentials)
            .timeout(Some(timeout.unwrap_or(REQUEST_TIMEOUT)))
            .build();
        let sender_address: Address = sender.as_ref().parse()?;

        Ok(EmailClient {
            transport,
            sender: Mailbox::new(Some(sender_name), sender_address),
        })
    }

    fn build_message(&self, email: OutgoingEmail) -> Result<Message, DeliveryError> {
        let recipient: Address = email.recipient.as_ref().parse()?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(Mailbox::new(None, recipient))
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))?;

        Ok(message)
    }
}

#[async_trait]
impl Mailer for EmailClient {
    #[tracing::instrument(
        name = "Submit an email over SMTP",
        skip(self, email),
        fields(recipient = %email.recipient)
    )]
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), DeliveryError> {
        let message = self.build_message(email)?;
        self.transport.send(message).await?;

        Ok(())
    }

    #[tracing::instrument(name = "Test the SMTP connection", skip(self))]
    async fn test_connection(&self) -> bool {
        match self.transport.test_connection().await {
            Ok(connected) => connected,
            Err(err) => {
                tracing::error!(error = ?err, "SMTP connection test failed");
                false
            }
        }
    }
}
