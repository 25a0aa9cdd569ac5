//! Order receipt emails.
//!
//! SMTP host, port and sender come from the environment. Credentials are read
//! from the secrets store (`smtp_username` / `smtp_password`) and fall back to
//! `SMTP_USERNAME` / `SMTP_PASSWORD`.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::filters;
use crate::models::OrderDetail;

/// Secrets store key holding the SMTP user name.
pub const SMTP_USERNAME_KEY: &str = "smtp_username";
/// Secrets store key holding the SMTP password.
pub const SMTP_PASSWORD_KEY: &str = "smtp_password";

#[derive(Template)]
#[template(path = "email/receipt.html")]
struct ReceiptEmailHtml<'a> {
    store_name: &'a str,
    order: &'a OrderDetail,
}

#[derive(Template)]
#[template(path = "email/receipt.txt")]
struct ReceiptEmailText<'a> {
    store_name: &'a str,
    order: &'a OrderDetail,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email is not configured")]
    NotConfigured,

    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// SMTP login, when the relay needs one.
pub struct SmtpLogin {
    pub username: String,
    pub password: SecretString,
}

impl SmtpLogin {
    /// Prefer stored secrets, then the environment. Both parts must come
    /// from the same place.
    #[must_use]
    pub fn resolve(
        stored_username: Option<String>,
        stored_password: Option<String>,
        config: &EmailConfig,
    ) -> Option<Self> {
        match (stored_username, stored_password) {
            (Some(username), Some(password)) => Some(Self {
                username,
                password: SecretString::from(password),
            }),
            _ => match (&config.smtp_username, &config.smtp_password) {
                (Some(username), Some(password)) => Some(Self {
                    username: username.clone(),
                    password: password.clone(),
                }),
                _ => None,
            },
        }
    }
}

#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig, login: Option<SmtpLogin>) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let Some(login) = login {
            builder = builder.credentials(Credentials::new(
                login.username,
                login.password.expose_secret().to_owned(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            from_address: config.from_address.clone(),
        })
    }

    /// Send a receipt for `order` to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_receipt(
        &self,
        to: &str,
        store_name: &str,
        order: &OrderDetail,
    ) -> Result<(), EmailError> {
        let html = ReceiptEmailHtml { store_name, order }.render()?;
        let text = ReceiptEmailText { store_name, order }.render()?;
        let subject = format!("{store_name} receipt for order {}", order.summary.id);

        self.send_multipart_email(to, &subject, &text, &html).await
    }

    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(username: Option<&str>, password: Option<&str>) -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".to_owned(),
            smtp_port: 587,
            smtp_username: username.map(str::to_owned),
            smtp_password: password.map(|p| SecretString::from(p.to_owned())),
            from_address: "orders@example.com".to_owned(),
        }
    }

    #[test]
    fn test_login_prefers_stored_secrets() {
        let login = SmtpLogin::resolve(
            Some("stored".to_owned()),
            Some("stored-pass".to_owned()),
            &config(Some("env"), Some("env-pass")),
        )
        .unwrap();
        assert_eq!(login.username, "stored");
        assert_eq!(login.password.expose_secret(), "stored-pass");
    }

    #[test]
    fn test_login_falls_back_to_env() {
        let login = SmtpLogin::resolve(
            Some("stored".to_owned()),
            None,
            &config(Some("env"), Some("env-pass")),
        )
        .unwrap();
        assert_eq!(login.username, "env");
    }

    #[test]
    fn test_no_login_anywhere() {
        assert!(SmtpLogin::resolve(None, None, &config(None, None)).is_none());
    }
}
