//! Order confirmation emails.
//!
//! Sent after the order has committed. A failed send is logged and never
//! affects the order itself.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::filters;
use crate::models::Order;

#[derive(Template)]
#[template(path = "email/confirmation.html")]
struct ConfirmationHtml<'a> {
    store_name: &'a str,
    customer: &'a str,
    order: &'a Order,
}

#[derive(Template)]
#[template(path = "email/confirmation.txt")]
struct ConfirmationText<'a> {
    store_name: &'a str,
    customer: &'a str,
    order: &'a Order,
}

#[derive(Template)]
#[template(path = "email/new_order.txt")]
struct NewOrderText<'a> {
    customer: &'a str,
    customer_email: &'a str,
    order: &'a Order,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Which order emails went out. `shop` is `None` without a notify address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEmailReport {
    pub customer: bool,
    pub shop: Option<bool>,
}

/// The customer an order email is addressed to.
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    pub name: &'a str,
    pub email: &'a str,
}

#[derive(Clone)]
pub struct OrderMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    notify_address: Option<String>,
    store_name: String,
}

impl OrderMailer {
    /// # Errors
    ///
    /// Returns `EmailError::Smtp` if the relay host is invalid.
    pub fn new(config: &EmailConfig, store_name: &str) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_owned(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            from_address: config.from_address.clone(),
            notify_address: config.notify_address.clone(),
            store_name: store_name.to_owned(),
        })
    }

    /// Send the customer confirmation and, if configured, the shop notice.
    pub async fn send_order_emails(&self, order: &Order, to: Recipient<'_>) -> OrderEmailReport {
        let customer = self.deliver(self.confirmation(order, to)).await.map_or_else(
            |e| {
                tracing::warn!(order_id = %order.id, "Order confirmation email failed: {e}");
                false
            },
            |()| true,
        );

        let shop = match &self.notify_address {
            Some(shop_address) => Some(
                self.deliver(self.new_order_notice(order, to, shop_address))
                    .await
                    .map_or_else(
                        |e| {
                            tracing::warn!(order_id = %order.id, "New order notice failed: {e}");
                            false
                        },
                        |()| true,
                    ),
            ),
            None => None,
        };

        tracing::info!(order_id = %order.id, customer, ?shop, "Order emails processed");
        OrderEmailReport { customer, shop }
    }

    fn confirmation(&self, order: &Order, to: Recipient<'_>) -> Result<Message, EmailError> {
        let store_name = self.store_name.as_str();
        let html = ConfirmationHtml {
            store_name,
            customer: to.name,
            order,
        }
        .render()?;
        let text = ConfirmationText {
            store_name,
            customer: to.name,
            order,
        }
        .render()?;

        Ok(self
            .builder(to.email)?
            .subject(format!("Order Confirmation #{} - {store_name}", order.id))
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html)),
            )?)
    }

    fn new_order_notice(
        &self,
        order: &Order,
        customer: Recipient<'_>,
        shop_address: &str,
    ) -> Result<Message, EmailError> {
        let text = NewOrderText {
            customer: customer.name,
            customer_email: customer.email,
            order,
        }
        .render()?;

        Ok(self
            .builder(shop_address)?
            .subject(format!("New Order #{} - {}", order.id, self.store_name))
            .header(ContentType::TEXT_PLAIN)
            .body(text)?)
    }

    fn builder(&self, to: &str) -> Result<lettre::message::MessageBuilder, EmailError> {
        let from = self
            .from_address
            .parse()
            .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?;
        let to = to
            .parse()
            .map_err(|_| EmailError::InvalidAddress(to.to_owned()))?;
        Ok(Message::builder().from(from).to(to))
    }

    async fn deliver(&self, message: Result<Message, EmailError>) -> Result<(), EmailError> {
        self.mailer.send(message?).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use whimsical_frog_core::{OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod, UserId};

    use crate::models::OrderLine;

    fn mailer(notify: Option<&str>) -> OrderMailer {
        OrderMailer::new(
            &EmailConfig {
                smtp_host: "smtp.example.com".to_owned(),
                smtp_port: 587,
                smtp_username: Some("mailer".to_owned()),
                smtp_password: Some(SecretString::from("pond-relay-7")),
                from_address: "orders@example.com".to_owned(),
                notify_address: notify.map(str::to_owned),
            },
            "WhimsicalFrog",
        )
        .unwrap()
    }

    fn order() -> Order {
        Order {
            id: "07K19P01".to_owned(),
            user_id: UserId::new(7),
            subtotal: Decimal::new(4000, 2),
            shipping_cost: Decimal::ZERO,
            tax_amount: Decimal::new(280, 2),
            total: Decimal::new(4280, 2),
            payment_method: PaymentMethod::Cash,
            check_number: None,
            payment_status: PaymentStatus::default(),
            shipping_method: ShippingMethod::CustomerPickup,
            order_status: OrderStatus::Processing,
            tracking_number: None,
            created_at: Utc::now(),
            lines: vec![OrderLine {
                id: "OI0000000001".to_owned(),
                sku: "WF-TS-002".to_owned(),
                name: "Lily Pad Tee".to_owned(),
                quantity: 2,
                price: Decimal::new(2000, 2),
                color: Some("Green".to_owned()),
                size: None,
            }],
        }
    }

    const KERMIT: Recipient<'static> = Recipient {
        name: "Kermit",
        email: "kermit@pond.example",
    };

    #[tokio::test]
    async fn test_confirmation_message() {
        let message = mailer(None).confirmation(&order(), KERMIT).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Order Confirmation #07K19P01 - WhimsicalFrog"));
        assert!(raw.contains("To: kermit@pond.example"));
        assert!(raw.contains("Lily Pad Tee"));
        assert!(raw.contains("$42.80"));
    }

    #[tokio::test]
    async fn test_new_order_notice() {
        let message = mailer(Some("shop@example.com"))
            .new_order_notice(&order(), KERMIT, "shop@example.com")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: New Order #07K19P01 - WhimsicalFrog"));
        assert!(raw.contains("kermit@pond.example"));
    }

    #[tokio::test]
    async fn test_bad_recipient_is_an_error() {
        let bad = Recipient {
            name: "Nobody",
            email: "not an address",
        };
        assert!(matches!(
            mailer(None).confirmation(&order(), bad),
            Err(EmailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_send_is_reported_not_raised() {
        let bad = Recipient {
            name: "Nobody",
            email: "not an address",
        };
        let report = mailer(None).send_order_emails(&order(), bad).await;
        assert_eq!(
            report,
            OrderEmailReport {
                customer: false,
                shop: None
            }
        );
    }
}
