//! Order, payment and shipping enums.
//!
//! All of these are stored as their human-readable label (`"Credit Card"`,
//! `"Customer Pickup"`) in `TEXT` columns, so rows written by hand or by the
//! seed command stay legible. Parsing is case-insensitive.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a label does not match any variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Define an enum whose canonical form is a display label.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $label)] $variant),+
        }

        impl $name {
            /// Every variant, in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Label used for storage and display.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownLabel {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }
    };
}

labelled_enum! {
    /// Fulfillment state of an order.
    OrderStatus, "order status" {
        #[default]
        Pending => "Pending",
        Processing => "Processing",
        Shipped => "Shipped",
        Delivered => "Delivered",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
}

labelled_enum! {
    /// Whether money for an order has been collected.
    PaymentStatus, "payment status" {
        #[default]
        Pending => "Pending",
        Received => "Received",
        Processing => "Processing",
        Refunded => "Refunded",
        Failed => "Failed",
    }
}

labelled_enum! {
    /// How the customer pays.
    PaymentMethod, "payment method" {
        #[default]
        CreditCard => "Credit Card",
        Cash => "Cash",
        Check => "Check",
        PayPal => "PayPal",
        Venmo => "Venmo",
        Other => "Other",
    }
}

labelled_enum! {
    /// How an order reaches the customer.
    ShippingMethod, "shipping method" {
        #[default]
        CustomerPickup => "Customer Pickup",
        LocalDelivery => "Local Delivery",
        Usps => "USPS",
        FedEx => "FedEx",
        Ups => "UPS",
    }
}

impl PaymentMethod {
    /// Status a freshly placed order starts in.
    ///
    /// Cash and check orders wait for payment before work starts.
    #[must_use]
    pub const fn initial_order_status(self) -> OrderStatus {
        match self {
            Self::Cash | Self::Check => OrderStatus::Pending,
            _ => OrderStatus::Processing,
        }
    }
}

impl ShippingMethod {
    /// Single-letter code embedded in order numbers.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::CustomerPickup => 'P',
            Self::LocalDelivery => 'L',
            Self::Usps => 'U',
            Self::FedEx => 'F',
            Self::Ups => 'X',
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_case_insensitively() {
        assert_eq!(
            "credit card".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::CreditCard
        );
        assert_eq!(
            " customer pickup ".parse::<ShippingMethod>().unwrap(),
            ShippingMethod::CustomerPickup
        );
        assert_eq!("SHIPPED".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    }

    #[test]
    fn test_unknown_label() {
        let err = "Bitcoin".parse::<PaymentMethod>().unwrap_err();
        assert_eq!(err.to_string(), "unknown payment method: Bitcoin");
    }

    #[test]
    fn test_initial_order_status() {
        assert_eq!(
            PaymentMethod::Cash.initial_order_status(),
            OrderStatus::Pending
        );
        assert_eq!(
            PaymentMethod::Check.initial_order_status(),
            OrderStatus::Pending
        );
        assert_eq!(
            PaymentMethod::CreditCard.initial_order_status(),
            OrderStatus::Processing
        );
    }

    #[test]
    fn test_shipping_codes_are_distinct() {
        let codes: std::collections::HashSet<char> =
            ShippingMethod::ALL.iter().map(|m| m.code()).collect();
        assert_eq!(codes.len(), ShippingMethod::ALL.len());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&ShippingMethod::LocalDelivery).unwrap();
        assert_eq!(json, "\"Local Delivery\"");
        let parsed: PaymentStatus = serde_json::from_str("\"Received\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Received);
    }
}
