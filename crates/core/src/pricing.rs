//! Shipping and tax quotes.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::ShippingMethod;

/// Tax rate applied when no positive rate is configured.
pub const FALLBACK_TAX_RATE: Decimal = Decimal::from_parts(7, 0, 0, false, 2);

/// Store-wide pricing configuration.
///
/// Persisted as JSON in `shop.settings` under the `pricing` key and edited
/// from the admin settings page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    pub tax_enabled: bool,
    /// Fraction, e.g. `0.0825` for 8.25%.
    pub tax_rate: Decimal,
    pub tax_shipping: bool,
    /// USPS orders at or above this subtotal ship free. Zero disables.
    pub free_shipping_threshold: Decimal,
    pub usps_rate: Decimal,
    pub fedex_rate: Decimal,
    pub ups_rate: Decimal,
    pub local_delivery_fee: Decimal,
    pub currency: String,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            tax_enabled: true,
            tax_rate: FALLBACK_TAX_RATE,
            tax_shipping: false,
            free_shipping_threshold: Decimal::new(5000, 2),
            usps_rate: Decimal::new(899, 2),
            fedex_rate: Decimal::new(1299, 2),
            ups_rate: Decimal::new(1499, 2),
            local_delivery_fee: Decimal::new(7500, 2),
            currency: "USD".to_owned(),
        }
    }
}

impl PricingSettings {
    /// Rate actually charged.
    #[must_use]
    pub fn effective_tax_rate(&self) -> Decimal {
        if self.tax_enabled && self.tax_rate > Decimal::ZERO {
            self.tax_rate
        } else {
            FALLBACK_TAX_RATE
        }
    }

    /// Shipping charge for `method` on an order of `subtotal`.
    #[must_use]
    pub fn shipping_for(&self, method: ShippingMethod, subtotal: Decimal) -> Decimal {
        match method {
            ShippingMethod::CustomerPickup => Decimal::ZERO,
            ShippingMethod::LocalDelivery => self.local_delivery_fee,
            ShippingMethod::Usps => {
                let threshold = self.free_shipping_threshold;
                if threshold > Decimal::ZERO && subtotal >= threshold {
                    Decimal::ZERO
                } else {
                    self.usps_rate
                }
            }
            ShippingMethod::FedEx => self.fedex_rate,
            ShippingMethod::Ups => self.ups_rate,
        }
    }
}

/// Price breakdown shown at checkout and stored on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// Round to cents, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Quote an order.
#[must_use]
pub fn quote(subtotal: Decimal, method: ShippingMethod, settings: &PricingSettings) -> Quote {
    let subtotal = round_cents(subtotal);
    let shipping = round_cents(settings.shipping_for(method, subtotal));
    let taxable = if settings.tax_shipping {
        subtotal + shipping
    } else {
        subtotal
    };
    let tax = round_cents(taxable * settings.effective_tax_rate());
    let total = round_cents(subtotal + shipping + tax);

    Quote {
        subtotal,
        shipping,
        tax,
        total,
        currency: settings.currency.clone(),
    }
}

/// Sum `price * quantity` over order lines.
pub fn subtotal<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, qty)| price * Decimal::from(qty.max(0)))
        .sum()
}

/// Format an amount for display, e.g. `$1,234.50`.
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${grouped}.{cents}")
    } else {
        format!("${grouped}.{cents}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_pickup_is_free() {
        let q = quote(d("20.00"), ShippingMethod::CustomerPickup, &PricingSettings::default());
        assert_eq!(q.shipping, Decimal::ZERO);
        assert_eq!(q.tax, d("1.40"));
        assert_eq!(q.total, d("21.40"));
    }

    #[test]
    fn test_usps_free_over_threshold() {
        let settings = PricingSettings::default();
        assert_eq!(settings.shipping_for(ShippingMethod::Usps, d("49.99")), d("8.99"));
        assert_eq!(settings.shipping_for(ShippingMethod::Usps, d("50.00")), Decimal::ZERO);
    }

    #[test]
    fn test_zero_threshold_disables_free_shipping() {
        let settings = PricingSettings {
            free_shipping_threshold: Decimal::ZERO,
            ..PricingSettings::default()
        };
        assert_eq!(settings.shipping_for(ShippingMethod::Usps, d("500")), d("8.99"));
    }

    #[test]
    fn test_local_delivery_is_never_free() {
        let settings = PricingSettings::default();
        assert_eq!(
            settings.shipping_for(ShippingMethod::LocalDelivery, d("1000")),
            d("75.00")
        );
    }

    #[test]
    fn test_disabled_tax_falls_back() {
        let settings = PricingSettings {
            tax_enabled: false,
            tax_rate: d("0.10"),
            ..PricingSettings::default()
        };
        assert_eq!(settings.effective_tax_rate(), FALLBACK_TAX_RATE);
    }

    #[test]
    fn test_tax_on_shipping() {
        let settings = PricingSettings {
            tax_shipping: true,
            tax_rate: d("0.10"),
            ..PricingSettings::default()
        };
        let q = quote(d("10.00"), ShippingMethod::FedEx, &settings);
        assert_eq!(q.shipping, d("12.99"));
        assert_eq!(q.tax, d("2.30"));
        assert_eq!(q.total, d("25.29"));
    }

    #[test]
    fn test_tax_rounds_half_up() {
        let settings = PricingSettings {
            tax_rate: d("0.05"),
            ..PricingSettings::default()
        };
        // 0.05 * 0.10 = 0.005 -> 0.01
        let q = quote(d("0.10"), ShippingMethod::CustomerPickup, &settings);
        assert_eq!(q.tax, d("0.01"));
    }

    #[test]
    fn test_subtotal() {
        let total = subtotal([(d("12.50"), 2), (d("3.00"), 1), (d("9.99"), -1)]);
        assert_eq!(total, d("28.00"));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(d("0")), "$0.00");
        assert_eq!(format_money(d("1234.5")), "$1,234.50");
        assert_eq!(format_money(d("1234567.891")), "$1,234,567.89");
        assert_eq!(format_money(d("-5")), "-$5.00");
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: PricingSettings =
            serde_json::from_str(r#"{"tax_rate":"0.0825"}"#).unwrap_or_default();
        assert_eq!(settings.tax_rate, d("0.0825"));
        assert_eq!(settings.usps_rate, d("8.99"));
    }
}
