//! Pricing settings page.
//!
//! The tax rate is edited as a percentage and stored as a fraction.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use whimsical_frog_core::pricing::PricingSettings;

use super::{Flash, Layout, render, with_message};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub layout: Layout,
    pub settings: SettingsForm,
    pub flash: Flash,
}

/// `POST /settings` form. Checkboxes are absent when unticked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub tax_enabled: Option<String>,
    #[serde(default)]
    pub tax_rate_percent: String,
    #[serde(default)]
    pub tax_shipping: Option<String>,
    #[serde(default)]
    pub free_shipping_threshold: String,
    #[serde(default)]
    pub usps_rate: String,
    #[serde(default)]
    pub fedex_rate: String,
    #[serde(default)]
    pub ups_rate: String,
    #[serde(default)]
    pub local_delivery_fee: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} must be a non-negative amount")]
    Amount(&'static str),
    #[error("Tax rate must be between 0 and 100")]
    TaxRate,
    #[error("Currency must be a three-letter code")]
    Currency,
}

impl From<&PricingSettings> for SettingsForm {
    fn from(settings: &PricingSettings) -> Self {
        let flag = |on: bool| on.then(|| "on".to_owned());
        Self {
            tax_enabled: flag(settings.tax_enabled),
            tax_rate_percent: (settings.tax_rate * Decimal::ONE_HUNDRED)
                .normalize()
                .to_string(),
            tax_shipping: flag(settings.tax_shipping),
            free_shipping_threshold: settings.free_shipping_threshold.to_string(),
            usps_rate: settings.usps_rate.to_string(),
            fedex_rate: settings.fedex_rate.to_string(),
            ups_rate: settings.ups_rate.to_string(),
            local_delivery_fee: settings.local_delivery_fee.to_string(),
            currency: settings.currency.clone(),
        }
    }
}

fn amount(label: &'static str, value: &str) -> Result<Decimal, SettingsError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    value
        .parse::<Decimal>()
        .ok()
        .filter(|d| !d.is_sign_negative())
        .ok_or(SettingsError::Amount(label))
}

impl TryFrom<&SettingsForm> for PricingSettings {
    type Error = SettingsError;

    fn try_from(form: &SettingsForm) -> Result<Self, Self::Error> {
        let percent = amount("Tax rate", &form.tax_rate_percent)
            .map_err(|_| SettingsError::TaxRate)?;
        if percent > Decimal::ONE_HUNDRED {
            return Err(SettingsError::TaxRate);
        }
        let currency = form.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SettingsError::Currency);
        }

        Ok(Self {
            tax_enabled: form.tax_enabled.is_some(),
            tax_rate: percent / Decimal::ONE_HUNDRED,
            tax_shipping: form.tax_shipping.is_some(),
            free_shipping_threshold: amount(
                "Free shipping threshold",
                &form.free_shipping_threshold,
            )?,
            usps_rate: amount("USPS rate", &form.usps_rate)?,
            fedex_rate: amount("FedEx rate", &form.fedex_rate)?,
            ups_rate: amount("UPS rate", &form.ups_rate)?,
            local_delivery_fee: amount("Local delivery fee", &form.local_delivery_fee)?,
            currency,
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(show).post(save))
}

#[instrument(skip(admin, state))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
    let settings = state.pricing().get(state.pool()).await?;
    Ok(render(&SettingsTemplate {
        layout: Layout::new(&state, &admin, "/settings"),
        settings: SettingsForm::from(settings.as_ref()),
        flash,
    }))
}

#[instrument(skip(admin, state, form), fields(admin = %admin.username))]
pub async fn save(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Form(form): Form<SettingsForm>,
) -> Result<Response, AppError> {
    let settings = match PricingSettings::try_from(&form) {
        Ok(settings) => settings,
        Err(e) => {
            return Ok(
                Redirect::to(&with_message("/settings", "error", &e.to_string())).into_response(),
            );
        }
    };
    state.pricing().save(state.pool(), &settings).await?;
    tracing::info!("Pricing settings updated");
    Ok(Redirect::to(&with_message("/settings", "success", "Settings saved")).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_form() {
        let defaults = PricingSettings::default();
        let form = SettingsForm::from(&defaults);
        assert_eq!(form.tax_rate_percent, "7");
        assert_eq!(PricingSettings::try_from(&form).unwrap(), defaults);
    }

    #[test]
    fn test_unticked_checkboxes_disable() {
        let form = SettingsForm {
            tax_enabled: None,
            tax_shipping: None,
            ..SettingsForm::from(&PricingSettings::default())
        };
        let settings = PricingSettings::try_from(&form).unwrap();
        assert!(!settings.tax_enabled);
        assert!(!settings.tax_shipping);
    }

    #[test]
    fn test_rejects_bad_values() {
        let base = SettingsForm::from(&PricingSettings::default());
        let negative = SettingsForm {
            usps_rate: "-1".to_owned(),
            ..base.clone()
        };
        assert_eq!(
            PricingSettings::try_from(&negative).unwrap_err(),
            SettingsError::Amount("USPS rate")
        );
        let rate = SettingsForm {
            tax_rate_percent: "150".to_owned(),
            ..base.clone()
        };
        assert_eq!(PricingSettings::try_from(&rate).unwrap_err(), SettingsError::TaxRate);
        let currency = SettingsForm {
            currency: "dollars".to_owned(),
            ..base
        };
        assert_eq!(
            PricingSettings::try_from(&currency).unwrap_err(),
            SettingsError::Currency
        );
    }
}
