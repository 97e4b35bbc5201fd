//! Delivery-detail validation and order pricing for the cash-on-delivery
//! checkout.
//!
//! Fields are trimmed before any rule runs and the trimmed values are what
//! gets stored. Rules run in field order (name, phone, address) and only the
//! first failure is reported.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\-\s()]{10,15}$").expect("phone pattern is valid"));

const FIELD_ORDER: [&str; 3] = ["name", "phone", "address"];

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeliveryDetails {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[validate(regex(path = *PHONE_REGEX, message = "Invalid phone number format"))]
    pub phone: String,
    #[validate(custom(function = "validate_address"))]
    pub address: String,
    //Resubmitting with the same key returns the first order instead of a new one.
    #[serde(default)]
    pub idempotency_key: Option<Uuid>,
}

impl DeliveryDetails {
    pub fn trimmed(self) -> Self {
        DeliveryDetails {
            name: self.name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            address: self.address.trim().to_owned(),
            idempotency_key: self.idempotency_key,
        }
    }

    /// Trims and validates, returning the cleaned details or the message of
    /// the first rule that failed.
    pub fn into_valid(self) -> Result<Self, String> {
        let details = self.trimmed();
        match details.validate() {
            Ok(()) => Ok(details),
            Err(errors) => Err(first_message(&errors)),
        }
    }
}

fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    FIELD_ORDER
        .iter()
        .filter_map(|field| fields.get(*field))
        .filter_map(|errs| errs.first())
        .map(|err| {
            err.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid {}", err.code))
        })
        .next()
        .unwrap_or_else(|| "Invalid delivery details".to_owned())
}

fn length_rule(
    value: &str,
    code: &'static str,
    min: usize,
    max: usize,
    too_short: &'static str,
    too_long: &'static str,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::new(code).with_message(Cow::Borrowed(too_short)));
    }
    if len > max {
        return Err(ValidationError::new(code).with_message(Cow::Borrowed(too_long)));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    length_rule(
        name,
        "name",
        2,
        100,
        "Name must be at least 2 characters",
        "Name is too long",
    )
}

fn validate_address(address: &str) -> Result<(), ValidationError> {
    length_rule(
        address,
        "address",
        10,
        500,
        "Please provide a complete address",
        "Address is too long",
    )
}

/// Quantity from `?quantity=`, defaulting to one. Not checked against stock.
pub fn requested_quantity(raw: Option<i32>) -> Result<i32, String> {
    match raw.unwrap_or(1) {
        quantity if quantity >= 1 => Ok(quantity),
        _ => Err("Quantity must be at least 1".to_owned()),
    }
}

/// Price times quantity, rounded to cents.
pub fn order_total(price: f64, quantity: i32) -> f64 {
    (price * f64::from(quantity) * 100.0).round() / 100.0
}

pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// True when `amount` is a finite value with no more than two decimals.
pub fn is_whole_cents(amount: f64) -> bool {
    let cents = amount * 100.0;
    cents.is_finite() && (cents - cents.round()).abs() < 1e-6
}
