//! Customer contact details collected at checkout.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::phone::PhoneNumber;
use super::status::OrderType;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;
const NOTES_MAX_CHARS: usize = 500;

/// A single failed input rule, reported next to the form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name (`name`, `phone`, `email`, `address`, `notes`).
    pub field: &'static str,
    /// Message shown to the customer.
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Raw checkout form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated contact details, snapshotted onto the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: PhoneNumber,
    pub email: Email,
    /// Present iff the order is a delivery.
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl CustomerForm {
    /// Validate every field and return all failures at once.
    ///
    /// For pickup orders any address text is dropped.
    ///
    /// # Errors
    ///
    /// Returns one `FieldError` per failing field.
    pub fn validate(&self, order_type: OrderType) -> Result<CustomerInfo, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        let name_chars = name.chars().count();
        if name_chars < NAME_MIN_CHARS {
            errors.push(FieldError::new("name", "Please enter your name."));
        } else if name_chars > NAME_MAX_CHARS {
            errors.push(FieldError::new(
                "name",
                format!("Name must be at most {NAME_MAX_CHARS} characters."),
            ));
        }

        let phone = PhoneNumber::parse(&self.phone)
            .map_err(|e| errors.push(FieldError::new("phone", capitalize(&e.to_string()))))
            .ok();
        let email = Email::parse(&self.email)
            .map_err(|e| errors.push(FieldError::new("email", capitalize(&e.to_string()))))
            .ok();

        let delivery_address = if order_type.is_delivery() {
            let address = self.address.as_deref().map(str::trim).unwrap_or_default();
            if address.is_empty() {
                errors.push(FieldError::new(
                    "address",
                    "Please enter a delivery address.",
                ));
            }
            Some(address.to_owned())
        } else {
            None
        };

        let notes = self
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned);
        if notes
            .as_ref()
            .is_some_and(|n| n.chars().count() > NOTES_MAX_CHARS)
        {
            errors.push(FieldError::new(
                "notes",
                format!("Notes must be at most {NOTES_MAX_CHARS} characters."),
            ));
        }

        match (phone, email) {
            (Some(phone), Some(email)) if errors.is_empty() => Ok(CustomerInfo {
                name: name.to_owned(),
                phone,
                email,
                delivery_address,
                notes,
            }),
            _ => Err(errors),
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect::<String>() + "."
    })
}
