//! Checkout form data and client-side validation.

use gb_green_guide_core::Email;

use crate::api::FieldErrors;
use crate::models::User;

/// Fewest digits accepted in a phone number.
const MIN_PHONE_DIGITS: usize = 7;
/// Most digits accepted in a phone number (E.164 maximum).
const MAX_PHONE_DIGITS: usize = 15;

/// A field of the checkout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CheckoutField {
    FullName,
    Phone,
    Email,
    City,
    AddressLine1,
    AddressLine2,
    Country,
}

impl CheckoutField {
    /// Every field, in form order.
    pub const ALL: [Self; 7] = [
        Self::FullName,
        Self::Phone,
        Self::Email,
        Self::City,
        Self::AddressLine1,
        Self::AddressLine2,
        Self::Country,
    ];

    /// Fields that must be non-blank.
    pub const REQUIRED: [Self; 5] = [
        Self::FullName,
        Self::Phone,
        Self::Email,
        Self::City,
        Self::AddressLine1,
    ];

    /// Wire name, as used in order requests and API validation payloads.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::City => "city",
            Self::AddressLine1 => "address_line1",
            Self::AddressLine2 => "address_line2",
            Self::Country => "country",
        }
    }

    /// Look up a field by wire name.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    #[must_use]
    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl std::fmt::Display for CheckoutField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Values entered on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutFormData {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub address_line1: String,
    pub address_line2: String,
    pub country: String,
}

impl CheckoutFormData {
    /// A form prefilled from the logged-in user.
    #[must_use]
    pub fn prefilled(user: Option<&User>, default_country: &str) -> Self {
        let mut form = Self {
            country: default_country.to_string(),
            ..Self::default()
        };

        if let Some(user) = user {
            form.full_name = user.display_name().unwrap_or_default();
            form.email = user.email.clone().unwrap_or_default();
            form.phone = user.phone.clone().unwrap_or_default();
        }

        form
    }

    /// Copy values from `other` into fields that are blank here. Returns
    /// true if anything changed.
    pub fn fill_blanks(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for field in CheckoutField::ALL {
            let incoming = other.get(field);
            if self.get(field).trim().is_empty() && !incoming.trim().is_empty() {
                self.set(field, incoming.to_string());
                changed = true;
            }
        }
        changed
    }

    /// Current value of a field.
    #[must_use]
    pub fn get(&self, field: CheckoutField) -> &str {
        match field {
            CheckoutField::FullName => &self.full_name,
            CheckoutField::Phone => &self.phone,
            CheckoutField::Email => &self.email,
            CheckoutField::City => &self.city,
            CheckoutField::AddressLine1 => &self.address_line1,
            CheckoutField::AddressLine2 => &self.address_line2,
            CheckoutField::Country => &self.country,
        }
    }

    /// Replace the value of a field.
    pub fn set(&mut self, field: CheckoutField, value: impl Into<String>) {
        let value = value.into();
        match field {
            CheckoutField::FullName => self.full_name = value,
            CheckoutField::Phone => self.phone = value,
            CheckoutField::Email => self.email = value,
            CheckoutField::City => self.city = value,
            CheckoutField::AddressLine1 => self.address_line1 = value,
            CheckoutField::AddressLine2 => self.address_line2 = value,
            CheckoutField::Country => self.country = value,
        }
    }

    /// Returns true if every required field is non-blank.
    #[must_use]
    pub fn required_filled(&self) -> bool {
        CheckoutField::REQUIRED
            .iter()
            .all(|field| !self.get(*field).trim().is_empty())
    }
}

/// Validate one field's value.
#[must_use]
pub fn validate_field(field: CheckoutField, value: &str) -> Option<&'static str> {
    let value = value.trim();

    match field {
        CheckoutField::FullName if value.is_empty() => Some("Full name is required"),
        CheckoutField::Phone if value.is_empty() => Some("Phone number is required"),
        CheckoutField::Phone if !is_valid_phone(value) => {
            Some("Please enter a valid phone number")
        }
        CheckoutField::Email if value.is_empty() => Some("Email is required"),
        CheckoutField::Email if Email::parse(value).is_err() => {
            Some("Please enter a valid email address")
        }
        CheckoutField::City if value.is_empty() => Some("City is required"),
        CheckoutField::AddressLine1 if value.is_empty() => Some("Address is required"),
        _ => None,
    }
}

/// Validate every field.
#[must_use]
pub fn validate_form(form: &CheckoutFormData) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in CheckoutField::ALL {
        if let Some(message) = validate_field(field, form.get(field)) {
            errors.insert(field.key(), message);
        }
    }
    errors
}

/// Digits plus common separators, with a plausible digit count.
fn is_valid_phone(value: &str) -> bool {
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    let digits = value.chars().filter(char::is_ascii_digit).count();
    let plus_leading = value.rfind('+').is_none_or(|pos| pos == 0);

    allowed && plus_leading && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_messages() {
        assert_eq!(
            validate_field(CheckoutField::Email, "foo"),
            Some("Please enter a valid email address")
        );
        assert_eq!(
            validate_field(CheckoutField::Email, "   "),
            Some("Email is required")
        );
        assert_eq!(validate_field(CheckoutField::Email, "a@b.com"), None);
    }

    #[test]
    fn test_phone_rules() {
        assert_eq!(
            validate_field(CheckoutField::Phone, ""),
            Some("Phone number is required")
        );
        for valid in ["+92 300 1234567", "(0581) 455-123", "03001234567"] {
            assert_eq!(validate_field(CheckoutField::Phone, valid), None, "{valid}");
        }
        for invalid in ["12345", "phone me", "0300-CALL-NOW", "92+3001234567"] {
            assert_eq!(
                validate_field(CheckoutField::Phone, invalid),
                Some("Please enter a valid phone number"),
                "{invalid}"
            );
        }
    }

    #[test]
    fn test_optional_fields_never_error() {
        assert_eq!(validate_field(CheckoutField::AddressLine2, ""), None);
        assert_eq!(validate_field(CheckoutField::Country, ""), None);
    }

    #[test]
    fn test_validate_form_collects_required() {
        let errors = validate_form(&CheckoutFormData::default());
        assert_eq!(errors.len(), 5);
        assert_eq!(errors.get("full_name"), Some("Full name is required"));
        assert_eq!(errors.get("city"), Some("City is required"));
        assert_eq!(errors.get("address_line1"), Some("Address is required"));
    }

    #[test]
    fn test_prefill_from_user() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 4,
            "email": "sana@example.com",
            "first_name": "Sana",
            "last_name": "Baig",
            "phone": "+92 355 1234567"
        }))
        .unwrap();

        let form = CheckoutFormData::prefilled(Some(&user), "Pakistan");
        assert_eq!(form.full_name, "Sana Baig");
        assert_eq!(form.email, "sana@example.com");
        assert_eq!(form.phone, "+92 355 1234567");
        assert_eq!(form.country, "Pakistan");
        assert!(form.city.is_empty());
        assert!(!form.required_filled());
    }

    #[test]
    fn test_fill_blanks_keeps_typed_values() {
        let mut form = CheckoutFormData {
            city: "Skardu".to_string(),
            phone: "+92 311 7654321".to_string(),
            ..CheckoutFormData::default()
        };
        let prefill = CheckoutFormData {
            full_name: "Sana Baig".to_string(),
            phone: "+92 355 1234567".to_string(),
            country: "Pakistan".to_string(),
            ..CheckoutFormData::default()
        };

        assert!(form.fill_blanks(&prefill));
        assert_eq!(form.full_name, "Sana Baig");
        assert_eq!(form.phone, "+92 311 7654321");
        assert_eq!(form.city, "Skardu");
        assert_eq!(form.country, "Pakistan");
        assert!(!form.fill_blanks(&prefill));
    }

    #[test]
    fn test_field_keys_roundtrip() {
        for field in CheckoutField::ALL {
            assert_eq!(CheckoutField::from_key(field.key()), Some(field));
        }
        assert_eq!(CheckoutField::from_key("order_notes"), None);
    }
}
