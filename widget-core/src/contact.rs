use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Shape check only (local@domain.tld); the backend owns real verification.
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactFormError {
    #[error("Name is required")]
    NameRequired,
    #[error("Invalid email")]
    InvalidEmail,
}

/// Raw values from the sign-in form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
}

/// Normalized contact details, ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
}

impl ContactForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<ContactDetails, ContactFormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContactFormError::NameRequired);
        }

        let email = self.email.trim().to_lowercase();
        if !email_re().is_match(&email) {
            return Err(ContactFormError::InvalidEmail);
        }

        Ok(ContactDetails {
            name: name.to_string(),
            email,
        })
    }
}

/// Client environment captured when a contact session is created.
///
/// Every field is optional: a native host fills in what it knows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        let err = ContactForm::new("   ", "a@b.co").validate().unwrap_err();
        assert_eq!(err, ContactFormError::NameRequired);
        assert_eq!(err.to_string(), "Name is required");
    }

    #[test]
    fn malformed_email_is_rejected() {
        for email in ["", "jane", "jane@", "jane@example", "ja ne@example.com"] {
            let err = ContactForm::new("Jane", email).validate().unwrap_err();
            assert_eq!(err.to_string(), "Invalid email", "email={email:?}");
        }
    }

    #[test]
    fn normalizes_name_and_email() {
        let details = ContactForm::new("  Jane Doe ", "  Jane.Doe@Example.COM ")
            .validate()
            .unwrap();
        assert_eq!(details.name, "Jane Doe");
        assert_eq!(details.email, "jane.doe@example.com");
    }

    #[test]
    fn metadata_uses_camel_case_and_skips_missing_fields() {
        let meta = ContactMetadata {
            user_agent: Some("widget-cli".into()),
            timezone_offset: Some(-60),
            ..Default::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["userAgent"], "widget-cli");
        assert_eq!(json["timezoneOffset"], -60);
        assert!(json.get("referrer").is_none());
    }
}
