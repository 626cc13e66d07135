//! Credential submissions and the local checks run before any network call.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MAX_FIELD_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(ValidationError::InvalidRole),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The email field is required.")]
    MissingEmail,
    #[error("The email must be a valid email address.")]
    InvalidEmail,
    #[error("The email may not be greater than 255 characters.")]
    EmailTooLong,
    #[error("The password field is required.")]
    MissingPassword,
    #[error("The password must be at least 8 characters.")]
    PasswordTooShort,
    #[error("The password confirmation does not match.")]
    PasswordConfirmationMismatch,
    #[error("The name may not be greater than 255 characters.")]
    NameTooLong,
    #[error("The selected role is invalid.")]
    InvalidRole,
}

/// A credential submission from a client. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub name: Option<String>,
    pub email: String,
    pub password: SecretString,
    pub password_confirmation: Option<SecretString>,
    pub role: Option<Role>,
}

impl Credentials {
    /// Credentials carrying only what a login needs.
    #[must_use]
    pub fn login(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
            password: SecretString::from(password.into()),
            password_confirmation: None,
            role: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_password_confirmation(mut self, confirmation: impl Into<String>) -> Self {
        self.password_confirmation = Some(SecretString::from(confirmation.into()));
        self
    }

    #[must_use]
    pub const fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Email with surrounding whitespace removed; this is what goes on the wire.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.trim()
    }

    /// Checks required for a login: email and password only.
    ///
    /// # Errors
    /// Returns the first failing rule.
    pub fn validate_login(&self) -> Result<(), ValidationError> {
        validate_email(self.email())?;
        validate_password(self.password.expose_secret())
    }

    /// Full checks required for a registration.
    ///
    /// # Errors
    /// Returns the first failing rule.
    pub fn validate_registration(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().chars().count() > MAX_FIELD_LEN {
                return Err(ValidationError::NameTooLong);
            }
        }

        self.validate_login()?;

        if let Some(confirmation) = &self.password_confirmation {
            if confirmation.expose_secret() != self.password.expose_secret() {
                return Err(ValidationError::PasswordConfirmationMismatch);
            }
        }

        Ok(())
    }

    /// JSON body for `POST {base}/register`. Absent optional fields are omitted.
    pub(super) fn registration_payload(&self) -> Value {
        let mut body = Map::new();
        if let Some(name) = &self.name {
            body.insert("name".to_string(), Value::from(name.trim()));
        }
        body.insert("email".to_string(), Value::from(self.email()));
        body.insert(
            "password".to_string(),
            Value::from(self.password.expose_secret()),
        );
        if let Some(confirmation) = &self.password_confirmation {
            body.insert(
                "password_confirmation".to_string(),
                Value::from(confirmation.expose_secret()),
            );
        }
        body.insert(
            "role".to_string(),
            Value::from(self.role.unwrap_or_default().as_str()),
        );
        Value::Object(body)
    }

    /// JSON body for `POST {base}/login`.
    pub(super) fn login_payload(&self) -> Value {
        serde_json::json!({
            "email": self.email(),
            "password": self.password.expose_secret(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field(
                "password_confirmation",
                &self.password_confirmation.as_ref().map(|_| "***"),
            )
            .field("role", &self.role)
            .finish()
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if email.chars().count() > MAX_FIELD_LEN {
        return Err(ValidationError::EmailTooLong);
    }
    if !valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingPassword);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Lightweight email sanity check; the authority owns real verification.
pub(crate) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Credentials {
        Credentials::login("alice@example.com", "correct-horse")
            .with_name("Alice")
            .with_password_confirmation("correct-horse")
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a b@example.com"));
    }

    #[test]
    fn registration_accepts_complete_credentials() {
        assert_eq!(registration().validate_registration(), Ok(()));
    }

    #[test]
    fn registration_rejects_short_password() {
        let credentials = Credentials::login("alice@example.com", "short")
            .with_password_confirmation("short");
        assert_eq!(
            credentials.validate_registration(),
            Err(ValidationError::PasswordTooShort)
        );
    }

    #[test]
    fn registration_rejects_mismatched_confirmation() {
        let credentials = registration().with_password_confirmation("battery-staple");
        assert_eq!(
            credentials.validate_registration(),
            Err(ValidationError::PasswordConfirmationMismatch)
        );
    }

    #[test]
    fn registration_rejects_long_name() {
        let credentials = registration().with_name("x".repeat(256));
        assert_eq!(
            credentials.validate_registration(),
            Err(ValidationError::NameTooLong)
        );
    }

    #[test]
    fn login_rejects_missing_email_and_password() {
        assert_eq!(
            Credentials::login("  ", "correct-horse").validate_login(),
            Err(ValidationError::MissingEmail)
        );
        assert_eq!(
            Credentials::login("alice@example.com", "").validate_login(),
            Err(ValidationError::MissingPassword)
        );
    }

    #[test]
    fn login_rejects_overlong_email() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            Credentials::login(email, "correct-horse").validate_login(),
            Err(ValidationError::EmailTooLong)
        );
    }

    #[test]
    fn login_ignores_confirmation() {
        let credentials = Credentials::login("alice@example.com", "correct-horse")
            .with_password_confirmation("something-else");
        assert_eq!(credentials.validate_login(), Ok(()));
    }

    #[test]
    fn password_length_counts_characters() {
        // 8 multi-byte characters
        let credentials = Credentials::login("alice@example.com", "ääääääää");
        assert_eq!(credentials.validate_login(), Ok(()));
    }

    #[test]
    fn registration_payload_defaults_role_to_user() {
        let payload = registration().registration_payload();
        assert_eq!(payload["role"], "user");
        assert_eq!(payload["name"], "Alice");
        assert_eq!(payload["password_confirmation"], "correct-horse");

        let payload = Credentials::login(" bob@example.com ", "correct-horse")
            .with_role(Role::Admin)
            .registration_payload();
        assert_eq!(payload["role"], "admin");
        assert_eq!(payload["email"], "bob@example.com");
        assert!(payload.get("name").is_none());
        assert!(payload.get("password_confirmation").is_none());
    }

    #[test]
    fn login_payload_carries_email_and_password_only() {
        let payload = registration().login_payload();
        assert_eq!(
            payload,
            serde_json::json!({"email": "alice@example.com", "password": "correct-horse"})
        );
    }

    #[test]
    fn debug_redacts_passwords() {
        let rendered = format!("{:?}", registration());
        assert!(!rendered.contains("correct-horse"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" User ".parse::<Role>(), Ok(Role::User));
        assert_eq!("root".parse::<Role>(), Err(ValidationError::InvalidRole));
    }

    #[test]
    fn role_serializes_lowercase() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_value(Role::Admin)?, "admin");
        let role: Role = serde_json::from_str("\"user\"")?;
        assert_eq!(role, Role::User);
        Ok(())
    }
}
