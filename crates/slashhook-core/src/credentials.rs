//! Application credentials.

use crate::error::CredentialsError;
use secrecy::{ExposeSecret, SecretString};

/// Secrets identifying the application to the platform.
///
/// Read-only after construction. The bot token never appears in `Debug`
/// output.
#[derive(Debug)]
pub struct Credentials {
    /// Hex-encoded Ed25519 public key used to verify webhook signatures.
    pub public_key: String,
    /// Application (client) id.
    pub client_id: String,
    pub token: SecretString,
}

impl Credentials {
    /// Build credentials, rejecting blank values.
    pub fn new(
        public_key: impl Into<String>,
        client_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let public_key = public_key.into();
        let client_id = client_id.into();
        let token = token.into();

        let blanks: Vec<&'static str> = [
            ("PUBLIC_KEY", public_key.trim().is_empty()),
            ("CLIENT_ID", client_id.trim().is_empty()),
            ("TOKEN", token.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, blank)| blank.then_some(name))
        .collect();

        if !blanks.is_empty() {
            return Err(CredentialsError::Blank(blanks));
        }

        Ok(Self {
            public_key,
            client_id,
            token: SecretString::from(token),
        })
    }

    /// `Authorization` header value for API calls.
    pub(crate) fn bot_authorization(&self) -> String {
        format!("Bot {}", self.token.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_are_reported_together() {
        let err = Credentials::new("", "123", "  ").unwrap_err();
        assert_eq!(err, CredentialsError::Blank(vec!["PUBLIC_KEY", "TOKEN"]));
        assert_eq!(
            err.to_string(),
            "the following credentials are blank: PUBLIC_KEY, TOKEN"
        );
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let creds = Credentials::new("abcd", "123", "super-secret").unwrap();
        assert!(!format!("{:?}", creds).contains("super-secret"));
        assert_eq!(creds.bot_authorization(), "Bot super-secret");
    }
}
