use serde::{Deserialize, Serialize};
use std::fmt;

/// SMTP relay settings kept in the module configuration.
///
/// The password is not part of it; it lives in the system keyring under
/// `username` (see [`super::secrets`]).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SmtpSettings {
    // The email address/username for SMTP authentication
    pub username: String,
    // SMTP server hostname (e.g., smtp.gmail.com)
    pub host: String,
    // SMTP server port (typically 587 for TLS)
    pub port: u16,
    // Sender address; the username is used when absent
    #[serde(default)]
    pub from: Option<String>,
}

impl SmtpSettings {
    /// Combine the settings with the password fetched from the keyring
    pub fn with_password(&self, password: String) -> SmtpCredentials {
        SmtpCredentials {
            username: self.username.clone(),
            password,
            host: self.host.clone(),
            port: self.port,
            from: self.from.clone(),
        }
    }
}

/// SMTP account used to deliver mail
#[derive(Clone, PartialEq)]
pub struct SmtpCredentials {
    pub username: String,
    // The password or app-specific password for SMTP
    pub password: String,
    pub host: String,
    pub port: u16,
    pub from: Option<String>,
}

impl SmtpCredentials {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

impl fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from)
            .finish()
    }
}
