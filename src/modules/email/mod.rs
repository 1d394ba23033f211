pub mod mailer;
pub mod secrets;
mod smtp;
mod templates;

pub use mailer::{mailer_from_config, LogMailer, MailSettings, Mailer, SmtpMailer};
pub use secrets::{KeyringSecrets, SecretStore, KEYRING_SERVICE};
pub use smtp::{SmtpCredentials, SmtpSettings};
pub use templates::{recovery_message, send_email, welcome_message, EmailContent};
