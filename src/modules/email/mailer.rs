use log::{debug, error, info};

use super::secrets::SecretStore;
use super::smtp::SmtpCredentials;
use super::templates::{recovery_message, send_email, welcome_message, EmailContent};
use crate::modules::auth::{Token, User};
use crate::modules::config::ModuleConfig;
use crate::modules::utils::logging::format_sensitive;
use crate::modules::utils::Translator;

/// Delivers account mail; returns whether the message went out
pub trait Mailer {
    fn send_recovery_message(&self, user: &User, token: &Token) -> bool;

    fn send_welcome_message(&self, user: &User, generated_password: Option<&str>) -> bool;
}

/// Settings every mailer needs to compose messages
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub app_name: String,
    pub recovery_url: String,
    pub recover_within: u64,
    pub translator: Translator,
}

impl MailSettings {
    pub fn from_config(config: &ModuleConfig, translator: Translator) -> Self {
        Self {
            app_name: config.app_name.clone(),
            recovery_url: config.recovery_url.clone(),
            recover_within: config.recover_within,
            translator,
        }
    }

    fn recovery(&self, user: &User, token: &Token) -> EmailContent {
        recovery_message(
            &self.translator,
            &self.app_name,
            &self.recovery_url,
            self.recover_within,
            user,
            token,
        )
    }

    fn welcome(&self, user: &User, generated_password: Option<&str>) -> EmailContent {
        welcome_message(&self.translator, &self.app_name, user, generated_password)
    }
}

/// Sends mail through an SMTP relay
pub struct SmtpMailer {
    settings: MailSettings,
    credentials: SmtpCredentials,
}

impl SmtpMailer {
    pub fn new(settings: MailSettings, credentials: SmtpCredentials) -> Self {
        Self {
            settings,
            credentials,
        }
    }

    fn deliver(&self, to: &str, content: &EmailContent) -> bool {
        match send_email(&self.credentials, &self.settings.app_name, to, content) {
            Ok(()) => {
                info!("Email '{}' sent", content.subject);
                true
            }
            Err(e) => {
                error!("Email '{}' not sent: {}", content.subject, e);
                false
            }
        }
    }
}

impl Mailer for SmtpMailer {
    fn send_recovery_message(&self, user: &User, token: &Token) -> bool {
        self.deliver(&user.email, &self.settings.recovery(user, token))
    }

    fn send_welcome_message(&self, user: &User, generated_password: Option<&str>) -> bool {
        self.deliver(&user.email, &self.settings.welcome(user, generated_password))
    }
}

/// Writes messages to the log instead of sending them.
///
/// Only the masked recipient and the subject are logged at `info`; bodies
/// carry recovery links and generated passwords and go to `debug`.
pub struct LogMailer {
    settings: MailSettings,
}

impl LogMailer {
    pub fn new(settings: MailSettings) -> Self {
        Self { settings }
    }

    fn summary(to: &str, content: &EmailContent) -> String {
        format!(
            "Outgoing mail to {}, subject '{}'",
            format_sensitive(to),
            content.subject
        )
    }

    fn deliver(&self, to: &str, content: &EmailContent) -> bool {
        info!("{}", Self::summary(to, content));
        debug!("Mail body for {}:\n{}", format_sensitive(to), content.body);
        true
    }
}

impl Mailer for LogMailer {
    fn send_recovery_message(&self, user: &User, token: &Token) -> bool {
        self.deliver(&user.email, &self.settings.recovery(user, token))
    }

    fn send_welcome_message(&self, user: &User, generated_password: Option<&str>) -> bool {
        self.deliver(&user.email, &self.settings.welcome(user, generated_password))
    }
}

/// Pick the SMTP mailer when a relay is configured, the log mailer otherwise.
///
/// The SMTP password is read from `secrets`; a configured relay without a
/// stored password is an error.
pub fn mailer_from_config(
    config: &ModuleConfig,
    translator: Translator,
    secrets: &dyn SecretStore,
) -> Result<Box<dyn Mailer>, String> {
    let settings = MailSettings::from_config(config, translator);
    match &config.smtp {
        Some(smtp) => {
            let password = secrets.get_password(&smtp.username).map_err(|e| {
                format!("SMTP password for {} unavailable: {}", smtp.username, e)
            })?;
            Ok(Box::new(SmtpMailer::new(settings, smtp.with_password(password))))
        }
        None => Ok(Box::new(LogMailer::new(settings))),
    }
}
