use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{Message, SmtpTransport, Transport};

use super::smtp::SmtpCredentials;
use crate::modules::auth::{Token, User};
use crate::modules::utils::time::format_duration;
use crate::modules::utils::{Translator, USER_CATEGORY};

/// Subject and plain-text body of an outgoing message
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// Password recovery message carrying the reset link
pub fn recovery_message(
    translator: &Translator,
    app_name: &str,
    recovery_url: &str,
    recover_within: u64,
    user: &User,
    token: &Token,
) -> EmailContent {
    let subject = translator.t(USER_CATEGORY, "Complete password reset on {0}", &[("0", app_name)]);
    let link = token.url(recovery_url);
    let lifetime = format_duration(recover_within);

    let body = format!(
        "{}\n\n{}\n\n{}\n\n{}\n\n{}",
        translator.t(USER_CATEGORY, "Hello {name},", &[("name", user.display_name())]),
        translator.t(
            USER_CATEGORY,
            "We have received a request to reset the password for your account on {0}.",
            &[("0", app_name)]
        ),
        translator.t(
            USER_CATEGORY,
            "Please click the link below to complete your password reset:",
            &[]
        ),
        link,
        translator.t(
            USER_CATEGORY,
            "The link is valid for {0}. If you did not make this request you can ignore this email.",
            &[("0", lifetime.as_str())]
        ),
    );

    EmailContent { subject, body }
}

/// Welcome message sent after registration, with the password if one was generated
pub fn welcome_message(
    translator: &Translator,
    app_name: &str,
    user: &User,
    generated_password: Option<&str>,
) -> EmailContent {
    let subject = translator.t(USER_CATEGORY, "Welcome to {0}", &[("0", app_name)]);

    let mut body = format!(
        "{}\n\n{}",
        translator.t(USER_CATEGORY, "Hello {name},", &[("name", user.display_name())]),
        translator.t(
            USER_CATEGORY,
            "Your account on {0} has been created.",
            &[("0", app_name)]
        ),
    );
    if let Some(password) = generated_password {
        body.push_str("\n\n");
        body.push_str(&translator.t(
            USER_CATEGORY,
            "We have generated a password for you: {0}",
            &[("0", password)]
        ));
    }

    EmailContent { subject, body }
}

/// Deliver a message over SMTP with required TLS
pub fn send_email(
    creds: &SmtpCredentials,
    from_name: &str,
    to_email: &str,
    content: &EmailContent,
) -> Result<(), String> {
    let email = Message::builder()
        .from(
            format!("{} <{}>", from_name, creds.sender())
                .parse()
                .map_err(|e| format!("Invalid from address: {}", e))?,
        )
        .to(to_email
            .parse()
            .map_err(|e| format!("Invalid to address: {}", e))?)
        .subject(content.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(content.body.clone())
        .map_err(|e| format!("Failed to create email: {}", e))?;

    let tls_parameters = TlsParameters::builder(creds.host.clone())
        .build()
        .map_err(|e| format!("Failed to build TLS parameters: {}", e))?;

    let mailer = SmtpTransport::relay(&creds.host)
        .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
        .credentials(Credentials::new(
            creds.username.clone(),
            creds.password.clone(),
        ))
        .port(creds.port)
        .tls(Tls::Required(tls_parameters))
        .pool_config(PoolConfig::new().max_size(1))
        .timeout(Some(std::time::Duration::from_secs(10)))
        .build();

    mailer
        .send(&email)
        .map(|_| ())
        .map_err(|e| format!("Failed to send email: {}", e))
}
