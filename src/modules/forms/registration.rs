use serde_json::Value;

use super::validation::{self, FormErrors, PasswordPolicy, UsernamePolicy};
use crate::modules::auth::{NewAccount, UserRepository};
use crate::modules::config::ModuleConfig;
use crate::modules::utils::logging::log_auth_event;
use crate::modules::utils::{FlashCategory, Notifier, Translator};

/// Collects user input on registration, validates it and creates the account.
pub struct RegistrationForm<'a> {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_repeat: String,
    config: &'a ModuleConfig,
    translator: &'a Translator,
    errors: FormErrors,
}

impl<'a> RegistrationForm<'a> {
    pub const FORM_NAME: &'static str = "register-form";

    pub fn new(config: &'a ModuleConfig, translator: &'a Translator) -> Self {
        Self {
            email: String::new(),
            username: String::new(),
            password: String::new(),
            password_repeat: String::new(),
            config,
            translator,
            errors: FormErrors::default(),
        }
    }

    /// Attributes that are loaded from input and validated
    pub fn safe_attributes(&self) -> Vec<&'static str> {
        let mut attributes = vec!["email", "password", "password_repeat"];
        if self.config.require_username {
            attributes.insert(1, "username");
        }
        attributes
    }

    pub fn attribute_label(&self, attribute: &str) -> String {
        let label = match attribute {
            "email" => "Email",
            "username" => "Username",
            "password" => "Password",
            "password_repeat" => "Password repeat",
            other => other,
        };
        self.translator.user(label)
    }

    /// Fill the form from `{"register-form": {...}}`.
    ///
    /// Returns false when the payload has no section for this form.
    pub fn load(&mut self, data: &Value) -> bool {
        let Some(fields) = data.get(Self::FORM_NAME).and_then(Value::as_object) else {
            return false;
        };
        for attribute in self.safe_attributes() {
            if let Some(value) = fields.get(attribute).and_then(Value::as_str) {
                let value = value.to_string();
                match attribute {
                    "email" => self.email = value,
                    "username" => self.username = value,
                    "password" => self.password = value,
                    _ => self.password_repeat = value,
                }
            }
        }
        true
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Run every rule; email and username are trimmed first
    pub fn validate<R: UserRepository + ?Sized>(&mut self, users: &R) -> bool {
        self.errors.clear();
        let t = self.translator;
        let generating = self.config.enable_generating_password;

        self.email = self.email.trim().to_string();
        let label = self.attribute_label("email");
        let email = validation::required(&self.email, &label, t)
            .and_then(|_| validation::email(&self.email, &label, t))
            .and_then(|_| {
                validation::unique(
                    &self.email,
                    users.email_taken(&self.email),
                    "This email address has already been taken",
                    t,
                )
            });
        self.errors.record("email", email);

        match UsernamePolicy::from_config(self.config) {
            Ok(policy) => {
                if matches!(policy, UsernamePolicy::Required(_)) {
                    self.username = self.username.trim().to_string();
                }
                let label = self.attribute_label("username");
                let taken = !self.username.is_empty() && users.username_taken(&self.username);
                let username = policy.check(&self.username, taken, &label, t);
                self.errors.record("username", username);
            }
            Err(e) => {
                log::error!("Username rules unavailable: {}", e);
                self.errors
                    .add("username", validation::failure("config", &e, &[], t));
            }
        }

        let label = self.attribute_label("password");
        let password = if generating {
            Ok(())
        } else {
            validation::required(&self.password, &label, t)
        }
        .and_then(|_| {
            // An ignored username never takes part in the strength rule
            let username = (self.config.require_username && !self.username.is_empty())
                .then_some(self.username.as_str());
            let email = (!self.email.is_empty()).then_some(self.email.as_str());
            PasswordPolicy::from_config(self.config).check(
                &self.password,
                username,
                email,
                &label,
                t,
            )
        });
        self.errors.record("password", password);

        let label = self.attribute_label("password_repeat");
        let repeat = if generating {
            Ok(())
        } else {
            validation::required(&self.password_repeat, &label, t)
        }
        .and_then(|_| validation::compare(&self.password, &self.password_repeat, generating, t));
        self.errors.record("password_repeat", repeat);

        self.errors.is_empty()
    }

    /// Copy the form onto a new account
    pub fn account(&self) -> NewAccount {
        NewAccount {
            email: self.email.clone(),
            username: if self.config.require_username {
                self.username.clone()
            } else {
                String::new()
            },
            password: (!self.password.is_empty()).then(|| self.password.clone()),
        }
    }

    /// Register a new account; sets an info flash when it succeeds
    pub fn register<R: UserRepository + ?Sized>(
        &mut self,
        users: &mut R,
        notifier: &mut dyn Notifier,
    ) -> bool {
        if !self.validate(&*users) {
            log_auth_event("register", &self.email, false, Some("validation failed"));
            return false;
        }

        if let Err(e) = users.register(self.account()) {
            log_auth_event("register", &self.email, false, Some(&e));
            return false;
        }

        log_auth_event("register", &self.email, true, None);
        notifier.notify(
            FlashCategory::Info,
            self.translator.user(
                "Your account has been created and a message with further instructions has been sent to your email",
            ),
        );
        true
    }
}
