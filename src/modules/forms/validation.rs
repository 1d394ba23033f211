//! Field rules shared by the forms.
//!
//! Each rule returns a `validator::ValidationError` carrying the translated
//! message on failure. Rules other than `required` pass on an empty value, so
//! a form reports at most one message per attribute by chaining them with
//! `and_then`.

use regex::Regex;
use std::borrow::Cow;
use validator::{ValidateEmail, ValidateLength, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::modules::auth::StrengthValidator;
use crate::modules::config::ModuleConfig;
use crate::modules::utils::{Translator, USER_CATEGORY};
use crate::{PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, USERNAME_MAX_LENGTH, USERNAME_MIN_LENGTH};

pub type RuleResult = Result<(), ValidationError>;

/// Check that an address has a valid local part and a dotted domain
pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
        && email
            .rsplit_once('@')
            .map_or(false, |(_, domain)| domain.contains('.'))
}

/// Validation messages per attribute
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormErrors(ValidationErrors);

impl FormErrors {
    pub fn add(&mut self, attribute: &'static str, error: ValidationError) {
        self.0.add(attribute, error);
    }

    /// Record the outcome of a rule chain
    pub fn record(&mut self, attribute: &'static str, result: RuleResult) {
        if let Err(error) = result {
            self.add(attribute, error);
        }
    }

    fn field(&self, attribute: &str) -> &[ValidationError] {
        match self.0.errors().get(attribute) {
            Some(ValidationErrorsKind::Field(errors)) => errors.as_slice(),
            _ => &[],
        }
    }

    pub fn has(&self, attribute: &str) -> bool {
        !self.field(attribute).is_empty()
    }

    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.field(attribute)
            .first()
            .and_then(|error| error.message.as_deref())
    }

    pub fn get(&self, attribute: &str) -> Vec<&str> {
        self.field(attribute)
            .iter()
            .filter_map(|error| error.message.as_deref())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0 = ValidationErrors::new();
    }

    /// Attributes with their messages, sorted by attribute name
    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec<&str>)> {
        let mut attributes: Vec<&str> = self.0.errors().keys().map(|key| &**key).collect();
        attributes.sort_unstable();
        attributes
            .into_iter()
            .map(move |attribute| (attribute, self.get(attribute)))
    }

    pub fn as_validation_errors(&self) -> &ValidationErrors {
        &self.0
    }
}

/// Build an error with `code` whose message is `text` translated with `params`
pub fn failure(
    code: &'static str,
    text: &str,
    params: &[(&'static str, String)],
    t: &Translator,
) -> ValidationError {
    let mut error = ValidationError::new(code);
    for (name, value) in params {
        error.add_param(Cow::Borrowed(*name), value);
    }
    let args: Vec<(&str, &str)> = params
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect();
    error.message = Some(Cow::Owned(t.t(USER_CATEGORY, text, &args)));
    error
}

fn attribute(label: &str) -> (&'static str, String) {
    ("attribute", label.to_string())
}

pub fn required(value: &str, label: &str, t: &Translator) -> RuleResult {
    if value.is_empty() {
        return Err(failure("required", "{attribute} cannot be blank.", &[attribute(label)], t));
    }
    Ok(())
}

pub fn email(value: &str, label: &str, t: &Translator) -> RuleResult {
    if value.is_empty() || is_valid_email(value) {
        return Ok(());
    }
    Err(failure(
        "email",
        "{attribute} is not a valid email address.",
        &[attribute(label)],
        t,
    ))
}

/// Length in characters, inclusive bounds
pub fn length(value: &str, min: usize, max: usize, label: &str, t: &Translator) -> RuleResult {
    if value.is_empty() {
        return Ok(());
    }
    if !value.validate_length(Some(min as u64), None, None) {
        return Err(failure(
            "length",
            "{attribute} should contain at least {min} characters.",
            &[attribute(label), ("min", min.to_string())],
            t,
        ));
    }
    if !value.validate_length(None, Some(max as u64), None) {
        return Err(failure(
            "length",
            "{attribute} should contain at most {max} characters.",
            &[attribute(label), ("max", max.to_string())],
            t,
        ));
    }
    Ok(())
}

pub fn pattern(value: &str, regex: &Regex, label: &str, t: &Translator) -> RuleResult {
    if value.is_empty() || regex.is_match(value) {
        return Ok(());
    }
    Err(failure("regex", "{attribute} is invalid.", &[attribute(label)], t))
}

/// Fails with `taken_message` when the store already holds the value
pub fn unique(value: &str, taken: bool, taken_message: &str, t: &Translator) -> RuleResult {
    if value.is_empty() || !taken {
        return Ok(());
    }
    Err(failure("unique", taken_message, &[], t))
}

/// `repeat` must equal `password`; an empty repeat passes when `skip_on_empty`
pub fn compare(password: &str, repeat: &str, skip_on_empty: bool, t: &Translator) -> RuleResult {
    if skip_on_empty && repeat.is_empty() {
        return Ok(());
    }
    if password == repeat {
        return Ok(());
    }
    Err(failure("must_match", "Passwords are not the same", &[], t))
}

/// How a new password is judged
#[derive(Debug, Clone)]
pub enum PasswordPolicy {
    Strength(StrengthValidator),
    Length { min: usize, max: usize },
}

impl PasswordPolicy {
    pub fn from_config(config: &ModuleConfig) -> Self {
        if config.enable_strength_validation {
            PasswordPolicy::Strength(StrengthValidator::new(config.password_strength.rules()))
        } else {
            PasswordPolicy::Length {
                min: PASSWORD_MIN_LENGTH,
                max: PASSWORD_MAX_LENGTH,
            }
        }
    }

    pub fn check(
        &self,
        password: &str,
        username: Option<&str>,
        email: Option<&str>,
        label: &str,
        t: &Translator,
    ) -> RuleResult {
        if password.is_empty() {
            return Ok(());
        }
        match self {
            PasswordPolicy::Length { min, max } => length(password, *min, *max, label, t),
            PasswordPolicy::Strength(validator) => validator
                .validate(password, username, email)
                .map_err(|e| {
                    let (text, n) = e.message();
                    let n = n.map(|n| n.to_string()).unwrap_or_default();
                    failure("password_strength", text, &[attribute(label), ("n", n)], t)
                }),
        }
    }
}

/// Whether and how the username is checked
#[derive(Debug, Clone)]
pub enum UsernamePolicy {
    Required(Regex),
    Ignored,
}

impl UsernamePolicy {
    pub fn from_config(config: &ModuleConfig) -> Result<Self, String> {
        if config.require_username {
            Ok(UsernamePolicy::Required(config.username_regex()?))
        } else {
            Ok(UsernamePolicy::Ignored)
        }
    }

    pub fn check(&self, username: &str, taken: bool, label: &str, t: &Translator) -> RuleResult {
        match self {
            UsernamePolicy::Ignored => Ok(()),
            UsernamePolicy::Required(regex) => required(username, label, t)
                .and_then(|_| length(username, USERNAME_MIN_LENGTH, USERNAME_MAX_LENGTH, label, t))
                .and_then(|_| pattern(username, regex, label, t))
                .and_then(|_| unique(username, taken, "This username has already been taken", t)),
        }
    }
}
