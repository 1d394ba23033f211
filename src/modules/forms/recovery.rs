use serde_json::Value;

use super::validation::{self, FormErrors, PasswordPolicy};
use crate::modules::auth::{Finder, Token, TokenRepository, TokenType, UserRepository};
use crate::modules::config::ModuleConfig;
use crate::modules::email::Mailer;
use crate::modules::utils::logging::log_auth_event;
use crate::modules::utils::{FlashCategory, Notifier, Translator};

/// Which half of the recovery flow a form serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Ask for a recovery link by email
    Request,
    /// Choose a new password using a recovery token
    Reset,
}

/// Result of [`RecoveryForm::reset_password`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Password changed and token consumed
    Changed,
    /// Input was valid but the password could not be stored; the token is kept
    Failed,
    /// Invalid input or a token without an owner; nothing happened
    Rejected,
}

impl ResetOutcome {
    /// Whether the request was handled and a flash message was set.
    ///
    /// This is also true for `Failed`, where the user only learns about the
    /// failure from the danger flash. Use the variant to tell them apart.
    pub fn is_handled(&self) -> bool {
        !matches!(self, ResetOutcome::Rejected)
    }
}

/// Collects data for password recovery: an email in the request scenario,
/// a new password in the reset scenario.
pub struct RecoveryForm<'a> {
    pub email: String,
    pub password: String,
    pub password_repeat: String,
    scenario: Scenario,
    config: &'a ModuleConfig,
    translator: &'a Translator,
    mailer: &'a dyn Mailer,
    errors: FormErrors,
}

impl<'a> RecoveryForm<'a> {
    pub const FORM_NAME: &'static str = "recovery-form";

    pub fn new(
        scenario: Scenario,
        config: &'a ModuleConfig,
        translator: &'a Translator,
        mailer: &'a dyn Mailer,
    ) -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            password_repeat: String::new(),
            scenario,
            config,
            translator,
            mailer,
            errors: FormErrors::default(),
        }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Attributes active in the current scenario
    pub fn safe_attributes(&self) -> &'static [&'static str] {
        match self.scenario {
            Scenario::Request => &["email"],
            Scenario::Reset => &["password", "password_repeat"],
        }
    }

    pub fn attribute_label(&self, attribute: &str) -> String {
        let label = match attribute {
            "email" => "Email",
            "password" => "Password",
            "password_repeat" => "Password repeat",
            other => other,
        };
        self.translator.user(label)
    }

    /// Fill the active attributes from `{"recovery-form": {...}}`
    pub fn load(&mut self, data: &Value) -> bool {
        let Some(fields) = data.get(Self::FORM_NAME).and_then(Value::as_object) else {
            return false;
        };
        for attribute in self.safe_attributes() {
            if let Some(value) = fields.get(*attribute).and_then(Value::as_str) {
                let value = value.to_string();
                match *attribute {
                    "email" => self.email = value,
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

    /// Validate the attributes of the current scenario only
    pub fn validate(&mut self) -> bool {
        self.errors.clear();
        let t = self.translator;

        match self.scenario {
            Scenario::Request => {
                self.email = self.email.trim().to_string();
                let label = self.attribute_label("email");
                let email = validation::required(&self.email, &label, t)
                    .and_then(|_| validation::email(&self.email, &label, t));
                self.errors.record("email", email);
            }
            Scenario::Reset => {
                let generating = self.config.enable_generating_password;

                let label = self.attribute_label("password");
                let password = validation::required(&self.password, &label, t).and_then(|_| {
                    PasswordPolicy::from_config(self.config).check(
                        &self.password,
                        None,
                        None,
                        &label,
                        t,
                    )
                });
                self.errors.record("password", password);

                let label = self.attribute_label("password_repeat");
                let repeat = validation::required(&self.password_repeat, &label, t).and_then(|_| {
                    validation::compare(&self.password, &self.password_repeat, generating, t)
                });
                self.errors.record("password_repeat", repeat);
            }
        }

        self.errors.is_empty()
    }

    /// Issue a recovery token and mail it.
    ///
    /// An unknown address is answered exactly like a known one so the form
    /// does not reveal which addresses have accounts.
    pub fn send_recovery_message<S>(&mut self, accounts: &mut S, notifier: &mut dyn Notifier) -> bool
    where
        S: Finder + TokenRepository + ?Sized,
    {
        if self.scenario != Scenario::Request {
            log::error!("send_recovery_message called in {:?} scenario", self.scenario);
            return false;
        }
        if !self.validate() {
            return false;
        }

        match accounts.find_user_by_email(&self.email) {
            Some(user) => {
                let token = Token::new(user.id, TokenType::Recovery);

                if let Err(e) = accounts.save_token(&token, false) {
                    log_auth_event("recovery_request", &self.email, false, Some(&e));
                    return false;
                }

                if !self.mailer.send_recovery_message(&user, &token) {
                    log_auth_event(
                        "recovery_request",
                        &self.email,
                        false,
                        Some("recovery message not delivered"),
                    );
                    return false;
                }
                log_auth_event("recovery_request", &self.email, true, None);
            }
            None => {
                log_auth_event(
                    "recovery_request",
                    &self.email,
                    true,
                    Some("no account for address"),
                );
            }
        }

        notifier.notify(
            FlashCategory::Info,
            self.translator
                .user("An email has been sent with instructions for resetting your password"),
        );
        true
    }

    /// Set a new password for the owner of `token`
    pub fn reset_password<S>(
        &mut self,
        token: &Token,
        accounts: &mut S,
        notifier: &mut dyn Notifier,
    ) -> ResetOutcome
    where
        S: Finder + UserRepository + TokenRepository + ?Sized,
    {
        if self.scenario != Scenario::Reset {
            log::error!("reset_password called in {:?} scenario", self.scenario);
            return ResetOutcome::Rejected;
        }
        if !self.validate() {
            return ResetOutcome::Rejected;
        }
        let Some(user) = accounts.find_user_by_id(token.user_id) else {
            log_auth_event(
                "password_reset",
                &token.user_id.to_string(),
                false,
                Some("token has no owner"),
            );
            return ResetOutcome::Rejected;
        };

        match accounts.reset_password(&user, &self.password) {
            Ok(()) => {
                notifier.notify(
                    FlashCategory::Success,
                    self.translator
                        .user("Your password has been changed successfully."),
                );
                if let Err(e) = accounts.delete_token(token) {
                    log::warn!("Recovery token of user {} not deleted: {}", user.id, e);
                }
                log_auth_event("password_reset", &user.email, true, None);
                ResetOutcome::Changed
            }
            Err(e) => {
                notifier.notify(
                    FlashCategory::Danger,
                    self.translator.user(
                        "An error occurred and your password has not been changed. Please try again later.",
                    ),
                );
                log_auth_event("password_reset", &user.email, false, Some(&e));
                ResetOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::auth::{NewAccount, User, UserStore};
    use crate::modules::utils::FlashBag;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    struct MockMailer {
        sent: RefCell<Vec<(String, String)>>,
        succeed: bool,
    }

    impl MockMailer {
        fn new(succeed: bool) -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                succeed,
            }
        }
    }

    impl Mailer for MockMailer {
        fn send_recovery_message(&self, user: &User, token: &Token) -> bool {
            self.sent
                .borrow_mut()
                .push((user.email.clone(), token.code.clone()));
            self.succeed
        }

        fn send_welcome_message(&self, _user: &User, _generated_password: Option<&str>) -> bool {
            true
        }
    }

    /// Store wrapper whose writes can be made to fail
    struct FlakyStore {
        inner: UserStore,
        fail_tokens: bool,
        fail_reset: bool,
        token_saves: Cell<usize>,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: UserStore::in_memory(),
                fail_tokens: false,
                fail_reset: false,
                token_saves: Cell::new(0),
            }
        }
    }

    impl Finder for FlakyStore {
        fn find_user_by_email(&self, email: &str) -> Option<User> {
            self.inner.find_user_by_email(email)
        }

        fn find_user_by_id(&self, id: u64) -> Option<User> {
            self.inner.find_user_by_id(id)
        }

        fn find_token(&self, user_id: u64, code: &str, token_type: TokenType) -> Option<Token> {
            self.inner.find_token(user_id, code, token_type)
        }
    }

    impl UserRepository for FlakyStore {
        fn email_taken(&self, email: &str) -> bool {
            self.inner.email_taken(email)
        }

        fn username_taken(&self, username: &str) -> bool {
            self.inner.username_taken(username)
        }

        fn register(&mut self, account: NewAccount) -> Result<User, String> {
            self.inner.register(account)
        }

        fn reset_password(&mut self, user: &User, new_password: &str) -> Result<(), String> {
            if self.fail_reset {
                return Err("disk full".to_string());
            }
            self.inner.reset_password(user, new_password)
        }
    }

    impl TokenRepository for FlakyStore {
        fn save_token(&mut self, token: &Token, validate: bool) -> Result<(), String> {
            self.token_saves.set(self.token_saves.get() + 1);
            if self.fail_tokens {
                return Err("disk full".to_string());
            }
            self.inner.save_token(token, validate)
        }

        fn delete_token(&mut self, token: &Token) -> Result<(), String> {
            self.inner.delete_token(token)
        }
    }

    fn store_with_user() -> (FlakyStore, User) {
        let mut store = FlakyStore::new();
        let user = store
            .register(NewAccount {
                email: "carol@example.com".to_string(),
                username: "carol".to_string(),
                password: Some("old-password".to_string()),
            })
            .unwrap();
        (store, user)
    }

    fn issue_token(store: &mut FlakyStore, user: &User) -> Token {
        let token = Token::new(user.id, TokenType::Recovery);
        store.inner.save_token(&token, true).unwrap();
        token
    }

    #[test]
    fn test_request_for_unknown_email_still_succeeds() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let (mut store, _) = store_with_user();
        let mut flashes = FlashBag::new();

        let mut form = RecoveryForm::new(Scenario::Request, &config, &translator, &mailer);
        form.email = "nobody@example.com".to_string();

        assert!(form.send_recovery_message(&mut store, &mut flashes));
        assert!(store.inner.tokens.is_empty());
        assert_eq!(store.token_saves.get(), 0);
        assert!(mailer.sent.borrow().is_empty());

        let messages = flashes.take_all();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].category, FlashCategory::Info);
        assert_eq!(
            messages[0].message,
            "An email has been sent with instructions for resetting your password"
        );
    }

    #[test]
    fn test_request_for_known_email_issues_one_token() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let (mut store, user) = store_with_user();
        let mut flashes = FlashBag::new();

        let mut form = RecoveryForm::new(Scenario::Request, &config, &translator, &mailer);
        form.email = " Carol@Example.com ".to_string();

        assert!(form.send_recovery_message(&mut store, &mut flashes));
        assert_eq!(form.email, "Carol@Example.com");

        let tokens = store.inner.tokens_for(user.id);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::Recovery);

        let sent = mailer.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], ("carol@example.com".to_string(), tokens[0].code.clone()));
        assert_eq!(flashes.messages().len(), 1);
    }

    #[test]
    fn test_request_fails_when_token_not_saved() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let (mut store, _) = store_with_user();
        store.fail_tokens = true;
        let mut flashes = FlashBag::new();

        let mut form = RecoveryForm::new(Scenario::Request, &config, &translator, &mailer);
        form.email = "carol@example.com".to_string();

        assert!(!form.send_recovery_message(&mut store, &mut flashes));
        assert_eq!(store.token_saves.get(), 1);
        assert!(mailer.sent.borrow().is_empty());
        assert!(flashes.is_empty());
    }

    #[test]
    fn test_request_fails_when_mail_not_sent() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(false);
        let (mut store, _) = store_with_user();
        let mut flashes = FlashBag::new();

        let mut form = RecoveryForm::new(Scenario::Request, &config, &translator, &mailer);
        form.email = "carol@example.com".to_string();

        assert!(!form.send_recovery_message(&mut store, &mut flashes));
        assert_eq!(mailer.sent.borrow().len(), 1);
        assert!(flashes.is_empty());
    }

    #[test]
    fn test_request_with_invalid_email() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let (mut store, _) = store_with_user();
        let mut flashes = FlashBag::new();

        let mut form = RecoveryForm::new(Scenario::Request, &config, &translator, &mailer);
        form.email = "carol".to_string();
        // Reset attributes are not validated in this scenario
        form.password = "x".to_string();

        assert!(!form.send_recovery_message(&mut store, &mut flashes));
        assert!(form.errors().has("email"));
        assert!(!form.errors().has("password"));
        assert_eq!(store.token_saves.get(), 0);
        assert!(flashes.is_empty());
    }

    #[test]
    fn test_reset_changes_password_and_consumes_token() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let (mut store, user) = store_with_user();
        let token = issue_token(&mut store, &user);
        let mut flashes = FlashBag::new();

        let mut form = RecoveryForm::new(Scenario::Reset, &config, &translator, &mailer);
        form.password = "new-password".to_string();
        form.password_repeat = "new-password".to_string();

        let outcome = form.reset_password(&token, &mut store, &mut flashes);
        assert_eq!(outcome, ResetOutcome::Changed);
        assert!(outcome.is_handled());
        assert!(store
            .inner
            .verify_credentials("carol", "new-password")
            .is_some());
        assert!(store
            .find_token(user.id, &token.code, TokenType::Recovery)
            .is_none());

        let messages = flashes.take_all();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].category, FlashCategory::Success);
    }

    #[test]
    fn test_reset_failure_keeps_token_and_flags_danger() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let (mut store, user) = store_with_user();
        store.fail_reset = true;
        let token = issue_token(&mut store, &user);
        let mut flashes = FlashBag::new();

        let mut form = RecoveryForm::new(Scenario::Reset, &config, &translator, &mailer);
        form.password = "new-password".to_string();
        form.password_repeat = "new-password".to_string();

        let outcome = form.reset_password(&token, &mut store, &mut flashes);
        assert_eq!(outcome, ResetOutcome::Failed);
        // Handled at the legacy boolean level, only the flash tells the difference
        assert!(outcome.is_handled());
        assert!(store
            .find_token(user.id, &token.code, TokenType::Recovery)
            .is_some());

        let messages = flashes.take_all();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].category, FlashCategory::Danger);
    }

    #[test]
    fn test_reset_with_orphaned_token_is_rejected() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let mut store = FlakyStore::new();
        let token = Token::new(77, TokenType::Recovery);
        store.inner.save_token(&token, false).unwrap();
        let mut flashes = FlashBag::new();

        let mut form = RecoveryForm::new(Scenario::Reset, &config, &translator, &mailer);
        form.password = "new-password".to_string();
        form.password_repeat = "new-password".to_string();

        let outcome = form.reset_password(&token, &mut store, &mut flashes);
        assert_eq!(outcome, ResetOutcome::Rejected);
        assert!(!outcome.is_handled());
        assert!(flashes.is_empty());
        assert!(store.find_token(77, &token.code, TokenType::Recovery).is_some());
    }

    #[test]
    fn test_reset_with_bad_passwords_is_rejected() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let (mut store, user) = store_with_user();
        let token = issue_token(&mut store, &user);
        let mut flashes = FlashBag::new();

        for (password, repeat, field) in [
            ("new-password", "other-password", "password_repeat"),
            ("short", "short", "password"),
            ("", "", "password"),
            (&*"p".repeat(73), &*"p".repeat(73), "password"),
        ] {
            let mut form = RecoveryForm::new(Scenario::Reset, &config, &translator, &mailer);
            form.password = password.to_string();
            form.password_repeat = repeat.to_string();

            let outcome = form.reset_password(&token, &mut store, &mut flashes);
            assert_eq!(outcome, ResetOutcome::Rejected);
            assert!(form.errors().has(field), "expected error on {}", field);
        }

        assert!(flashes.is_empty());
        assert!(store
            .inner
            .verify_credentials("carol", "old-password")
            .is_some());
        assert!(store
            .find_token(user.id, &token.code, TokenType::Recovery)
            .is_some());
    }

    #[test]
    fn test_actions_require_their_scenario() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let (mut store, user) = store_with_user();
        let token = issue_token(&mut store, &user);
        let mut flashes = FlashBag::new();

        let mut reset = RecoveryForm::new(Scenario::Reset, &config, &translator, &mailer);
        reset.email = "carol@example.com".to_string();
        assert!(!reset.send_recovery_message(&mut store, &mut flashes));

        let mut request = RecoveryForm::new(Scenario::Request, &config, &translator, &mailer);
        request.password = "new-password".to_string();
        request.password_repeat = "new-password".to_string();
        assert_eq!(
            request.reset_password(&token, &mut store, &mut flashes),
            ResetOutcome::Rejected
        );
        assert!(flashes.is_empty());
    }

    #[test]
    fn test_load_only_assigns_scenario_attributes() {
        let config = ModuleConfig::new();
        let translator = Translator::new("en");
        let mailer = MockMailer::new(true);
        let data = json!({
            "recovery-form": {
                "email": "dave@example.com",
                "password": "secret1",
                "password_repeat": "secret1"
            }
        });

        let mut request = RecoveryForm::new(Scenario::Request, &config, &translator, &mailer);
        assert!(request.load(&data));
        assert_eq!(request.email, "dave@example.com");
        assert_eq!(request.password, "");

        let mut reset = RecoveryForm::new(Scenario::Reset, &config, &translator, &mailer);
        assert!(reset.load(&data));
        assert_eq!(reset.email, "");
        assert_eq!(reset.password, "secret1");
        assert_eq!(reset.scenario(), Scenario::Reset);

        assert!(!reset.load(&json!({})));
    }
}
