use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::password::{generate_password, hash_password, verify_password};
use super::repository::{Finder, NewAccount, TokenRepository, UserRepository};
use super::tokens::{Token, TokenType};
use crate::modules::email::Mailer;
use crate::modules::utils::logging::log_data_operation;
use crate::modules::utils::time::get_current_timestamp;
use crate::GENERATED_PASSWORD_LENGTH;

/// A registered account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    /// Empty when the module does not ask for usernames
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl User {
    /// Name used to greet the user
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

/// Accounts and their outstanding tokens, kept in a JSON file.
///
/// Every mutation rewrites the whole file; a failed write leaves the
/// in-memory state as it was before the call.
#[derive(Serialize, Deserialize, Default)]
pub struct UserStore {
    pub users: BTreeMap<u64, User>,
    pub tokens: Vec<Token>,
    next_id: u64,
    #[serde(skip)]
    path: Option<PathBuf>,
    #[serde(skip)]
    mailer: Option<Box<dyn Mailer>>,
}

impl UserStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut store = if path.exists() {
            let data = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read user store: {}", e))?;
            serde_json::from_str::<UserStore>(&data)
                .map_err(|e| format!("Failed to parse user store: {}", e))?
        } else {
            Self::default()
        };
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Mailer used for the welcome message after registration
    pub fn with_mailer(mut self, mailer: Box<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn save(&self) -> Result<(), String> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize user store: {}", e))?;
        fs::write(path, data).map_err(|e| format!("Failed to write user store: {}", e))
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        let normalized = username.trim().to_lowercase();
        self.users
            .values()
            .find(|u| !u.username.is_empty() && u.username.to_lowercase() == normalized)
            .cloned()
    }

    /// Look a user up by email or username and check the password
    pub fn verify_credentials(&self, login: &str, password: &str) -> Option<User> {
        self.find_user_by_email(login)
            .or_else(|| self.find_user_by_username(login))
            .filter(|u| verify_password(password, &u.password_hash))
    }

    /// Tokens currently outstanding for a user
    pub fn tokens_for(&self, user_id: u64) -> Vec<&Token> {
        self.tokens.iter().filter(|t| t.user_id == user_id).collect()
    }
}

impl Finder for UserStore {
    fn find_user_by_email(&self, email: &str) -> Option<User> {
        let normalized = email.trim().to_lowercase();
        self.users
            .values()
            .find(|u| u.email.to_lowercase() == normalized)
            .cloned()
    }

    fn find_user_by_id(&self, id: u64) -> Option<User> {
        self.users.get(&id).cloned()
    }

    fn find_token(&self, user_id: u64, code: &str, token_type: TokenType) -> Option<Token> {
        self.tokens
            .iter()
            .find(|t| t.user_id == user_id && t.code == code && t.token_type == token_type)
            .cloned()
    }
}

impl UserRepository for UserStore {
    fn email_taken(&self, email: &str) -> bool {
        self.find_user_by_email(email).is_some()
    }

    fn username_taken(&self, username: &str) -> bool {
        self.find_user_by_username(username).is_some()
    }

    fn register(&mut self, account: NewAccount) -> Result<User, String> {
        if self.email_taken(&account.email) {
            return Err("Email already registered".to_string());
        }
        if !account.username.is_empty() && self.username_taken(&account.username) {
            return Err("Username already exists".to_string());
        }

        // An empty password only reaches here when generating is enabled
        let (password, generated) = match account.password {
            Some(password) if !password.is_empty() => (password, None),
            _ => {
                let password = generate_password(GENERATED_PASSWORD_LENGTH);
                (password.clone(), Some(password))
            }
        };

        let now = get_current_timestamp();
        self.next_id += 1;
        let user = User {
            id: self.next_id,
            username: account.username,
            email: account.email,
            password_hash: hash_password(&password),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());

        if let Err(e) = self.save() {
            self.users.remove(&user.id);
            self.next_id -= 1;
            log_data_operation("create_user", &user.email, "user_store", false, Some(&e));
            return Err(e);
        }
        log_data_operation(
            "create_user",
            &user.email,
            "user_store",
            true,
            Some("user created and store saved"),
        );

        if let Some(mailer) = &self.mailer {
            if !mailer.send_welcome_message(&user, generated.as_deref()) {
                log::warn!("Welcome message for user {} was not sent", user.id);
            }
        }

        Ok(user)
    }

    fn reset_password(&mut self, user: &User, new_password: &str) -> Result<(), String> {
        let previous = self
            .users
            .get(&user.id)
            .cloned()
            .ok_or_else(|| "Failed to update password: user not found".to_string())?;

        let mut updated = previous.clone();
        updated.password_hash = hash_password(new_password);
        updated.updated_at = get_current_timestamp();
        self.users.insert(user.id, updated);

        if let Err(e) = self.save() {
            self.users.insert(user.id, previous);
            log_data_operation("password_reset", &user.email, "user_store", false, Some(&e));
            return Err(e);
        }
        log_data_operation(
            "password_reset",
            &user.email,
            "user_store",
            true,
            Some("password hash replaced"),
        );
        Ok(())
    }
}

impl TokenRepository for UserStore {
    fn save_token(&mut self, token: &Token, validate: bool) -> Result<(), String> {
        if validate && !self.users.contains_key(&token.user_id) {
            return Err(format!("Token owner {} does not exist", token.user_id));
        }

        let previous = self.tokens.clone();
        // A new token supersedes older ones of the same purpose
        self.tokens
            .retain(|t| !(t.user_id == token.user_id && t.token_type == token.token_type));
        self.tokens.push(token.clone());

        if let Err(e) = self.save() {
            self.tokens = previous;
            return Err(e);
        }
        log_data_operation(
            "create_token",
            &token.user_id.to_string(),
            "user_store",
            true,
            Some(&format!("{:?} token issued", token.token_type)),
        );
        Ok(())
    }

    fn delete_token(&mut self, token: &Token) -> Result<(), String> {
        let previous = self.tokens.clone();
        self.tokens.retain(|t| {
            !(t.user_id == token.user_id && t.code == token.code && t.token_type == token.token_type)
        });
        if self.tokens.len() == previous.len() {
            return Err("Token not found".to_string());
        }

        if let Err(e) = self.save() {
            self.tokens = previous;
            return Err(e);
        }
        log_data_operation(
            "delete_token",
            &token.user_id.to_string(),
            "user_store",
            true,
            None,
        );
        Ok(())
    }
}
