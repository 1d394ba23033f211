//! Collaborator interfaces the forms drive.
//!
//! The forms never touch storage directly: they look users up through a
//! [`Finder`], create accounts and change passwords through a
//! [`UserRepository`], and persist one-time tokens through a
//! [`TokenRepository`]. [`super::store::UserStore`] implements all three.

use super::store::User;
use super::tokens::{Token, TokenType};

/// Attributes copied from the registration form onto a new account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    /// `None` asks the repository to generate a password
    pub password: Option<String>,
}

pub trait Finder {
    fn find_user_by_email(&self, email: &str) -> Option<User>;

    fn find_user_by_id(&self, id: u64) -> Option<User>;

    fn find_token(&self, user_id: u64, code: &str, token_type: TokenType) -> Option<Token>;
}

pub trait UserRepository {
    fn email_taken(&self, email: &str) -> bool;

    fn username_taken(&self, username: &str) -> bool;

    /// Hash the password, persist the account and send the welcome message
    fn register(&mut self, account: NewAccount) -> Result<User, String>;

    fn reset_password(&mut self, user: &User, new_password: &str) -> Result<(), String>;
}

pub trait TokenRepository {
    /// Persist a token; `validate = false` skips the owner check
    fn save_token(&mut self, token: &Token, validate: bool) -> Result<(), String>;

    fn delete_token(&mut self, token: &Token) -> Result<(), String>;
}
