use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::modules::utils::time::get_current_timestamp;
use crate::TOKEN_CODE_LENGTH;

/// Purpose a token was issued for
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Confirmation,
    Recovery,
    ConfirmNewEmail,
    ConfirmOldEmail,
}

/// Single-use credential binding a user to a purpose
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Token {
    pub user_id: u64,
    pub code: String,
    pub token_type: TokenType,
    pub created_at: u64,
}

impl Token {
    /// Issue a new token with a random code
    pub fn new(user_id: u64, token_type: TokenType) -> Self {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_CODE_LENGTH)
            .map(char::from)
            .collect();

        Self {
            user_id,
            code,
            token_type,
            created_at: get_current_timestamp(),
        }
    }

    /// Token age check against the lifetime in seconds
    pub fn is_expired(&self, lifetime: u64, now: u64) -> bool {
        self.created_at.saturating_add(lifetime) < now
    }

    /// Link the recipient follows to use the token; extends an existing query
    pub fn url(&self, base: &str) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}id={}&code={}", base, separator, self.user_id, self.code)
    }
}
