pub mod password;
pub mod repository;
pub mod store;
pub mod tokens;

// Re-export the main types and functions
pub use password::{hash_password, verify_password, PasswordError, StrengthValidator};
pub use repository::{Finder, NewAccount, TokenRepository, UserRepository};
pub use store::{User, UserStore};
pub use tokens::{Token, TokenType};
