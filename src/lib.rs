// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{auth, config, email, forms, utils};

// Re-export commonly used types
pub use modules::auth::{Finder, Token, TokenRepository, TokenType, User, UserRepository, UserStore};
pub use modules::config::ModuleConfig;
pub use modules::email::Mailer;
pub use modules::forms::{RecoveryForm, RegistrationForm, ResetOutcome, Scenario};
pub use modules::utils::{FlashCategory, Notifier, Translator};

// Constants
pub const USERS_FILE: &str = "users.json";
pub const CONFIG_FILE: &str = "user-module.json";
pub const RECOVER_WITHIN: u64 = 21600;
pub const TOKEN_CODE_LENGTH: usize = 32;
pub const GENERATED_PASSWORD_LENGTH: usize = 8;
pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const PASSWORD_MAX_LENGTH: usize = 72;
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 255;

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;
