use pbkdf2::pbkdf2;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::io;

use crate::modules::config::StrengthRules;
use crate::HmacSha256;

const HASH_ITERATIONS: u32 = 100_000;
const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?/~`'\"\\";

/// Reasons a password fails the strength rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    TooShort(usize),
    TooLong(usize),
    NotEnoughLowercase(usize),
    NotEnoughUppercase(usize),
    NotEnoughDigits(usize),
    NotEnoughSpecialChars(usize),
    ContainsUsername,
    ContainsEmail,
}

impl PasswordError {
    /// Source message and its parameter, ready for translation
    pub fn message(&self) -> (&'static str, Option<usize>) {
        match self {
            PasswordError::TooShort(n) => ("{attribute} should contain at least {n} characters.", Some(*n)),
            PasswordError::TooLong(n) => ("{attribute} should contain at most {n} characters.", Some(*n)),
            PasswordError::NotEnoughLowercase(n) => ("{attribute} should contain at least {n} lower case characters.", Some(*n)),
            PasswordError::NotEnoughUppercase(n) => ("{attribute} should contain at least {n} upper case characters.", Some(*n)),
            PasswordError::NotEnoughDigits(n) => ("{attribute} should contain at least {n} numeric characters.", Some(*n)),
            PasswordError::NotEnoughSpecialChars(n) => ("{attribute} should contain at least {n} special characters.", Some(*n)),
            PasswordError::ContainsUsername => ("{attribute} cannot contain the username.", None),
            PasswordError::ContainsEmail => ("{attribute} cannot contain the email address.", None),
        }
    }
}

/// Strength rule built from module configuration.
///
/// Forms only care whether it passes; the error is used for the message.
#[derive(Debug, Clone)]
pub struct StrengthValidator {
    rules: StrengthRules,
}

impl StrengthValidator {
    pub fn new(rules: StrengthRules) -> Self {
        Self { rules }
    }

    /// Check `password`; `username` and `email` feed the has-user/has-email rules
    pub fn validate(
        &self,
        password: &str,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), PasswordError> {
        let rules = &self.rules;
        let length = password.chars().count();

        if length < rules.min {
            return Err(PasswordError::TooShort(rules.min));
        }
        if let Some(max) = rules.max {
            if length > max {
                return Err(PasswordError::TooLong(max));
            }
        }

        let count = |f: fn(&char) -> bool| password.chars().filter(f).count();
        if count(char::is_ascii_lowercase) < rules.lower {
            return Err(PasswordError::NotEnoughLowercase(rules.lower));
        }
        if count(char::is_ascii_uppercase) < rules.upper {
            return Err(PasswordError::NotEnoughUppercase(rules.upper));
        }
        if count(char::is_ascii_digit) < rules.digit {
            return Err(PasswordError::NotEnoughDigits(rules.digit));
        }
        if password.chars().filter(|c| SPECIAL_CHARS.contains(*c)).count() < rules.special {
            return Err(PasswordError::NotEnoughSpecialChars(rules.special));
        }

        let lowered = password.to_lowercase();
        if rules.has_user {
            if let Some(username) = username.filter(|u| !u.is_empty()) {
                if lowered.contains(&username.to_lowercase()) {
                    return Err(PasswordError::ContainsUsername);
                }
            }
        }
        if rules.has_email {
            if let Some(email) = email.filter(|e| !e.is_empty()) {
                if lowered.contains(&email.to_lowercase()) {
                    return Err(PasswordError::ContainsEmail);
                }
            }
        }
        Ok(())
    }
}

/// Generate a random 16 byte salt for PBKDF2
pub fn generate_random_salt() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| rng.gen()).collect()
}

/// Hash a password with PBKDF2-HMAC-SHA256; the result is `salt$hash` in hex
pub fn hash_password(password: &str) -> String {
    let salt = generate_random_salt();
    let key = derive_key(password, &salt);
    format!("{}${}", hex::encode(salt), hex::encode(key))
}

/// Compare a password against a hash produced by [`hash_password`]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    match (hex::decode(salt_hex), hex::decode(hash_hex)) {
        (Ok(salt), Ok(expected)) => derive_key(password, &salt) == expected,
        _ => false,
    }
}

fn derive_key(password: &str, salt: &[u8]) -> Vec<u8> {
    let mut key = vec![0u8; 32];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, HASH_ITERATIONS, &mut key);
    key
}

/// Random alphanumeric password for accounts registered without one
pub fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Helper function to read a password without echo
pub fn read_password() -> io::Result<String> {
    rpassword::read_password()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::config::{StrengthConfig, StrengthPreset};

    fn validator(preset: StrengthPreset) -> StrengthValidator {
        StrengthValidator::new(StrengthConfig::with_preset(preset).rules())
    }

    #[test]
    fn test_normal_preset() {
        let v = validator(StrengthPreset::Normal);

        assert!(v.validate("Password1", None, None).is_ok());
        assert_eq!(v.validate("Pass1", None, None), Err(PasswordError::TooShort(8)));
        assert_eq!(
            v.validate("PASSWORD1", None, None),
            Err(PasswordError::NotEnoughLowercase(1))
        );
        assert_eq!(
            v.validate("password1", None, None),
            Err(PasswordError::NotEnoughUppercase(1))
        );
        assert_eq!(
            v.validate("Passwords", None, None),
            Err(PasswordError::NotEnoughDigits(1))
        );
    }

    #[test]
    fn test_strong_preset_requires_special_chars() {
        let v = validator(StrengthPreset::Strong);
        assert_eq!(
            v.validate("PAssword1234", None, None),
            Err(PasswordError::NotEnoughSpecialChars(2))
        );
        assert!(v.validate("PAssword12!?", None, None).is_ok());
    }

    #[test]
    fn test_username_and_email_rules() {
        let v = validator(StrengthPreset::Normal);
        assert_eq!(
            v.validate("xxAlice2024", Some("alice"), None),
            Err(PasswordError::ContainsUsername)
        );
        assert_eq!(
            v.validate("A1a@b.cc", None, Some("a@b.cc")),
            Err(PasswordError::ContainsEmail)
        );
        assert!(v.validate("Password1", Some(""), Some("")).is_ok());

        let relaxed = StrengthValidator::new(
            StrengthConfig {
                preset: Some(StrengthPreset::Normal),
                has_user: Some(false),
                ..StrengthConfig::default()
            }
            .rules(),
        );
        assert!(relaxed.validate("xxAlice2024", Some("alice"), None).is_ok());
    }

    #[test]
    fn test_max_length() {
        let v = StrengthValidator::new(
            StrengthConfig {
                preset: Some(StrengthPreset::Simple),
                max: Some(10),
                ..StrengthConfig::default()
            }
            .rules(),
        );
        assert_eq!(
            v.validate("abcdefgh1234", None, None),
            Err(PasswordError::TooLong(10))
        );
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("MySecurePassword123!");
        assert!(verify_password("MySecurePassword123!", &hash));
        assert!(!verify_password("DifferentPassword456!", &hash));

        // Same password, different salt
        assert_ne!(hash, hash_password("MySecurePassword123!"));

        assert!(!verify_password("anything", "not-a-hash"));
        assert!(!verify_password("anything", "zz$zz"));
    }

    #[test]
    fn test_generated_password() {
        let first = generate_password(8);
        assert_eq!(first.len(), 8);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, generate_password(8));
    }
}
