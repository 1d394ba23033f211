use keyring::Entry;

/// Keyring service the SMTP password is filed under
pub const KEYRING_SERVICE: &str = "account-forms-smtp";

/// Place where the SMTP password is kept, keyed by the SMTP username
pub trait SecretStore {
    fn store_password(&self, account: &str, password: &str) -> Result<(), String>;

    fn get_password(&self, account: &str) -> Result<String, String>;

    fn delete_password(&self, account: &str) -> Result<(), String>;
}

/// Keeps SMTP passwords in the system keyring
pub struct KeyringSecrets {
    service: String,
}

impl KeyringSecrets {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry, String> {
        Entry::new(&self.service, account)
            .map_err(|e| format!("Failed to open keyring entry: {}", e))
    }
}

impl Default for KeyringSecrets {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringSecrets {
    // Store the SMTP password in the system keyring
    fn store_password(&self, account: &str, password: &str) -> Result<(), String> {
        self.entry(account)?
            .set_password(password)
            .map_err(|e| format!("Failed to store credentials: {}", e))
    }

    fn get_password(&self, account: &str) -> Result<String, String> {
        self.entry(account)?
            .get_password()
            .map_err(|e| format!("Failed to retrieve credentials: {}", e))
    }

    fn delete_password(&self, account: &str) -> Result<(), String> {
        self.entry(account)?
            .delete_password()
            .map_err(|e| format!("Failed to delete credentials: {}", e))
    }
}
