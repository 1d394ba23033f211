use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Message category used by every string this crate shows to end users
pub const USER_CATEGORY: &str = "user";

/// Translations for one language, grouped by category then source message
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct Catalogue {
    #[serde(flatten)]
    pub categories: HashMap<String, HashMap<String, String>>,
}

/// Message translator.
///
/// Looks the source message up in the catalogue and falls back to the source
/// text when no translation exists. `{name}` placeholders are replaced by the
/// matching parameter after lookup.
#[derive(Debug, Default, Clone)]
pub struct Translator {
    language: String,
    catalogue: Catalogue,
}

impl Translator {
    /// Translator that returns source messages unchanged
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            catalogue: Catalogue::default(),
        }
    }

    pub fn with_catalogue(language: &str, catalogue: Catalogue) -> Self {
        Self {
            language: language.to_string(),
            catalogue,
        }
    }

    /// Load a JSON catalogue of the form `{"user": {"Email": "E-Mail"}}`
    pub fn load(language: &str, path: &Path) -> Result<Self, String> {
        let data = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read messages {}: {}", path.display(), e))?;
        let catalogue: Catalogue = serde_json::from_str(&data)
            .map_err(|e| format!("Failed to parse messages {}: {}", path.display(), e))?;
        Ok(Self::with_catalogue(language, catalogue))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Translate `message` within `category`, substituting `params`
    pub fn t(&self, category: &str, message: &str, params: &[(&str, &str)]) -> String {
        let translated = self
            .catalogue
            .categories
            .get(category)
            .and_then(|messages| messages.get(message))
            .map(String::as_str)
            .unwrap_or(message);

        params
            .iter()
            .fold(translated.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{}}}", name), value)
            })
    }

    /// Shorthand for the `user` category
    pub fn user(&self, message: &str) -> String {
        self.t(USER_CATEGORY, message, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fallback_to_source_message() {
        let translator = Translator::new("en");
        assert_eq!(translator.user("Email"), "Email");
        assert_eq!(
            translator.t(USER_CATEGORY, "Welcome to {0}", &[("0", "Acme")]),
            "Welcome to Acme"
        );
    }

    #[test]
    fn test_catalogue_lookup() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"user": {{"Password": "Passwort", "{{attribute}} cannot be blank.": "{{attribute}} darf nicht leer sein."}}}}"#
        )
        .unwrap();

        let translator = Translator::load("de", file.path()).unwrap();
        assert_eq!(translator.language(), "de");
        assert_eq!(translator.user("Password"), "Passwort");
        assert_eq!(
            translator.t(
                USER_CATEGORY,
                "{attribute} cannot be blank.",
                &[("attribute", "Passwort")]
            ),
            "Passwort darf nicht leer sein."
        );
        // Other categories are not consulted
        assert_eq!(translator.t("app", "Password", &[]), "Password");
    }

    #[test]
    fn test_load_rejects_broken_catalogue() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Translator::load("de", file.path()).is_err());
    }
}
