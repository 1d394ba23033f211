use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a one-time status message shown after an action
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Info,
    Success,
    Danger,
}

impl fmt::Display for FlashCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlashCategory::Info => "info",
            FlashCategory::Success => "success",
            FlashCategory::Danger => "danger",
        };
        f.write_str(name)
    }
}

/// Sink for user-facing status messages
pub trait Notifier {
    fn notify(&mut self, category: FlashCategory, message: String);
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlashMessage {
    pub category: FlashCategory,
    pub message: String,
}

/// Collects flash messages until the presentation layer takes them
#[derive(Debug, Default)]
pub struct FlashBag {
    messages: Vec<FlashMessage>,
}

impl FlashBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    /// Remove and return every pending message; each is shown once
    pub fn take_all(&mut self) -> Vec<FlashMessage> {
        std::mem::take(&mut self.messages)
    }
}

impl Notifier for FlashBag {
    fn notify(&mut self, category: FlashCategory, message: String) {
        log::debug!("Flash [{}]: {}", category, message);
        self.messages.push(FlashMessage { category, message });
    }
}

/// Prints messages straight to the terminal
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, category: FlashCategory, message: String) {
        match category {
            FlashCategory::Danger => eprintln!("[{}] {}", category, message),
            _ => println!("[{}] {}", category, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_bag_is_drained_once() {
        let mut bag = FlashBag::new();
        assert!(bag.is_empty());

        bag.notify(FlashCategory::Info, "first".to_string());
        bag.notify(FlashCategory::Danger, "second".to_string());
        assert_eq!(bag.messages().len(), 2);

        let taken = bag.take_all();
        assert_eq!(taken[0].category, FlashCategory::Info);
        assert_eq!(taken[1].message, "second");
        assert!(bag.is_empty());
        assert!(bag.take_all().is_empty());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(FlashCategory::Success.to_string(), "success");
        assert_eq!(
            serde_json::to_string(&FlashCategory::Danger).unwrap(),
            "\"danger\""
        );
    }
}
