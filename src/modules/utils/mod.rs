pub mod flash;
pub mod i18n;
pub mod logging;
pub mod time;

pub use flash::{ConsoleNotifier, FlashBag, FlashCategory, FlashMessage, Notifier};
pub use i18n::{Translator, USER_CATEGORY};
