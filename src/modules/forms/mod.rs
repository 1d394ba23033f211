pub mod recovery;
pub mod registration;
pub mod validation;

pub use recovery::{RecoveryForm, ResetOutcome, Scenario};
pub use registration::RegistrationForm;
pub use validation::{FormErrors, PasswordPolicy, UsernamePolicy};
