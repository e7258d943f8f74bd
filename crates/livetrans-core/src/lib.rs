pub mod errors;
pub mod ids;
pub mod messages;
pub mod translator;

pub use errors::{RegistryError, TranslateError};
pub use ids::SessionId;
pub use messages::{TranslationRequest, TranslationResponse};
pub use translator::Translator;
