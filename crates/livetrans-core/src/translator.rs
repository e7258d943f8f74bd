use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::TranslateError;

/// The translation engine the relay delegates to.
///
/// Implementations are constructed once at startup and shared read-only by
/// every session, so they must be safe to call concurrently. Any input-size
/// limits (truncation, padding) are handled inside the implementation.
#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        (**self).translate(text).await
    }
}
