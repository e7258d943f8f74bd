use async_trait::async_trait;

use livetrans_core::{TranslateError, Translator};

/// Loopback translator: returns the input, optionally tagged.
#[derive(Clone, Debug, Default)]
pub struct EchoTranslator {
    prefix: Option<String>,
}

impl EchoTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` and a space to every result, e.g. `[es] hello`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

#[async_trait]
impl Translator for EchoTranslator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        Ok(match &self.prefix {
            Some(prefix) => format!("{prefix} {text}"),
            None => text.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_input() {
        let t = EchoTranslator::new();
        assert_eq!(t.translate("Hello there.").await.unwrap(), "Hello there.");
        assert_eq!(t.name(), "echo");
    }

    #[tokio::test]
    async fn prefixes_when_configured() {
        let t = EchoTranslator::with_prefix("[es]");
        assert_eq!(t.translate("Hello.").await.unwrap(), "[es] Hello.");
    }
}
