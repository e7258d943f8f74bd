use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use livetrans_core::{TranslateError, Translator};

/// Pre-programmed replies for deterministic testing without a real engine.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Succeed with this translation.
    Text(String),
    /// Fail with this error.
    Error(TranslateError),
    /// Wait a duration, then resolve the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Translator that returns pre-programmed replies in order.
///
/// Calls past the end of the script fail with [`TranslateError::Engine`].
pub struct MockTranslator {
    replies: Mutex<VecDeque<MockReply>>,
    inputs: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockTranslator {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            inputs: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every text passed to `translate`, in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.inputs.lock().push(text.to_owned());

        let reply = self.replies.lock().pop_front();
        let Some(reply) = reply else {
            return Err(TranslateError::Engine(format!(
                "MockTranslator: no reply configured for call {idx}"
            )));
        };

        resolve_reply(reply).await
    }
}

/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_reply(reply: MockReply) -> Result<String, TranslateError> {
    let mut current = reply;
    loop {
        match current {
            MockReply::Text(text) => return Ok(text),
            MockReply::Error(e) => return Err(e),
            MockReply::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}
