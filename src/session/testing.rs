//! Test doubles for the protocol layer.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

use super::{SessionContext, SessionHandler};

#[derive(Debug, Default)]
struct HandlerLog {
    opened: usize,
    closed: usize,
    messages: Vec<String>,
    context: Option<SessionContext>,
}

/// Handler that records every callback.
///
/// Messages prefixed with `echo:` are sent back through the context, and
/// [`RecordingHandler::MALFORMED`] is rejected.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingHandler {
    log: Arc<Mutex<HandlerLog>>,
    greeting: Option<String>,
}

impl RecordingHandler {
    pub(crate) const MALFORMED: &'static str = "{not json";

    /// Handler that sends `greeting` from inside `on_open`.
    pub(crate) fn greeting(greeting: &str) -> Self {
        Self {
            greeting: Some(greeting.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn opened(&self) -> usize {
        self.log.lock().opened
    }

    pub(crate) fn closed(&self) -> usize {
        self.log.lock().closed
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.log.lock().messages.clone()
    }

    pub(crate) fn context(&self) -> Option<SessionContext> {
        self.log.lock().context.clone()
    }
}

impl SessionHandler for RecordingHandler {
    fn on_open(&self, context: SessionContext) {
        if let Some(greeting) = &self.greeting {
            context.send(greeting.clone());
        }

        let mut log = self.log.lock();
        log.opened += 1;
        log.context = Some(context);
    }

    fn on_message(&self, message: &str) -> Result<()> {
        let context = {
            let mut log = self.log.lock();
            log.messages.push(message.to_string());
            log.context.clone()
        };

        if message == Self::MALFORMED {
            return Err(Error::handler("malformed payload"));
        }

        if let (Some(reply), Some(context)) = (message.strip_prefix("echo:"), context) {
            context.send(reply);
        }

        Ok(())
    }

    fn on_close(&self) {
        self.log.lock().closed += 1;
    }
}

/// Installs a test-writer subscriber honoring `RUST_LOG`. Safe to call twice.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
