//! Speech engine port - Interface to the conversational speech model
//!
//! A connection is opened per call. Everything the engine reports, including
//! the moment the connection becomes usable and the moment it goes away, is
//! delivered through the event channel handed to
//! [`SpeechEngineConnector::open`].

use std::sync::Arc;

use async_trait::async_trait;
use domain::{CallId, SpeechEngineCommand, SpeechEngineEvent};
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::error::ApplicationError;

/// Handle to one live speech engine connection
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechEnginePort: Send + Sync {
    /// Queue a command for the engine
    ///
    /// Commands issued before the engine reported
    /// [`SpeechEngineEvent::Connected`] are discarded by the adapter.
    async fn send(&self, command: SpeechEngineCommand) -> Result<(), ApplicationError>;

    /// Close the connection; closing twice is not an error
    async fn close(&self) -> Result<(), ApplicationError>;
}

/// Factory opening one speech engine connection per call
#[cfg_attr(test, automock)]
pub trait SpeechEngineConnector: Send + Sync {
    /// Start connecting in the background and return the handle at once
    ///
    /// # Arguments
    /// * `call_id` - Call the connection belongs to, used for log correlation
    /// * `events` - Channel receiving every event of this connection; the
    ///   last event sent is always [`SpeechEngineEvent::Closed`]
    fn open(
        &self,
        call_id: CallId,
        events: mpsc::Sender<SpeechEngineEvent>,
    ) -> Arc<dyn SpeechEnginePort>;
}
