//! Result channel - multi-producer, single-consumer queue of outcome envelopes
//!
//! Built on a bounded `tokio::sync::mpsc` channel. Workers post from blocking
//! threads; the coordinator consumes from async code.

use crate::result::OutcomeEnvelope;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// How `put` behaves when the channel is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostMode {
    /// Wait for capacity
    Blocking,
    /// Fail immediately with [`ChannelError::Full`]
    NonBlocking,
}

/// Error returned when an envelope could not be posted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("result channel is full")]
    Full,

    #[error("result channel is closed")]
    Closed,
}

/// Create a result channel with the given capacity
pub fn result_channel(capacity: usize) -> (ResultSender, ResultReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ResultSender { tx }, ResultReceiver { rx })
}

/// Producer handle. Cheap to clone; one per worker.
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: mpsc::Sender<OutcomeEnvelope>,
}

impl ResultSender {
    /// Post an envelope.
    ///
    /// `PostMode::Blocking` parks the calling thread and must not be used from
    /// inside an async task.
    pub fn put(&self, envelope: OutcomeEnvelope, mode: PostMode) -> Result<(), ChannelError> {
        match mode {
            PostMode::Blocking => self
                .tx
                .blocking_send(envelope)
                .map_err(|_| ChannelError::Closed),
            PostMode::NonBlocking => self.tx.try_send(envelope).map_err(|e| match e {
                TrySendError::Full(_) => ChannelError::Full,
                TrySendError::Closed(_) => ChannelError::Closed,
            }),
        }
    }

    /// True once the receiver has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle, owned by the coordinator.
///
/// `recv` yields `None` once every sender has been dropped.
#[derive(Debug)]
pub struct ResultReceiver {
    rx: mpsc::Receiver<OutcomeEnvelope>,
}

impl ResultReceiver {
    pub async fn recv(&mut self) -> Option<OutcomeEnvelope> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<OutcomeEnvelope> {
        self.rx.try_recv().ok()
    }

    /// Take everything currently queued without waiting
    pub fn drain(&mut self) -> Vec<OutcomeEnvelope> {
        let mut out = Vec::new();
        while let Some(envelope) = self.try_recv() {
            out.push(envelope);
        }
        out
    }
}
