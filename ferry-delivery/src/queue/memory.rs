use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DeadLetterQueue, QueueMessage, ReceiveOptions};
use crate::error::QueueError;

#[derive(Debug, Default)]
struct State {
    visible: VecDeque<(String, String)>,
    in_flight: HashMap<String, (String, String)>,
    deleted: Vec<String>,
    fail_receives: bool,
}

/// In-memory queue
///
/// Received messages move to an in-flight set until deleted;
/// [`expire_in_flight`](Self::expire_in_flight) plays the part of a lapsed
/// visibility timeout.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<State>>,
    receipts: Arc<AtomicUsize>,
    receives: Arc<AtomicUsize>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, id: impl Into<String>, body: impl Into<String>) {
        self.state
            .lock()
            .visible
            .push_back((id.into(), body.into()));
    }

    /// Messages waiting to be received
    #[must_use]
    pub fn visible(&self) -> usize {
        self.state.lock().visible.len()
    }

    /// Received but neither deleted nor expired
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Ids of deleted messages, in deletion order
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    /// Number of `receive` calls made
    #[must_use]
    pub fn receive_count(&self) -> usize {
        self.receives.load(Ordering::Relaxed)
    }

    /// Return every in-flight message to the queue.
    pub fn expire_in_flight(&self) {
        let mut state = self.state.lock();
        let expired: Vec<_> = state.in_flight.drain().map(|(_, message)| message).collect();
        state.visible.extend(expired);
    }

    pub fn fail_receives(&self, fail: bool) {
        self.state.lock().fail_receives = fail;
    }
}

#[async_trait]
impl DeadLetterQueue for MemoryQueue {
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, QueueError> {
        self.receives.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();

        if state.fail_receives {
            return Err(QueueError::Receive("injected failure".to_string()));
        }

        let take = state.visible.len().min(options.max_messages as usize);
        let mut batch = Vec::with_capacity(take);

        let drained: Vec<_> = state.visible.drain(..take).collect();
        for (id, body) in drained {
            let receipt_handle = format!(
                "{id}#{}",
                self.receipts.fetch_add(1, Ordering::Relaxed)
            );
            state
                .in_flight
                .insert(receipt_handle.clone(), (id.clone(), body.clone()));
            batch.push(QueueMessage {
                id,
                receipt_handle,
                body,
            });
        }

        Ok(batch)
    }

    async fn delete(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        match state.in_flight.remove(&message.receipt_handle) {
            Some((id, _)) => {
                state.deleted.push(id);
                Ok(())
            }
            None => Err(QueueError::Delete {
                id: message.id.clone(),
                reason: "receipt handle is not in flight".to_string(),
            }),
        }
    }
}
