//! Broadcast hub: fan-out of push messages to live subscribers.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::CoachError;
use crate::review::ReviewReport;
use crate::tips::CoachingTip;

pub type SubscriberId = u64;

/// Messages delivered over the push channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    CoachTip(CoachingTip),
    StateUpdate {
        fen: String,
        turn: String,
        ply: u32,
        is_game_over: bool,
    },
    GameReview(ReviewReport),
    EngineStatus {
        available: bool,
    },
}

/// Receiving end handed to one connection.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    receiver: mpsc::Receiver<PushMessage>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<PushMessage> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<PushMessage> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: Vec<SubscriberId>,
}

#[derive(Debug, Default)]
struct HubInner {
    next_id: SubscriberId,
    subscribers: BTreeMap<SubscriberId, mpsc::Sender<PushMessage>>,
}

#[derive(Debug)]
pub struct BroadcastHub {
    inner: Mutex<HubInner>,
    buffer: usize,
}

impl BroadcastHub {
    /// `buffer` is the per-subscriber backlog; a subscriber that falls further
    /// behind is dropped.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Mutex::new(HubInner::default()),
            buffer: buffer.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> Subscription {
        self.subscribe_with(Vec::new())
    }

    /// Subscribe and queue `greeting` ahead of any later publish.
    pub fn subscribe_with(&self, greeting: Vec<PushMessage>) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.buffer.max(greeting.len()));
        for msg in greeting {
            // Capacity covers the greeting, so this cannot fail
            let _ = tx.try_send(msg);
        }

        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.insert(id, tx);
        debug!(subscriber = id, total = inner.subscribers.len(), "subscribed");

        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut inner = self.lock();
        let removed = inner.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = id, total = inner.subscribers.len(), "unsubscribed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Deliver to every subscriber without waiting. Subscribers that cannot
    /// take the message right now are removed.
    pub fn publish(&self, msg: PushMessage) -> PublishReport {
        let mut inner = self.lock();
        let mut report = PublishReport::default();

        for (id, tx) in &inner.subscribers {
            match deliver(*id, tx, msg.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(error = %e, "dropping subscriber");
                    report.dropped.push(*id);
                }
            }
        }
        for id in &report.dropped {
            inner.subscribers.remove(id);
        }

        report
    }
}

fn deliver(
    id: SubscriberId,
    tx: &mpsc::Sender<PushMessage>,
    msg: PushMessage,
) -> Result<(), CoachError> {
    tx.try_send(msg).map_err(|e| CoachError::SubscriberDelivery {
        subscriber: id,
        reason: match e {
            TrySendError::Full(_) => "outbound buffer full",
            TrySendError::Closed(_) => "connection closed",
        },
    })
}
