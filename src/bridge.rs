//! Request/response plumbing between the caller and the context that extracts a page.
//!
//! The caller subscribes for a tab before extraction starts, so a reply can never
//! arrive before anyone listens. Subscriptions remove themselves when dropped,
//! whether a reply came, the wait timed out, or the extraction failed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;

use crate::page_scrapers::JobRecord;


pub type TabId = u64;


/// Messages a page context may send. Serialized as `{"type": "JOB_DATA", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    JobData(JobRecord),
}


struct Listener {
    tab: TabId,
    reply: oneshot::Sender<JobRecord>,
}


#[derive(Default)]
pub struct MessageBus {
    listeners: Mutex<FxHashMap<u64, Listener>>,
    next_id: AtomicU64,
}


impl MessageBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn listeners(&self) -> MutexGuard<'_, FxHashMap<u64, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Listens for the first `JOB_DATA` message sent from `tab`.
    pub fn subscribe(self: &Arc<Self>, tab: TabId) -> Subscription {
        let (reply, receiver) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners().insert(id, Listener { tab, reply });
        Subscription { id, bus: Arc::clone(self), receiver }
    }

    /// Delivers `message` to one listener of `tab`. Returns whether anyone was listening.
    pub fn post(&self, tab: TabId, message: PageMessage) -> bool {
        let PageMessage::JobData(record) = message;
        let listener = {
            let mut listeners = self.listeners();
            let id = listeners.iter().find(|(_, l)| l.tab == tab).map(|(id, _)| *id);
            id.and_then(|id| listeners.remove(&id))
        };
        match listener {
            Some(listener) => listener.reply.send(record).is_ok(),
            None => {
                debug!(tab, "message dropped, nobody listening");
                false
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }
}


/// No reply arrived within the wait
#[derive(Debug, thiserror::Error)]
#[error("No data received from the page.")]
pub struct NoDataReceived;


pub struct Subscription {
    id: u64,
    bus: Arc<MessageBus>,
    receiver: oneshot::Receiver<JobRecord>,
}


impl Subscription {
    /// Waits at most `timeout` for the reply.
    pub async fn recv_within(mut self, timeout: Duration) -> Result<JobRecord, NoDataReceived> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(_)) | Err(_) => Err(NoDataReceived),
        }
    }
}


impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.listeners().remove(&self.id);
    }
}
