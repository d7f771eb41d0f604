//! Typed layout-changed notifications and their synchronous fan-out.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, warn};
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutEventKind {
    ItemAdd,
    ItemUpdate,
    ItemDelete,
    BadgeUpdate,
}

/// Which view an event concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    Desktop,
    Dock,
    Folder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutEvent {
    ItemAdd { key_name: String, surface: Surface },
    ItemDelete { key_name: String, surface: Surface },
    /// Something on the surface moved or changed; views re-pull it.
    ItemUpdate { surface: Surface },
    BadgeUpdate { bundle_name: String, badge_number: u32 },
}

impl LayoutEvent {
    pub fn kind(&self) -> LayoutEventKind {
        match self {
            LayoutEvent::ItemAdd { .. } => LayoutEventKind::ItemAdd,
            LayoutEvent::ItemDelete { .. } => LayoutEventKind::ItemDelete,
            LayoutEvent::ItemUpdate { .. } => LayoutEventKind::ItemUpdate,
            LayoutEvent::BadgeUpdate { .. } => LayoutEventKind::BadgeUpdate,
        }
    }
}

pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;
pub type Callback = Box<dyn FnMut(&LayoutEvent) -> Result<(), SubscriberError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

enum Sink {
    Callback(Callback),
    Channel(Sender<LayoutEvent>),
}

struct Subscription {
    id: SubscriptionId,
    kinds: Vec<LayoutEventKind>,
    sink: Sink,
}

impl Subscription {
    fn wants(&self, kind: LayoutEventKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Delivers each event to every interested subscriber in registration order.
/// A subscriber that errors or panics is logged and skipped; the rest still
/// receive the event.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty `kinds` slice subscribes to everything.
    pub fn subscribe<F>(&mut self, kinds: &[LayoutEventKind], callback: F) -> SubscriptionId
    where
        F: FnMut(&LayoutEvent) -> Result<(), SubscriberError> + 'static,
    {
        self.register(kinds, Sink::Callback(Box::new(callback)))
    }

    pub fn subscribe_channel(
        &mut self,
        kinds: &[LayoutEventKind],
    ) -> (SubscriptionId, Receiver<LayoutEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (self.register(kinds, Sink::Channel(tx)), rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        before != self.subscriptions.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns the number of subscribers that accepted the event.
    pub fn publish(&mut self, event: &LayoutEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        let mut disconnected = Vec::new();
        for sub in self.subscriptions.iter_mut().filter(|sub| sub.wants(kind)) {
            match &mut sub.sink {
                Sink::Callback(callback) => {
                    match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                        Ok(Ok(())) => delivered += 1,
                        Ok(Err(err)) => {
                            warn!("subscriber {:?} failed on {:?}: {}", sub.id, kind, err)
                        }
                        Err(_) => error!("subscriber {:?} panicked on {:?}", sub.id, kind),
                    }
                }
                Sink::Channel(tx) => {
                    if tx.send(event.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        disconnected.push(sub.id);
                    }
                }
            }
        }
        for id in disconnected {
            debug!("dropping disconnected subscriber {:?}", id);
            self.unsubscribe(id);
        }
        delivered
    }

    fn register(&mut self, kinds: &[LayoutEventKind], sink: Sink) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            kinds: kinds.to_vec(),
            sink,
        });
        id
    }
}
