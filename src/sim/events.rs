//! Collision subscriptions
//!
//! A token listens for its own peg hits through a [`Subscription`] handed out
//! by the [`CollisionRouter`]. The subscription is a move-only token: giving it
//! back to [`CollisionRouter::unsubscribe`] is the only way to end it, so a
//! handler can be released exactly once.

use super::physics::{BodyHandle, CollisionPair};

/// Identifier of a live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u32);

/// Proof of a registered collision handler for one body
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a subscription without unsubscribing leaks the handler"]
pub struct Subscription {
    id: SubscriptionId,
    body: BodyHandle,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }
}

/// A collision delivered to a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routed {
    pub subscription: SubscriptionId,
    /// The subscribed body
    pub body: BodyHandle,
    /// What it hit
    pub other: BodyHandle,
}

/// Fans collision-start pairs out to per-body subscribers
#[derive(Debug, Default)]
pub struct CollisionRouter {
    next_id: u32,
    subscribers: Vec<(SubscriptionId, BodyHandle)>,
}

impl CollisionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, body: BodyHandle) -> Subscription {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, body));
        Subscription { id, body }
    }

    /// Release a subscription. Returns false if the router never knew it.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(id, _)| *id != subscription.id);
        self.subscribers.len() != before
    }

    /// Subscribers interested in this pair, in subscription order
    pub fn route(&self, pair: &CollisionPair) -> Vec<Routed> {
        self.subscribers
            .iter()
            .filter_map(|&(subscription, body)| {
                pair.other(body).map(|other| Routed {
                    subscription,
                    body,
                    other,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
