//! Badge notifications derived from rental state.
//!
//! Nothing is stored per notification: ids are recomputed from the rentals on every
//! call, and each user keeps a list of the ids they have already acknowledged.

use std::collections::HashSet;

use crate::{
    KeyValueStore, StorageGateway,
    model::{Rental, RentalStatus},
};

/// An active rental counts as news to its renter for this long after it started.
pub const RECENT_START_MILLIS: i64 = 2 * 60 * 1000;

/// What a notification is about. Variants are declared in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationKind {
    /// Owner: a request on one of their bikes awaits a decision.
    Pending,
    /// Owner: approved, the renter has not picked a pickup time yet.
    ApprovedWaiting,
    /// Owner: approved and scheduled, ready to hand over.
    ApprovedReady,
    /// Renter: approved, a pickup time is needed.
    RenterApproved,
    /// Renter: the rental just started.
    RenterActive,
}

impl NotificationKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ApprovedWaiting => "approved_waiting",
            Self::ApprovedReady => "approved_ready",
            Self::RenterApproved => "renter_approved",
            Self::RenterActive => "renter_active",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub rental_id: i64,
}

impl Notification {
    fn new(kind: NotificationKind, rental: &Rental) -> Self {
        Self {
            kind,
            rental_id: rental.id,
        }
    }

    /// Stable id recorded in the acknowledged list, e.g. `pending_1700000000000`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.kind.prefix(), self.rental_id)
    }
}

fn owner_kind(rental: &Rental) -> Option<NotificationKind> {
    match rental.status {
        RentalStatus::Pending => Some(NotificationKind::Pending),
        RentalStatus::Approved if rental.pickup_schedule.is_none() => {
            Some(NotificationKind::ApprovedWaiting)
        }
        RentalStatus::Approved => Some(NotificationKind::ApprovedReady),
        _ => None,
    }
}

fn renter_kind(rental: &Rental, now: i64) -> Option<NotificationKind> {
    match rental.status {
        RentalStatus::Approved if rental.pickup_schedule.is_none() => {
            Some(NotificationKind::RenterApproved)
        }
        RentalStatus::Active
            if rental
                .start_time
                .is_some_and(|start| now - start < RECENT_START_MILLIS) =>
        {
            Some(NotificationKind::RenterActive)
        }
        _ => None,
    }
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Every notification currently relevant to `email`, acknowledged or not.
    pub fn pending_notifications(&self, email: &str, now: i64) -> Vec<Notification> {
        let owned: HashSet<i64> = self
            .bikes_by_owner(email)
            .iter()
            .map(|bike| bike.id)
            .collect();
        let mut notifications: Vec<Notification> = self
            .rentals()
            .iter()
            .flat_map(|rental| {
                let as_owner = owned
                    .contains(&rental.bike_id)
                    .then(|| owner_kind(rental))
                    .flatten();
                let as_renter = rental
                    .is_rented_by(email)
                    .then(|| renter_kind(rental, now))
                    .flatten();
                [as_owner, as_renter]
                    .into_iter()
                    .flatten()
                    .map(move |kind| Notification::new(kind, rental))
            })
            .collect();
        notifications.sort_by_key(|notification| notification.kind);
        notifications
    }

    /// Notifications `email` has not acknowledged yet.
    pub fn unseen_notifications(&self, email: &str, now: i64) -> Vec<Notification> {
        let seen: HashSet<String> = self.seen_notifications(email).into_iter().collect();
        self.pending_notifications(email, now)
            .into_iter()
            .filter(|notification| !seen.contains(&notification.id()))
            .collect()
    }

    /// Acknowledges every current notification, replacing the stored list.
    pub fn mark_notifications_seen(&mut self, email: &str, now: i64) -> bool {
        let ids: Vec<String> = self
            .pending_notifications(email, now)
            .iter()
            .map(Notification::id)
            .collect();
        self.save_seen_notifications(email, &ids)
    }

    /// Drops acknowledged ids whose notification no longer exists. Returns how many were
    /// dropped; nothing is written when that is zero.
    pub fn prune_seen_notifications(&mut self, email: &str, now: i64) -> usize {
        let current: HashSet<String> = self
            .pending_notifications(email, now)
            .iter()
            .map(Notification::id)
            .collect();
        let mut seen = self.seen_notifications(email);
        let before = seen.len();
        seen.retain(|id| current.contains(id));
        let dropped = before - seen.len();
        if dropped > 0 && !self.save_seen_notifications(email, &seen) {
            return 0;
        }
        dropped
    }
}
