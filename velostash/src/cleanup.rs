//! Space recovery for the storage gateway.
//!
//! Two tiers: [`StorageGateway::cleanup`] prunes by domain proxies for staleness (orphaned
//! listings, completed rentals, old imageless listings, old routes, long chat threads),
//! and [`StorageGateway::emergency_cleanup`] applies fixed-size retention regardless of age.
//! Neither is transactional; each pass persists on its own.

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use crate::{
    KeyValueStore, StorageGateway,
    gateway::{ReadFailure, keys},
    model::{Bike, DirectMessages, Rental, Route, User},
};

/// What a [`StorageGateway::cleanup_with_report`] pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub orphaned_bikes: usize,
    pub stale_bikes: usize,
    pub rentals: usize,
    pub routes: usize,
    pub chat_messages: usize,
    pub seen_notifications: usize,
    /// At least one shrunk collection was written back.
    pub cleaned: bool,
}

impl CleanupReport {
    pub fn bikes(&self) -> usize {
        self.orphaned_bikes + self.stale_bikes
    }
}

/// Drops everything but the last `limit` items, returning how many were dropped.
pub(crate) fn keep_last<T>(items: &mut Vec<T>, limit: usize) -> usize {
    let excess = items.len().saturating_sub(limit);
    items.drain(..excess);
    excess
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Runs the tiered cleanup and reports whether anything was written back.
    pub fn cleanup(&mut self, aggressive: bool) -> bool {
        self.cleanup_with_report(aggressive).cleaned
    }

    /// Runs the tiered cleanup:
    ///
    /// 1. drop listings whose owner has no user record;
    /// 2. drop completed rentals: all of them when `aggressive`, otherwise those that ended
    ///    before the grace period (or carry no end time);
    /// 3. when `aggressive`, drop imageless listings older than the stale-listing age;
    /// 4. when `aggressive`, trim chat threads and acknowledged-notification lists;
    /// 5. when `aggressive`, drop routes older than the route age;
    /// 6. write back each collection that shrank.
    ///
    /// If one of the core collections cannot be decoded the pass is abandoned, since an
    /// unreadable user list would otherwise make every listing look orphaned.
    pub fn cleanup_with_report(&mut self, aggressive: bool) -> CleanupReport {
        let mut report = CleanupReport::default();
        let (bikes, rentals, users, routes) = match self.read_core_collections() {
            Ok(collections) => collections,
            Err(collection) => {
                error!(%collection, "storage cleanup failed: collection unreadable");
                return report;
            }
        };

        let policy = self.config.cleanup.clone();
        let now = self.now();
        let existing_emails: HashSet<String> =
            users.iter().map(|user| user.email.to_lowercase()).collect();

        let bikes_before = bikes.len();
        let owned: Vec<Bike> = bikes
            .into_iter()
            .filter(|bike| existing_emails.contains(&bike.owner.to_lowercase()))
            .collect();
        report.orphaned_bikes = bikes_before - owned.len();

        let rentals_before = rentals.len();
        let grace_cutoff = now - policy.completed_rental_grace_millis();
        let kept_rentals: Vec<Rental> = rentals
            .into_iter()
            .filter(|rental| {
                if !rental.is_completed() {
                    return true;
                }
                !aggressive && rental.end_time.is_some_and(|end| end > grace_cutoff)
            })
            .collect();
        report.rentals = rentals_before - kept_rentals.len();

        let final_bikes = if aggressive {
            let stale_cutoff = now - policy.stale_bike_age_millis();
            let owned_count = owned.len();
            let kept: Vec<Bike> = owned
                .into_iter()
                .filter(|bike| bike.has_images() || bike.listed_at() > stale_cutoff)
                .collect();
            report.stale_bikes = owned_count - kept.len();
            kept
        } else {
            owned
        };

        if aggressive {
            let (trimmed, written) = self.trim_chat_threads(policy.chat_thread_limit);
            report.chat_messages = trimmed;
            report.cleaned |= written;
            let (trimmed, written, _) =
                self.trim_seen_notifications(policy.seen_notification_limit);
            report.seen_notifications = trimmed;
            report.cleaned |= written;
        }

        let routes_before = routes.len();
        let kept_routes: Vec<Route> = if aggressive {
            let route_cutoff = now - policy.route_max_age_millis();
            routes
                .into_iter()
                .filter(|route| route.created_at.is_some_and(|at| at > route_cutoff))
                .collect()
        } else {
            routes
        };
        report.routes = routes_before - kept_routes.len();

        if report.bikes() > 0 && self.save_bikes(&final_bikes) {
            report.cleaned = true;
        }
        if report.rentals > 0 && self.save_rentals(&kept_rentals) {
            report.cleaned = true;
        }
        if report.routes > 0 && self.save_routes(&kept_routes) {
            report.cleaned = true;
        }

        info!(
            aggressive,
            orphaned_bikes = report.orphaned_bikes,
            stale_bikes = report.stale_bikes,
            rentals = report.rentals,
            routes = report.routes,
            chat_messages = report.chat_messages,
            seen_notifications = report.seen_notifications,
            cleaned = report.cleaned,
            "storage cleanup finished"
        );
        report
    }

    /// Fixed-size eviction for when tiered cleanup did not free enough room.
    ///
    /// Drops every completed rental, keeps only the most recent routes, and trims chat
    /// threads and acknowledged-notification lists to their emergency limits. Every step
    /// runs even if an earlier one failed. Returns `true` only if every read and write
    /// succeeded.
    pub fn emergency_cleanup(&mut self) -> bool {
        let policy = self.config.emergency.clone();
        let mut ok = true;

        match self.read::<Vec<Rental>>(keys::RENTALS) {
            Ok(rentals) => {
                let mut rentals = rentals.unwrap_or_default();
                let before = rentals.len();
                rentals.retain(|rental| !rental.is_completed());
                if rentals.len() < before {
                    ok &= self.save_rentals(&rentals);
                }
            }
            Err(err) => {
                warn!(error = ?err, "emergency cleanup could not read rentals");
                ok = false;
            }
        }

        match self.read::<Vec<Route>>(keys::ROUTES) {
            Ok(routes) => {
                let mut routes = routes.unwrap_or_default();
                if keep_last(&mut routes, policy.routes_kept) > 0 {
                    ok &= self.save_routes(&routes);
                }
            }
            Err(err) => {
                warn!(error = ?err, "emergency cleanup could not read routes");
                ok = false;
            }
        }

        match self.read::<DirectMessages>(keys::DIRECT_MESSAGES) {
            Ok(messages) => {
                let mut messages = messages.unwrap_or_default();
                let trimmed: usize = messages
                    .values_mut()
                    .map(|thread| keep_last(thread, policy.chat_thread_limit))
                    .sum();
                if trimmed > 0 {
                    ok &= self.save_direct_messages(&messages);
                }
            }
            Err(err) => {
                warn!(error = ?err, "emergency cleanup could not read chat threads");
                ok = false;
            }
        }

        let (_, _, seen_ok) = self.trim_seen_notifications(policy.seen_notification_limit);
        ok &= seen_ok;

        if ok {
            info!("emergency cleanup finished");
        } else {
            error!("emergency cleanup finished with failures");
        }
        ok
    }

    fn read_core_collections(
        &self,
    ) -> Result<(Vec<Bike>, Vec<Rental>, Vec<User>, Vec<Route>), &'static str> {
        fn collection<T>(
            result: Result<Option<Vec<T>>, ReadFailure>,
            name: &'static str,
        ) -> Result<Vec<T>, &'static str> {
            result.map(Option::unwrap_or_default).map_err(|_| name)
        }

        Ok((
            collection(self.read(keys::BIKES), keys::BIKES)?,
            collection(self.read(keys::RENTALS), keys::RENTALS)?,
            collection(self.read(keys::USERS), keys::USERS)?,
            collection(self.read(keys::ROUTES), keys::ROUTES)?,
        ))
    }

    /// Trims every chat thread to `limit` messages. Returns the number of messages dropped
    /// and whether the shrunk map was written.
    fn trim_chat_threads(&mut self, limit: usize) -> (usize, bool) {
        let Ok(Some(mut messages)) = self.read::<DirectMessages>(keys::DIRECT_MESSAGES) else {
            return (0, false);
        };
        let trimmed: usize = messages
            .values_mut()
            .map(|thread| keep_last(thread, limit))
            .sum();
        if trimmed == 0 {
            return (0, false);
        }
        (trimmed, self.save_direct_messages(&messages))
    }

    /// Trims every `seenNotifications_*` list to `limit` entries. Returns the number of
    /// entries dropped, whether any list was written, and whether every step succeeded.
    /// Lists that fail to decode are skipped.
    fn trim_seen_notifications(&mut self, limit: usize) -> (usize, bool, bool) {
        let seen_keys = match self
            .persistent()
            .keys_with_prefix(keys::SEEN_NOTIFICATIONS_PREFIX)
        {
            Ok(found) => found,
            Err(err) => {
                warn!(error = %err, "could not list acknowledged notifications");
                return (0, false, false);
            }
        };

        let mut trimmed = 0;
        let mut written = false;
        let mut ok = true;
        for key in seen_keys {
            let mut seen = match self.read::<Vec<String>>(&key) {
                Ok(Some(seen)) => seen,
                Ok(None) => continue,
                Err(err) => {
                    debug!(%key, error = ?err, "skipping unreadable notification list");
                    continue;
                }
            };
            let dropped = keep_last(&mut seen, limit);
            if dropped == 0 {
                continue;
            }
            if self.put(&key, &seen) {
                trimmed += dropped;
                written = true;
            } else {
                ok = false;
            }
        }
        (trimmed, written, ok)
    }
}

#[cfg(test)]
mod tests {
    use super::keep_last;

    #[test]
    fn test_keep_last_preserves_order() {
        let mut items: Vec<u32> = (0..30).collect();
        assert_eq!(keep_last(&mut items, 20), 10);
        assert_eq!(items, (10..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_keep_last_under_limit_is_noop() {
        let mut items = vec![1, 2, 3];
        assert_eq!(keep_last(&mut items, 20), 0);
        assert_eq!(items, vec![1, 2, 3]);
    }
}
