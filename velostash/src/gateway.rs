use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};

use crate::{
    Clock, GatewayConfig, KeyValueStore, MemoryStore, Notice, Notifier, QuotaApi, QuotaEstimate,
    StoreError, SystemClock, TracingNotifier,
    model::{Bike, DirectMessages, Rental, Route, User},
    utils::encoding::{decode, encode, stored_size},
};

/// Names of the persisted entries.
pub mod keys {
    pub const USERS: &str = "users";
    pub const BIKES: &str = "bikes";
    pub const RENTALS: &str = "rentals";
    pub const ROUTES: &str = "routes";
    pub const DIRECT_MESSAGES: &str = "directMessages";
    pub const CURRENT_USER: &str = "currentUser";
    pub const SEEN_NOTIFICATIONS_PREFIX: &str = "seenNotifications_";

    /// Key of the acknowledged-notification list of one user.
    pub fn seen_notifications(email: &str) -> String {
        format!("{SEEN_NOTIFICATIONS_PREFIX}{email}")
    }
}

/// Which store accepted the session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    /// Survives closing the tab.
    Persistent,
    /// Written to the session store after the persistent store refused it.
    Session,
}

/// Why a read produced no value.
#[derive(Debug)]
pub(crate) enum ReadFailure {
    Store(StoreError),
    Corrupt(serde_json::Error),
}

/// The storage gateway: the single object every marketplace operation reads and writes through.
///
/// It owns encoding, keeps writes fail-soft (a rejected write is a `false`, never an error),
/// substitutes empty collections for missing or corrupt entries, and carries the cleanup
/// tiers used to recover space. The persistent store `P` is the durable area; the session
/// store `S` only receives the current-user record when `P` refuses it.
pub struct StorageGateway<P: KeyValueStore, S: KeyValueStore = MemoryStore> {
    persistent: P,
    session: S,
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
    quota_api: Option<Box<dyn QuotaApi>>,
    pub(crate) config: GatewayConfig,
}

impl<P: KeyValueStore> StorageGateway<P, MemoryStore> {
    /// Creates a gateway over `persistent` with an in-memory session store, the default
    /// configuration, system time and notices forwarded to `tracing`.
    pub fn new(persistent: P) -> Self {
        Self {
            persistent,
            session: MemoryStore::new(),
            notifier: Box::new(TracingNotifier),
            clock: Box::new(SystemClock),
            quota_api: None,
            config: GatewayConfig::default(),
        }
    }
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Replaces the session-scoped store.
    pub fn with_session<S2: KeyValueStore>(self, session: S2) -> StorageGateway<P, S2> {
        StorageGateway {
            persistent: self.persistent,
            session,
            notifier: self.notifier,
            clock: self.clock,
            quota_api: self.quota_api,
            config: self.config,
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Attaches the platform quota service consulted by [`Self::estimate_usage`].
    pub fn with_quota_api(mut self, api: impl QuotaApi + 'static) -> Self {
        self.quota_api = Some(Box::new(api));
        self
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn persistent(&self) -> &P {
        &self.persistent
    }

    pub fn persistent_mut(&mut self) -> &mut P {
        &mut self.persistent
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_stores(self) -> (P, S) {
        (self.persistent, self.session)
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Serializes `value` and writes it under `key`.
    ///
    /// Returns `false` if the store rejected the write. A rejection is logged and raises one
    /// error-level notice; retrying (after cleanup) is the caller's job.
    pub fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> bool {
        match self.try_put(key, value) {
            Ok(()) => true,
            Err(err) => {
                error!(%key, error = %err, "failed to write to storage");
                self.notifier.notify(Notice::storage_full());
                false
            }
        }
    }

    /// Like [`Self::put`] but without logging or notifying.
    pub(crate) fn try_put<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let text = encode(value).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.persistent.set_item(key, &text)?;
        debug!(%key, bytes = stored_size(key, &text), "stored entry");
        Ok(())
    }

    pub(crate) fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ReadFailure> {
        let Some(text) = self.persistent.get_item(key).map_err(ReadFailure::Store)? else {
            return Ok(None);
        };
        decode(&text).map(Some).map_err(ReadFailure::Corrupt)
    }

    /// Reads and decodes `key`, falling back to `T::default()` when the entry is missing,
    /// unreadable or corrupt.
    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.read(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(ReadFailure::Store(err)) => {
                warn!(%key, error = %err, "storage read failed, using empty value");
                T::default()
            }
            Err(ReadFailure::Corrupt(err)) => {
                warn!(%key, error = %err, "corrupt entry, using empty value");
                T::default()
            }
        }
    }

    /// Reads a list-valued entry; see [`Self::get_or_default`].
    pub fn get_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.get_or_default(key)
    }

    /// Whether `key` exists in the persistent store.
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.persistent.get_item(key), Ok(Some(_)))
    }

    /// Removes `key` from the persistent store, returning whether the removal succeeded.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.persistent.remove_item(key) {
            Ok(_) => true,
            Err(err) => {
                error!(%key, error = %err, "failed to remove entry");
                false
            }
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.get_collection(keys::USERS)
    }

    pub fn save_users(&mut self, users: &[User]) -> bool {
        self.put(keys::USERS, users)
    }

    pub fn find_user(&self, email: &str) -> Option<User> {
        self.users().into_iter().find(|user| user.has_email(email))
    }

    pub fn bikes(&self) -> Vec<Bike> {
        self.get_collection(keys::BIKES)
    }

    pub fn save_bikes(&mut self, bikes: &[Bike]) -> bool {
        self.put(keys::BIKES, bikes)
    }

    pub fn rentals(&self) -> Vec<Rental> {
        self.get_collection(keys::RENTALS)
    }

    pub fn save_rentals(&mut self, rentals: &[Rental]) -> bool {
        self.put(keys::RENTALS, rentals)
    }

    pub fn routes(&self) -> Vec<Route> {
        self.get_collection(keys::ROUTES)
    }

    pub fn save_routes(&mut self, routes: &[Route]) -> bool {
        self.put(keys::ROUTES, routes)
    }

    pub fn direct_messages(&self) -> DirectMessages {
        self.get_or_default(keys::DIRECT_MESSAGES)
    }

    pub fn save_direct_messages(&mut self, messages: &DirectMessages) -> bool {
        self.put(keys::DIRECT_MESSAGES, messages)
    }

    pub fn seen_notifications(&self, email: &str) -> Vec<String> {
        self.get_collection(&keys::seen_notifications(email))
    }

    pub fn save_seen_notifications(&mut self, email: &str, ids: &[String]) -> bool {
        self.put(&keys::seen_notifications(email), ids)
    }

    /// Returns the signed-in user, looking in the persistent store first and the session
    /// store second.
    pub fn current_user(&self) -> Option<User> {
        read_session_record(&self.persistent).or_else(|| read_session_record(&self.session))
    }

    /// Records the signed-in user.
    ///
    /// If the persistent store refuses the record it is written to the session store
    /// instead, so the session silently becomes tab-scoped. Returns `None` when both
    /// stores refuse it.
    pub fn set_current_user(&mut self, user: &User) -> Option<SessionScope> {
        if self.put(keys::CURRENT_USER, user) {
            // Drop any stale tab-scoped copy so reads see the durable record.
            let _ = self.session.remove_item(keys::CURRENT_USER);
            return Some(SessionScope::Persistent);
        }
        let text = encode(user).ok()?;
        match self.session.set_item(keys::CURRENT_USER, &text) {
            Ok(()) => {
                warn!(email = %user.email, "session stored in the session scope only");
                Some(SessionScope::Session)
            }
            Err(err) => {
                error!(error = %err, "session store rejected the current user");
                None
            }
        }
    }

    pub fn clear_current_user(&mut self) {
        let _ = self.persistent.remove_item(keys::CURRENT_USER);
        let _ = self.session.remove_item(keys::CURRENT_USER);
    }

    /// Estimates storage quota and usage. Never fails.
    ///
    /// Prefers the attached [`QuotaApi`]. Without one (or if it errors) the usage is the
    /// UTF-16 size of every stored key and value, doubled, against the configured default
    /// quota. If even the stored entries cannot be listed, usage is reported as zero.
    pub async fn estimate_usage(&self) -> QuotaEstimate {
        if let Some(api) = &self.quota_api {
            match api.estimate().await {
                Ok(estimate) => return estimate,
                Err(err) => warn!(error = %err, "quota service failed, estimating locally"),
            }
        }

        let quota = self.config.default_quota_bytes;
        match self.local_usage() {
            Ok(usage) => QuotaEstimate { quota, usage },
            Err(err) => {
                error!(error = %err, "storage quota check failed");
                QuotaEstimate { quota, usage: 0 }
            }
        }
    }

    fn local_usage(&self) -> Result<u64, StoreError> {
        let mut total = 0;
        for key in self.persistent.keys()? {
            if let Some(value) = self.persistent.get_item(&key)? {
                total += stored_size(&key, &value);
            }
        }
        Ok(total)
    }
}

fn read_session_record(store: &impl KeyValueStore) -> Option<User> {
    let text = store.get_item(keys::CURRENT_USER).ok().flatten()?;
    decode(&text).ok()
}
