use std::collections::HashSet;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    KeyValueStore, StorageGateway,
    accounts::admin_record,
    gateway::keys,
    model::{AccountStatus, Bike, Rental, Role, User},
};

/// Repairs made by [`StorageGateway::bootstrap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Users that had no approval status and were marked approved.
    pub users_normalized: usize,
    /// The admin record was created.
    pub admin_created: bool,
    /// The admin record had lost its role or password and was restored.
    pub admin_repaired: bool,
    pub orphaned_bikes: usize,
    pub orphaned_rentals: usize,
    /// Collections that did not exist and were created empty.
    pub created: Vec<&'static str>,
    /// The user list could not be read, so accounts and orphans were left alone.
    pub users_unreadable: bool,
}

impl BootstrapReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Brings the stored data to a consistent state; run once at startup.
    ///
    /// Accounts without a status become approved, the admin account is created or
    /// restored, listings whose owner is gone are dropped, and rentals whose bike or
    /// renter is gone are dropped. Missing collections are created empty. Writes are
    /// fail-soft: a rejected write is logged and the next step still runs.
    ///
    /// An unreadable user list is left as it is, and so are listings and rentals, since
    /// every one of them would look orphaned.
    pub fn bootstrap(&mut self) -> BootstrapReport {
        let mut report = BootstrapReport::default();
        match self.read::<Vec<Value>>(keys::USERS) {
            Ok(raw) => self.repair_accounts(raw, &mut report),
            Err(err) => {
                error!(error = ?err, "user list unreadable, skipping account repair");
                report.users_unreadable = true;
            }
        }

        for key in [keys::BIKES, keys::RENTALS, keys::ROUTES] {
            if !self.contains(key) && self.put(key, &[] as &[Value]) {
                report.created.push(key);
            }
        }

        info!(?report, "storage bootstrapped");
        report
    }

    fn repair_accounts(&mut self, raw: Option<Vec<Value>>, report: &mut BootstrapReport) {
        let users_existed = raw.is_some();
        let raw = raw.unwrap_or_default();
        report.users_normalized = raw
            .iter()
            .filter(|user| user.get("status").is_none_or(Value::is_null))
            .count();
        let mut users: Vec<User> = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(error = %err, "dropping unreadable user record");
                    None
                }
            })
            .collect();

        let seed = self.config.admin.clone();
        match users.iter_mut().find(|user| user.has_email(&seed.email)) {
            None => {
                users.push(admin_record(&seed));
                report.admin_created = true;
            }
            Some(admin) if admin.role != Role::Admin || admin.password.is_empty() => {
                admin.role = Role::Admin;
                admin.status = AccountStatus::Approved;
                admin.name = seed.name.clone();
                if admin.password.is_empty() {
                    admin.password = seed.password.clone();
                }
                report.admin_repaired = true;
            }
            Some(_) => {}
        }

        if !users_existed
            || report.users_normalized > 0
            || report.admin_created
            || report.admin_repaired
        {
            self.save_users(&users);
        }

        let emails: HashSet<String> = users.iter().map(|user| user.email.to_lowercase()).collect();
        let mut bikes: Vec<Bike> = self.bikes();
        let before = bikes.len();
        bikes.retain(|bike| emails.contains(&bike.owner.to_lowercase()));
        report.orphaned_bikes = before - bikes.len();
        if report.orphaned_bikes > 0 {
            self.save_bikes(&bikes);
        }

        let bike_ids: HashSet<i64> = bikes.iter().map(|bike| bike.id).collect();
        let mut rentals: Vec<Rental> = self.rentals();
        let before = rentals.len();
        rentals.retain(|rental| {
            bike_ids.contains(&rental.bike_id) && emails.contains(&rental.renter.to_lowercase())
        });
        report.orphaned_rentals = before - rentals.len();
        if report.orphaned_rentals > 0 {
            self.save_rentals(&rentals);
        }
    }
}
