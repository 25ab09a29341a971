//! Registration, sign-in and admin account management.

use tracing::{info, warn};

use crate::{
    CascadeOutcome, GatewayError, ImageInput, KeyValueStore, Ladder, LoginError, SessionScope,
    StorageGateway, ValidationError, ValidationIssue,
    cascade::Cascade,
    compress_image,
    config::AdminSeed,
    gateway::keys,
    model::{AccountStatus, Bike, Rental, Role, User},
};

/// Sign-up form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: String,
    pub username: String,
}

/// Admin edit of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Keeps the current password when `None`.
    pub password: Option<String>,
}

/// A user's edit of their own profile. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user: User,
    /// Where the session record landed; `Session` means it ends with the tab.
    pub scope: SessionScope,
    /// The user still has to provide a phone number and address.
    pub profile_incomplete: bool,
}

pub(crate) fn admin_record(seed: &AdminSeed) -> User {
    User {
        id: seed.id,
        name: seed.name.clone(),
        email: seed.email.to_lowercase(),
        password: seed.password.clone(),
        role: Role::Admin,
        status: AccountStatus::Approved,
        phone: None,
        address: None,
        username: None,
        profile_pic_url: None,
        created_at: None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Checks a registration against the stored users, collecting every problem found.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing each reason the registration is refused.
    pub fn validate_registration(&self, registration: &Registration) -> Result<(), ValidationError> {
        let users = self.users();
        let email = registration.email.trim().to_lowercase();
        let name = registration.name.trim().to_lowercase();
        let phone = registration.phone.trim();
        let username = registration.username.trim().to_lowercase();
        let mut issues = Vec::new();

        if email.is_empty() || name.is_empty() || registration.password.is_empty() {
            issues.push(ValidationIssue::MissingField);
        }
        if email == self.config.admin.email.to_lowercase() {
            issues.push(ValidationIssue::ReservedEmail);
        } else if !email.is_empty() && users.iter().any(|user| user.has_email(&email)) {
            issues.push(ValidationIssue::DuplicateEmail);
        }
        if !name.is_empty() && users.iter().any(|user| user.name.to_lowercase() == name) {
            issues.push(ValidationIssue::DuplicateName);
        }
        if !phone.is_empty()
            && users
                .iter()
                .any(|user| user.phone.as_deref().is_some_and(|p| p.trim() == phone))
        {
            issues.push(ValidationIssue::DuplicatePhone);
        }
        if !username.is_empty()
            && users.iter().any(|user| {
                user.username
                    .as_deref()
                    .is_some_and(|u| u.to_lowercase() == username)
            })
        {
            issues.push(ValidationIssue::DuplicateUsername);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }

    /// Registers a new account awaiting admin approval.
    ///
    /// The profile photo, if any, is compressed before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the registration clashes with an existing
    /// account, or [`GatewayError::StorageExhausted`] if the user list cannot be saved.
    pub async fn register(
        &mut self,
        registration: Registration,
        photo: Option<ImageInput>,
    ) -> Result<User, GatewayError> {
        self.validate_registration(&registration)?;

        let profile_pic_url = match photo {
            Some(photo) => {
                let settings = self.config.compression.clone();
                Some(compress_image(photo, &settings).await.into_data_url())
            }
            None => None,
        };

        let now = self.now();
        let user = User {
            id: now,
            name: registration.name.trim().to_string(),
            email: registration.email.trim().to_lowercase(),
            password: registration.password,
            role: Role::User,
            status: AccountStatus::Pending,
            phone: non_empty(&registration.phone),
            address: non_empty(&registration.address),
            username: non_empty(&registration.username),
            profile_pic_url,
            created_at: Some(now),
        };

        self.update_with_ladder(keys::USERS, &Ladder::standard(), |users: &mut Vec<User>| {
            users.push(user.clone());
        })?;
        info!(email = %user.email, "registration submitted for approval");
        Ok(user)
    }

    /// Signs a user in and records the session.
    ///
    /// The configured admin credentials always work: if the admin record is missing or has
    /// drifted it is recreated. If even the repaired user list cannot be saved, it is saved
    /// without the admin, who is rebuilt on the next bootstrap.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::InvalidCredentials`], [`LoginError::NotApproved`], or
    /// [`GatewayError::StorageExhausted`] if the session cannot be stored anywhere.
    pub fn login(&mut self, email: &str, password: &str) -> Result<LoginOutcome, GatewayError> {
        let email = email.trim().to_lowercase();
        let mut users = self.users();
        let mut found = users
            .iter()
            .find(|user| user.has_email(&email) && user.password == password)
            .cloned();

        let seed = self.config.admin.clone();
        if found.is_none() && email == seed.email.to_lowercase() && password == seed.password {
            found = Some(recover_admin(&mut users, &seed));
            let saved =
                self.update_with_ladder(keys::USERS, &Ladder::standard(), |stored: &mut Vec<User>| {
                    recover_admin(stored, &seed);
                });
            if saved.is_err() {
                warn!("saving users without the admin record as a last resort");
                let without_admin: Vec<User> = users
                    .into_iter()
                    .filter(|user| !user.has_email(&seed.email))
                    .collect();
                self.save_users(&without_admin);
            }
        }

        let user = found.ok_or(LoginError::InvalidCredentials)?;
        if !user.is_approved() {
            return Err(LoginError::NotApproved(user.status).into());
        }

        let mut scope = None;
        self.write_with_ladder(keys::CURRENT_USER, &Ladder::standard(), |gateway| {
            scope = gateway.set_current_user(&user);
            scope.is_some()
        })?;
        let scope = scope.unwrap_or(SessionScope::Session);
        if scope == SessionScope::Session {
            warn!(email = %user.email, "signed in with a temporary session");
        }

        Ok(LoginOutcome {
            profile_incomplete: user.profile_incomplete(),
            user,
            scope,
        })
    }

    pub fn logout(&mut self) {
        self.clear_current_user();
    }

    /// Approves or rejects an account.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown email, or
    /// [`GatewayError::StorageExhausted`] if the change cannot be saved.
    pub fn set_account_status(
        &mut self,
        email: &str,
        status: AccountStatus,
    ) -> Result<User, GatewayError> {
        let mut users = self.users();
        let user = users
            .iter_mut()
            .find(|user| user.has_email(email))
            .ok_or_else(|| GatewayError::not_found("user", email))?;
        user.status = status;
        let updated = user.clone();
        self.update_with_ladder(keys::USERS, &Ladder::standard(), |users: &mut Vec<User>| {
            if let Some(stored) = users.iter_mut().find(|stored| stored.id == updated.id) {
                stored.status = status;
            }
        })?;
        info!(email = %updated.email, %status, "account status changed");
        Ok(updated)
    }

    /// Admin edit of an account. An email change is carried over to the user's listings
    /// and rentals, and to the session if the edited user is signed in.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown email, or
    /// [`ValidationIssue::DuplicateEmail`] if the new email belongs to someone else.
    pub fn update_account(
        &mut self,
        email: &str,
        update: AccountUpdate,
    ) -> Result<CascadeOutcome, GatewayError> {
        let mut users = self.users();
        let index = users
            .iter()
            .position(|user| user.has_email(email))
            .ok_or_else(|| GatewayError::not_found("user", email))?;

        let new_email = update.email.trim().to_lowercase();
        if users
            .iter()
            .enumerate()
            .any(|(i, user)| i != index && user.has_email(&new_email))
        {
            return Err(ValidationError::new([ValidationIssue::DuplicateEmail]).into());
        }

        let old_email = users[index].email.clone();
        let edited = &mut users[index];
        edited.name = update.name.trim().to_string();
        edited.email = new_email.clone();
        edited.role = update.role;
        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            edited.password = password;
        }
        let edited = edited.clone();
        let email_changed = !old_email.eq_ignore_ascii_case(&new_email);
        let was_signed_in = self
            .current_user()
            .is_some_and(|current| current.has_email(&old_email));

        let ladder = Ladder::standard();
        let mut cascade = Cascade::new("update_account");
        cascade.step(keys::USERS, || {
            self.update_with_ladder(keys::USERS, &ladder, |users: &mut Vec<User>| {
                if let Some(stored) = users.iter_mut().find(|u| u.has_email(&old_email)) {
                    *stored = edited.clone();
                }
            })
            .is_ok()
        });
        if email_changed {
            cascade.step(keys::BIKES, || {
                self.update_with_ladder(keys::BIKES, &ladder, |bikes: &mut Vec<Bike>| {
                    for bike in bikes.iter_mut().filter(|bike| bike.is_owned_by(&old_email)) {
                        bike.owner = new_email.clone();
                    }
                })
                .is_ok()
            });
            cascade.step(keys::RENTALS, || {
                self.update_with_ladder(keys::RENTALS, &ladder, |rentals: &mut Vec<Rental>| {
                    for rental in rentals.iter_mut().filter(|r| r.is_rented_by(&old_email)) {
                        rental.renter = new_email.clone();
                    }
                })
                .is_ok()
            });
        }
        if was_signed_in {
            cascade.step(keys::CURRENT_USER, || self.set_current_user(&edited).is_some());
        }
        Ok(cascade.finish())
    }

    /// Lets a user edit their own profile; a new photo is compressed first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown email, or
    /// [`GatewayError::StorageExhausted`] if the profile cannot be saved.
    pub async fn update_profile(
        &mut self,
        email: &str,
        update: ProfileUpdate,
        photo: Option<ImageInput>,
    ) -> Result<User, GatewayError> {
        let profile_pic_url = match photo {
            Some(photo) => {
                let settings = self.config.compression.clone();
                Some(compress_image(photo, &settings).await.into_data_url())
            }
            None => None,
        };

        let mut users = self.users();
        let user = users
            .iter_mut()
            .find(|user| user.has_email(email))
            .ok_or_else(|| GatewayError::not_found("user", email))?;
        if let Some(name) = update.name.as_deref().and_then(non_empty) {
            user.name = name;
        }
        if let Some(phone) = update.phone {
            user.phone = non_empty(&phone);
        }
        if let Some(address) = update.address {
            user.address = non_empty(&address);
        }
        if profile_pic_url.is_some() {
            user.profile_pic_url = profile_pic_url;
        }
        let updated = user.clone();

        self.update_with_ladder(keys::USERS, &Ladder::standard(), |users: &mut Vec<User>| {
            if let Some(stored) = users.iter_mut().find(|stored| stored.id == updated.id) {
                *stored = updated.clone();
            }
        })?;
        if self
            .current_user()
            .is_some_and(|current| current.has_email(&updated.email))
        {
            self.set_current_user(&updated);
        }
        Ok(updated)
    }

    /// Deletes a user together with their listings, the rentals on those listings, and
    /// their own rentals. Signs them out if they are the current user.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown email, or
    /// [`GatewayError::Forbidden`] for the admin account.
    pub fn delete_user(&mut self, email: &str) -> Result<CascadeOutcome, GatewayError> {
        if email.trim().eq_ignore_ascii_case(&self.config.admin.email) {
            return Err(GatewayError::Forbidden {
                message: "the admin account cannot be deleted".to_string(),
            });
        }
        if self.find_user(email).is_none() {
            return Err(GatewayError::not_found("user", email));
        }
        let removed_bikes: Vec<i64> = self
            .bikes_by_owner(email)
            .iter()
            .map(|bike| bike.id)
            .collect();
        let signed_in = self
            .current_user()
            .is_some_and(|current| current.has_email(email));

        let ladder = Ladder::standard();
        let mut cascade = Cascade::new("delete_user");
        cascade
            .step(keys::USERS, || {
                self.update_with_ladder(keys::USERS, &ladder, |users: &mut Vec<User>| {
                    users.retain(|user| !user.has_email(email));
                })
                .is_ok()
            })
            .step(keys::BIKES, || {
                self.update_with_ladder(keys::BIKES, &ladder, |bikes: &mut Vec<Bike>| {
                    bikes.retain(|bike| !bike.is_owned_by(email));
                })
                .is_ok()
            })
            .step(keys::RENTALS, || {
                self.update_with_ladder(keys::RENTALS, &ladder, |rentals: &mut Vec<Rental>| {
                    rentals.retain(|rental| {
                        !rental.is_rented_by(email) && !removed_bikes.contains(&rental.bike_id)
                    });
                })
                .is_ok()
            });
        let outcome = cascade.finish();
        if signed_in && outcome.is_complete() {
            self.clear_current_user();
        }
        info!(%email, ?outcome, "user deleted");
        Ok(outcome)
    }
}

/// Recreates or repairs the admin record inside `users`, returning it.
fn recover_admin(users: &mut Vec<User>, seed: &AdminSeed) -> User {
    match users.iter_mut().find(|user| user.has_email(&seed.email)) {
        Some(existing) => {
            existing.role = Role::Admin;
            existing.status = AccountStatus::Approved;
            existing.password = seed.password.clone();
            existing.name = seed.name.clone();
            existing.clone()
        }
        None => {
            let admin = admin_record(seed);
            users.push(admin.clone());
            admin
        }
    }
}
