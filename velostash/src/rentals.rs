//! The rental lifecycle: `Pending -> Approved -> Active -> Completed`.
//!
//! Owners approve or reject requests, renters pick a pickup time, owners hand the bike
//! over and take it back. Transitions that touch both the rental and its bike are
//! reported as a [`CascadeOutcome`].

use tracing::info;

use crate::{
    CascadeOutcome, GatewayError, KeyValueStore, Ladder, RentalError, StorageGateway,
    cascade::Cascade,
    gateway::keys,
    model::{Bike, Rental, RentalStatus, finite_or_zero},
};

fn find_rental(rentals: &[Rental], id: i64) -> Result<usize, GatewayError> {
    rentals
        .iter()
        .position(|rental| rental.id == id)
        .ok_or_else(|| GatewayError::not_found("rental", id))
}

fn require_status(
    rental: &Rental,
    allowed: &[RentalStatus],
    action: &'static str,
) -> Result<(), RentalError> {
    if allowed.contains(&rental.status) {
        Ok(())
    } else {
        Err(RentalError::InvalidTransition {
            from: rental.status,
            action,
        })
    }
}

fn set_availability(bikes: &mut [Bike], id: i64, available: bool) {
    if let Some(bike) = bikes.iter_mut().find(|bike| bike.id == id) {
        bike.available = available;
    }
}

fn edit_rental(rentals: &mut [Rental], id: i64, edit: impl FnOnce(&mut Rental)) {
    if let Some(rental) = rentals.iter_mut().find(|rental| rental.id == id) {
        edit(rental);
    }
}

fn remove_rental(rentals: &mut Vec<Rental>, id: i64) {
    rentals.retain(|rental| rental.id != id);
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Files a rental request for `hours` hours (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown bike,
    /// [`RentalError::BikeUnavailable`] if it is rented out, or
    /// [`GatewayError::Forbidden`] if the renter owns the bike.
    pub fn request_rental(
        &mut self,
        bike_id: i64,
        renter: &str,
        hours: u32,
    ) -> Result<Rental, GatewayError> {
        let bike = self
            .bikes()
            .into_iter()
            .find(|bike| bike.id == bike_id)
            .ok_or_else(|| GatewayError::not_found("bike", bike_id))?;
        if bike.is_owned_by(renter) {
            return Err(GatewayError::Forbidden {
                message: "owners cannot rent their own bike".to_string(),
            });
        }
        if !bike.available {
            return Err(RentalError::BikeUnavailable(bike_id).into());
        }

        let mut rental = Rental {
            id: self.now(),
            bike_id,
            renter: renter.trim().to_lowercase(),
            hours: hours.max(1),
            rate: finite_or_zero(bike.rate),
            total: 0.0,
            status: RentalStatus::Pending,
            start_time: None,
            end_time: None,
            pickup_schedule: None,
        };
        rental.recompute_total();

        self.update_with_ladder(keys::RENTALS, &Ladder::standard(), |rentals: &mut Vec<Rental>| {
            rentals.push(rental.clone());
        })?;
        info!(id = rental.id, bike_id, renter = %rental.renter, "rental requested");
        Ok(rental)
    }

    /// Owner accepts a pending request; the bike is taken off the market.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] or [`RentalError::InvalidTransition`].
    pub fn approve_rental(&mut self, id: i64) -> Result<CascadeOutcome, GatewayError> {
        let rentals = self.rentals();
        let index = find_rental(&rentals, id)?;
        require_status(&rentals[index], &[RentalStatus::Pending], "approve")?;
        let bike_id = rentals[index].bike_id;

        let ladder = Ladder::standard();
        let mut cascade = Cascade::new("approve_rental");
        cascade
            .step(keys::RENTALS, || {
                self.update_with_ladder(keys::RENTALS, &ladder, |rentals: &mut Vec<Rental>| {
                    edit_rental(rentals, id, |rental| rental.status = RentalStatus::Approved);
                })
                .is_ok()
            })
            .step(keys::BIKES, || {
                self.update_with_ladder(keys::BIKES, &ladder, |bikes: &mut Vec<Bike>| {
                    set_availability(bikes, bike_id, false);
                })
                .is_ok()
            });
        Ok(cascade.finish())
    }

    /// Owner declines a pending request, which is removed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`], [`RentalError::InvalidTransition`] or
    /// [`GatewayError::StorageExhausted`].
    pub fn reject_rental(&mut self, id: i64) -> Result<Rental, GatewayError> {
        let mut rentals = self.rentals();
        let index = find_rental(&rentals, id)?;
        require_status(&rentals[index], &[RentalStatus::Pending], "reject")?;
        let rejected = rentals.remove(index);
        self.update_with_ladder(keys::RENTALS, &Ladder::standard(), |rentals: &mut Vec<Rental>| {
            remove_rental(rentals, id);
        })?;
        Ok(rejected)
    }

    /// Renter withdraws a pending or approved rental. An approved rental had taken the
    /// bike off the market, so it is released first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`], [`GatewayError::Forbidden`] if `renter` did
    /// not file the rental, or [`RentalError::InvalidTransition`].
    pub fn cancel_rental(&mut self, id: i64, renter: &str) -> Result<CascadeOutcome, GatewayError> {
        let mut rentals = self.rentals();
        let index = find_rental(&rentals, id)?;
        if !rentals[index].is_rented_by(renter) {
            return Err(GatewayError::Forbidden {
                message: format!("rental {id} does not belong to {renter}"),
            });
        }
        require_status(
            &rentals[index],
            &[RentalStatus::Pending, RentalStatus::Approved],
            "cancel",
        )?;
        let cancelled = rentals.remove(index);

        let ladder = Ladder::standard();
        let mut cascade = Cascade::new("cancel_rental");
        if cancelled.status == RentalStatus::Approved {
            cascade.step(keys::BIKES, || {
                self.update_with_ladder(keys::BIKES, &ladder, |bikes: &mut Vec<Bike>| {
                    set_availability(bikes, cancelled.bike_id, true);
                })
                .is_ok()
            });
        }
        cascade.step(keys::RENTALS, || {
            self.update_with_ladder(keys::RENTALS, &ladder, |rentals: &mut Vec<Rental>| {
                remove_rental(rentals, id);
            })
            .is_ok()
        });
        Ok(cascade.finish())
    }

    /// Renter sets when they will pick up an approved bike.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`], [`RentalError::InvalidTransition`] or
    /// [`GatewayError::StorageExhausted`].
    pub fn schedule_pickup(&mut self, id: i64, pickup_at: i64) -> Result<Rental, GatewayError> {
        let mut rentals = self.rentals();
        let index = find_rental(&rentals, id)?;
        require_status(&rentals[index], &[RentalStatus::Approved], "schedule")?;
        rentals[index].pickup_schedule = Some(pickup_at);
        let scheduled = rentals[index].clone();
        self.update_with_ladder(keys::RENTALS, &Ladder::standard(), |rentals: &mut Vec<Rental>| {
            edit_rental(rentals, id, |rental| rental.pickup_schedule = Some(pickup_at));
        })?;
        Ok(scheduled)
    }

    /// Owner hands the bike over; the rental clock starts now.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] or [`RentalError::InvalidTransition`].
    pub fn start_rental(&mut self, id: i64) -> Result<CascadeOutcome, GatewayError> {
        let now = self.now();
        let rentals = self.rentals();
        let index = find_rental(&rentals, id)?;
        require_status(&rentals[index], &[RentalStatus::Approved], "start")?;
        let bike_id = rentals[index].bike_id;

        let ladder = Ladder::standard();
        let mut cascade = Cascade::new("start_rental");
        cascade
            .step(keys::RENTALS, || {
                self.update_with_ladder(keys::RENTALS, &ladder, |rentals: &mut Vec<Rental>| {
                    edit_rental(rentals, id, |rental| {
                        rental.status = RentalStatus::Active;
                        rental.start_time = Some(now);
                    });
                })
                .is_ok()
            })
            .step(keys::BIKES, || {
                self.update_with_ladder(keys::BIKES, &ladder, |bikes: &mut Vec<Bike>| {
                    set_availability(bikes, bike_id, false);
                })
                .is_ok()
            });
        Ok(cascade.finish())
    }

    /// Adds `extra_hours` to an active rental and reprices it.
    ///
    /// # Errors
    ///
    /// Returns [`RentalError::InvalidHours`] for zero hours, [`GatewayError::NotFound`],
    /// [`RentalError::InvalidTransition`] or [`GatewayError::StorageExhausted`].
    pub fn extend_rental(&mut self, id: i64, extra_hours: u32) -> Result<Rental, GatewayError> {
        if extra_hours == 0 {
            return Err(RentalError::InvalidHours.into());
        }
        let mut rentals = self.rentals();
        let index = find_rental(&rentals, id)?;
        require_status(&rentals[index], &[RentalStatus::Active], "extend")?;
        let extend = |rental: &mut Rental| {
            rental.hours = rental.hours.saturating_add(extra_hours);
            rental.recompute_total();
        };
        extend(&mut rentals[index]);
        let extended = rentals[index].clone();
        self.update_with_ladder(keys::RENTALS, &Ladder::standard(), |rentals: &mut Vec<Rental>| {
            edit_rental(rentals, id, extend);
        })?;
        Ok(extended)
    }

    /// Owner takes the bike back: it returns to the market and the rental is stamped
    /// completed. Completed rentals are kept until cleanup prunes them.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] or [`RentalError::InvalidTransition`].
    pub fn complete_rental(&mut self, id: i64) -> Result<CascadeOutcome, GatewayError> {
        let now = self.now();
        let rentals = self.rentals();
        let index = find_rental(&rentals, id)?;
        require_status(&rentals[index], &[RentalStatus::Active], "complete")?;
        let bike_id = rentals[index].bike_id;

        let ladder = Ladder::standard();
        let mut cascade = Cascade::new("complete_rental");
        cascade
            .step(keys::BIKES, || {
                self.update_with_ladder(keys::BIKES, &ladder, |bikes: &mut Vec<Bike>| {
                    set_availability(bikes, bike_id, true);
                })
                .is_ok()
            })
            .step(keys::RENTALS, || {
                self.update_with_ladder(keys::RENTALS, &ladder, |rentals: &mut Vec<Rental>| {
                    edit_rental(rentals, id, |rental| {
                        rental.status = RentalStatus::Completed;
                        rental.end_time = Some(now);
                    });
                })
                .is_ok()
            });
        Ok(cascade.finish())
    }

    /// Rentals on bikes listed by `owner`.
    pub fn rentals_for_owner(&self, owner: &str) -> Vec<Rental> {
        let owned: Vec<i64> = self
            .bikes_by_owner(owner)
            .iter()
            .map(|bike| bike.id)
            .collect();
        self.rentals()
            .into_iter()
            .filter(|rental| owned.contains(&rental.bike_id))
            .collect()
    }

    pub fn rentals_by_renter(&self, renter: &str) -> Vec<Rental> {
        self.rentals()
            .into_iter()
            .filter(|rental| rental.is_rented_by(renter))
            .collect()
    }
}
