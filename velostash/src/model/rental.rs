use serde::{Deserialize, Serialize};

/// Lifecycle of a rental: `Pending -> Approved -> Active -> Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalStatus {
    #[default]
    Pending,
    Approved,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: i64,
    /// Weak reference to a [`Bike`](super::Bike) id.
    pub bike_id: i64,
    /// Email of the renting user.
    #[serde(default)]
    pub renter: String,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub status: RentalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_schedule: Option<i64>,
}

impl Rental {
    pub fn is_completed(&self) -> bool {
        self.status == RentalStatus::Completed
    }

    pub fn is_rented_by(&self, email: &str) -> bool {
        self.renter.eq_ignore_ascii_case(email.trim())
    }

    pub(crate) fn recompute_total(&mut self) {
        self.total = super::finite_or_zero(self.rate * f64::from(self.hours));
    }
}
