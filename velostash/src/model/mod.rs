//! Records persisted by the gateway. Field names match the stored JSON layout.

mod bike;
mod chat;
mod rental;
mod route;
mod user;

pub use bike::Bike;
pub use chat::{ChatMessage, ChatThreadSummary, DirectMessages};
pub use rental::{Rental, RentalStatus};
pub use route::Route;
pub use user::{AccountStatus, Role, User};

/// JSON has no NaN or infinity: `serde_json` writes them as `null`, which an `f64` field
/// then refuses to read back, losing the whole collection. Amounts are stored as 0 instead.
pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_amounts_become_zero() {
        assert_eq!(finite_or_zero(12.5), 12.5);
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(f64::NEG_INFINITY), 0.0);
    }
}
