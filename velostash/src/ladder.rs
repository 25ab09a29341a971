use serde::{Serialize, de::DeserializeOwned};
use tracing::{error, info, warn};

use crate::{GatewayError, KeyValueStore, Notice, StorageGateway};

/// One rung of the backpressure ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Cleanup { aggressive: bool },
    Emergency,
}

/// The recovery steps tried, in order, when a write is rejected.
///
/// After each failed attempt the next tier runs and the write is retried. Once every
/// tier is spent the user is told to clear their data and the write fails with
/// [`GatewayError::StorageExhausted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ladder {
    tiers: Vec<Tier>,
}

impl Ladder {
    pub fn new(tiers: impl IntoIterator<Item = Tier>) -> Self {
        Self {
            tiers: tiers.into_iter().collect(),
        }
    }

    /// Aggressive cleanup, then emergency eviction. Used by every write path that can
    /// plausibly be refused for capacity.
    pub fn standard() -> Self {
        Self::new([Tier::Cleanup { aggressive: true }, Tier::Emergency])
    }

    /// A single non-aggressive cleanup pass.
    pub fn gentle() -> Self {
        Self::new([Tier::Cleanup { aggressive: false }])
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

impl Default for Ladder {
    fn default() -> Self {
        Self::standard()
    }
}

/// How a laddered write went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LadderReport {
    /// Tiers that ran before the write went through.
    pub tiers_run: Vec<Tier>,
}

impl LadderReport {
    /// The write succeeded on the first try.
    pub fn first_try(&self) -> bool {
        self.tiers_run.is_empty()
    }

    pub fn cleanup_passes(&self) -> usize {
        self.tiers_run
            .iter()
            .filter(|tier| matches!(tier, Tier::Cleanup { .. }))
            .count()
    }
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Writes `value` under `key`, climbing `ladder` while the store keeps refusing.
    ///
    /// Every retry writes the same `value`. For an edit of a stored collection use
    /// [`Self::update_with_ladder`], which re-reads the entry after each tier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StorageExhausted`] after every tier ran and the write still failed.
    pub fn put_with_ladder<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        ladder: &Ladder,
    ) -> Result<LadderReport, GatewayError> {
        self.write_with_ladder(key, ladder, |gateway| gateway.put(key, value))
    }

    /// Reads `key`, applies `edit` and writes the result back, climbing `ladder` while the
    /// store keeps refusing.
    ///
    /// Each attempt starts from a fresh read, so records a cleanup tier evicted from this
    /// same entry stay evicted. `edit` may therefore run more than once.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StorageExhausted`] after every tier ran and the write still failed.
    pub fn update_with_ladder<T, F>(
        &mut self,
        key: &str,
        ladder: &Ladder,
        mut edit: F,
    ) -> Result<LadderReport, GatewayError>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnMut(&mut T),
    {
        self.write_with_ladder(key, ladder, |gateway| {
            let mut value: T = gateway.get_or_default(key);
            edit(&mut value);
            gateway.put(key, &value)
        })
    }

    /// Runs `attempt` until it reports success, running the next tier of `ladder` after
    /// each failure. `label` names the write in logs and errors.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StorageExhausted`] after every tier ran and `attempt` still failed.
    pub fn write_with_ladder(
        &mut self,
        label: &str,
        ladder: &Ladder,
        mut attempt: impl FnMut(&mut Self) -> bool,
    ) -> Result<LadderReport, GatewayError> {
        let mut report = LadderReport::default();
        if attempt(self) {
            return Ok(report);
        }

        self.notify(Notice::freeing_space());
        for &tier in ladder.tiers() {
            match tier {
                Tier::Cleanup { aggressive } => {
                    self.cleanup(aggressive);
                }
                Tier::Emergency => {
                    self.emergency_cleanup();
                }
            }
            report.tiers_run.push(tier);
            if attempt(self) {
                info!(%label, ?tier, "write succeeded after freeing space");
                return Ok(report);
            }
            warn!(%label, ?tier, "write still rejected after cleanup tier");
        }

        error!(%label, tiers = report.tiers_run.len(), "storage exhausted");
        self.notify(Notice::storage_exhausted());
        Err(GatewayError::StorageExhausted {
            key: label.to_string(),
        })
    }
}
