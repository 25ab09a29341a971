use async_trait::async_trait;

use crate::StoreError;

/// Storage quota and usage, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaEstimate {
    pub quota: u64,
    pub usage: u64,
}

impl QuotaEstimate {
    pub fn remaining(&self) -> u64 {
        self.quota.saturating_sub(self.usage)
    }

    /// Share of the quota in use, `0.0` for a zero quota.
    pub fn fraction_used(&self) -> f64 {
        if self.quota == 0 {
            return 0.0;
        }
        self.usage as f64 / self.quota as f64
    }
}

/// Platform service reporting how much storage the application may use.
///
/// Browsers expose this asynchronously; when no implementation is attached the gateway
/// estimates usage from the stored entries instead.
#[async_trait]
pub trait QuotaApi: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the platform cannot produce an estimate.
    async fn estimate(&self) -> Result<QuotaEstimate, StoreError>;
}
