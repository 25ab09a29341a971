use thiserror::Error;

use crate::model::{AccountStatus, RentalStatus};

/// Errors reported by a [`KeyValueStore`](crate::KeyValueStore) backend.
///
/// Capacity rejections are the expected failure mode and get their own variant so that
/// callers can tell them apart from genuine I/O trouble.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The write would push the store past its quota.
    #[error("quota exceeded writing `{key}` ({needed} bytes needed, {remaining} remaining)")]
    QuotaExceeded {
        key: String,
        needed: u64,
        remaining: u64,
    },
    /// The backend failed to read or write its medium.
    #[error("I/O error: {0}")]
    Io(String),
    /// Any other backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Errors surfaced by marketplace operations built on top of the gateway.
///
/// Capacity and parse problems never show up here directly: they degrade to boolean
/// failure flags and empty collections until the whole backpressure ladder is spent.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Every cleanup tier ran and the write was still rejected.
    #[error("storage is critically full; `{key}` could not be saved")]
    StorageExhausted { key: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error(transparent)]
    Rental(#[from] RentalError),

    /// A record addressed by id or email does not exist.
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    /// The caller is not allowed to touch the record.
    #[error("not permitted: {message}")]
    Forbidden { message: String },
}

impl GatewayError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Collection of validation issues found while checking a registration or edit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("validation failed: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn contains(&self, issue: ValidationIssue) -> bool {
        self.issues.contains(&issue)
    }
}

/// A single reason a registration or account edit was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("this email is reserved for the administrator")]
    ReservedEmail,
    #[error("this email address is already registered")]
    DuplicateEmail,
    #[error("this full name is already registered")]
    DuplicateName,
    #[error("this phone number is already registered")]
    DuplicatePhone,
    #[error("this username is already taken")]
    DuplicateUsername,
    #[error("a required field is empty")]
    MissingField,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The account exists but an admin has not approved it (or rejected it).
    #[error("account is {0}")]
    NotApproved(AccountStatus),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RentalError {
    #[error("cannot {action} a rental that is {from:?}")]
    InvalidTransition {
        from: RentalStatus,
        action: &'static str,
    },
    #[error("bike {0} is not available")]
    BikeUnavailable(i64),
    #[error("extra hours must be at least 1")]
    InvalidHours,
}

/// Errors raised while loading a [`GatewayConfig`](crate::GatewayConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
