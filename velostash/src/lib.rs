//! # Velostash
//!
//! The storage layer of a peer-to-peer bike rental marketplace. Every record lives as JSON
//! in a small, quota-limited string key-value store; this crate is the single gateway all
//! reads and writes go through.
//!
//! ## Features
//!
//! - Typed collections over any [`KeyValueStore`] backend
//! - Fail-soft writes and reads: rejections become `false`, corrupt entries become empty
//! - Tiered cleanup and an escalating retry ladder for when the quota is hit
//! - Best-effort image compression for inline photos
//! - Account, listing, rental, route, chat and notification operations

mod accounts;
mod cascade;
mod cleanup;
mod compress;
mod config;
mod errors;
mod gateway;
mod integrity;
mod ladder;
mod listings;
mod messaging;
pub mod model;
mod notifications;
mod rentals;
mod routes;
mod traits;
pub mod utils;

pub use accounts::{AccountUpdate, LoginOutcome, ProfileUpdate, Registration};
pub use cascade::CascadeOutcome;
pub use cleanup::CleanupReport;
pub use compress::{Compression, FallbackReason, ImageInput, compress_image, compress_images};
pub use config::{
    AdminSeed, CleanupPolicy, CompressionSettings, DAY_MILLIS, DEFAULT_QUOTA_BYTES,
    EmergencyPolicy, GatewayConfig,
};
pub use gateway::{SessionScope, StorageGateway, keys};
pub use integrity::BootstrapReport;
pub use ladder::{Ladder, LadderReport, Tier};
pub use listings::{BikeUpdate, NewBike};
pub use messaging::build_chat_key;
pub use notifications::{Notification, NotificationKind, RECENT_START_MILLIS};
pub use routes::NewRoute;
pub use traits::*;
pub use utils::memory::MemoryStore;

pub use crate::errors::{
    ConfigError, GatewayError, LoginError, RentalError, StoreError, ValidationError,
    ValidationIssue,
};
