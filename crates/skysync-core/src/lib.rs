//! SkySync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - validated newtypes, `LocalFileEntry`, `SyncOutcome`,
//!   the `ChangeDetector` classification logic
//! - **Configuration** - typed YAML configuration with validation
//! - **Port definitions** - traits implemented by adapter crates:
//!   `IRemoteStore`, `INotificationService`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no network access.
//! Ports define trait interfaces that adapter crates implement; the sync
//! engine orchestrates domain logic through those interfaces.

pub mod config;
pub mod domain;
pub mod ports;
