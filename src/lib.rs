//! flocktrack library: companion-side detection core.
//!
//! Ingests the byte stream a flock-you sensor pushes over BLE notifications,
//! reassembles NDJSON lines, classifies detected devices into surveillance
//! categories, and keeps a deduplicated, persistent per-device record with
//! session statistics. Platform hosts (the `companion-std` binary, a mobile
//! app shell) are thin consumers that supply transport chunks, location
//! fixes and an output sink for alerts.
//!
//! Data flow, leaves first:
//! - `framer`: byte chunks to complete lines
//! - `protocol`: line to [`protocol::Message`]
//! - `category` + `defaults`: tag or MAC OUI to [`category::Category`]
//! - `store`: aggregation, blocklist, route, persistence
//! - `alert`: per-device cooldown
//! - `link`: the wiring of all of the above for one connection
//! - `export`: CSV/KML snapshots

pub mod alert;
pub mod category;
pub mod config;
pub mod defaults;
pub mod error;
pub mod export;
pub mod framer;
pub mod link;
pub mod protocol;
pub mod store;
pub mod threat;

pub use error::{Error, Result};
